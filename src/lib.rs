//! # moodie: movie reviews with role and ownership based permissions
//!
//! `moodie` serves a movie catalogue (movies, genres, directors, actors) alongside the content
//! users write about it: reviews, comments on reviews and personal watchlists. Every write goes
//! through a single permission evaluator that combines the caller's role with ownership of the
//! content being touched.
//!
//! ## Architecture
//!
//! The HTTP layer is [Axum](https://github.com/tokio-rs/axum); persistence is SQLite via
//! [sqlx](https://github.com/launchbadge/sqlx), with migrations embedded at compile time.
//!
//! ### Request Flow
//!
//! A request first resolves the caller. The [`auth::current_user`] extractors accept a signed
//! session cookie (issued by `/authentication/login`) or, when enabled, an email in a trusted
//! proxy header. The role is always read from the database, so a role change applies on the
//! caller's next request. Callers without credentials are anonymous: they can browse, and every
//! mutation they attempt is denied by the evaluator.
//!
//! Handlers that change user content load the target inside a transaction, reduce it to an owner
//! id through [`auth::ownership::OwnedResource`], and ask [`auth::permissions::authorize`] before
//! writing. Staff and superusers may edit or delete anything; regular users only what they
//! created. Catalogue and account management are gated by role alone through the
//! [`auth::permissions::RequiresPermission`] extractor.
//!
//! ### Core Components
//!
//! - [`api`]: route handlers and request/response models
//! - [`auth`]: identity resolution, sessions, passwords, ownership and the permission evaluator
//! - [`db`]: repositories over SQLite
//! - [`config`]: YAML plus environment configuration
//! - [`telemetry`]: tracing setup
//!
//! ## Quick Start
//!
//! ```no_run
//! use clap::Parser;
//! use moodie::{Application, Config};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let args = moodie::config::Args::parse();
//!     let config = Config::load(&args)?;
//!     moodie::telemetry::init_telemetry(config.enable_otel_export)?;
//!
//!     let app = Application::new(config).await?;
//!     app.serve(async {
//!         let _ = tokio::signal::ctrl_c().await;
//!     })
//!     .await
//! }
//! ```
pub mod api;
pub mod auth;
pub mod config;
pub mod db;
pub mod errors;
mod openapi;
pub mod sanitize;
pub mod telemetry;
pub mod types;

#[cfg(test)]
mod test_utils;

use crate::{
    auth::password::{self, Argon2Params},
    config::CorsOrigin,
    db::handlers::{Repository, Users},
    db::models::users::{UserCreateDBRequest, UserUpdateDBRequest},
    openapi::ApiDoc,
    types::Role,
};
use axum::{
    Router,
    http::{self, HeaderValue},
    routing::{get, patch, post},
};
use bon::Builder;
pub use config::Config;
use sqlx::SqlitePool;
use tokio::net::TcpListener;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::{Level, debug, info, instrument};
use utoipa::OpenApi;
use utoipa_scalar::{Scalar, Servable};

pub use types::UserId;

/// Shared state handed to every request handler.
///
/// ```ignore
/// let state = AppState::builder().db(pool).config(config).build();
/// ```
#[derive(Clone, Builder)]
pub struct AppState {
    pub db: SqlitePool,
    pub config: Config,
}

/// Get the moodie database migrator
pub fn migrator() -> sqlx::migrate::Migrator {
    sqlx::migrate!("./migrations")
}

/// Make sure a superuser with `email` exists.
///
/// Idempotent. An existing account is promoted to superuser and, if `password` is given, has its
/// password reset. Without a password a new account can only sign in through the proxy header.
#[instrument(skip_all, fields(email = %email))]
pub async fn create_initial_admin_user(email: &str, password: Option<&str>, params: Argon2Params, db: &SqlitePool) -> anyhow::Result<UserId> {
    let password_hash = match password {
        Some(pwd) => Some(password::hash_password(pwd.to_string(), params).await?),
        None => None,
    };

    let mut tx = db.begin().await?;
    let mut user_repo = Users::new(&mut tx);

    if let Some(existing_user) = user_repo.get_user_by_email(email).await? {
        user_repo
            .update(
                existing_user.id,
                &UserUpdateDBRequest {
                    role: Some(Role::Superuser),
                    password_hash,
                    ..Default::default()
                },
            )
            .await?;
        tx.commit().await?;
        return Ok(existing_user.id);
    }

    let created_user = user_repo
        .create(&UserCreateDBRequest {
            username: email.to_string(),
            email: email.to_string(),
            display_name: None,
            role: Role::Superuser,
            auth_source: "system".to_string(),
            password_hash,
        })
        .await?;

    tx.commit().await?;
    info!(user_id = %created_user.id, "Created initial superuser");
    Ok(created_user.id)
}

/// Open the database and bring its schema up to date.
async fn setup_database(config: &Config) -> anyhow::Result<SqlitePool> {
    let pool = db::connect(&config.database).await?;
    migrator().run(&pool).await?;
    Ok(pool)
}

/// Create CORS layer from configuration
fn create_cors_layer(config: &Config) -> anyhow::Result<CorsLayer> {
    let cors_config = &config.auth.security.cors;

    // A list containing "*" is rejected by tower-http, so a wildcard anywhere means any origin
    let allow_origin = if cors_config.allowed_origins.iter().any(|o| matches!(o, CorsOrigin::Wildcard)) {
        AllowOrigin::any()
    } else {
        let mut origins = Vec::new();
        for origin in &cors_config.allowed_origins {
            if let CorsOrigin::Url(url) = origin {
                origins.push(url.as_str().trim_end_matches('/').parse::<HeaderValue>()?);
            }
        }
        AllowOrigin::list(origins)
    };

    let mut exposed_headers = Vec::new();
    for name in &cors_config.exposed_headers {
        exposed_headers.push(name.parse::<http::HeaderName>()?);
    }

    let mut cors = CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_credentials(cors_config.allow_credentials)
        .allow_methods([http::Method::GET, http::Method::POST, http::Method::PATCH, http::Method::DELETE])
        .allow_headers([
            http::header::CONTENT_TYPE,
            http::header::ACCEPT,
            http::header::HeaderName::from_static("x-moodie-user"),
        ])
        .expose_headers(exposed_headers);

    if let Some(max_age) = cors_config.max_age {
        cors = cors.max_age(std::time::Duration::from_secs(max_age));
    }

    Ok(cors)
}

/// Build the application router: every API route, the OpenAPI docs, CORS and request tracing.
#[instrument(skip_all)]
pub fn build_router(state: AppState) -> anyhow::Result<Router> {
    use api::handlers::{admin, auth, comments, genres, home, movies, people, permissions, profiles, reviews, users, watchlist};

    let auth_routes = Router::new()
        .route("/authentication/register", get(auth::get_registration_info).post(auth::register))
        .route("/authentication/login", get(auth::get_login_info).post(auth::login))
        .route("/authentication/logout", post(auth::logout))
        .route("/authentication/password-change", post(auth::change_password));

    let user_routes = Router::new()
        .route("/users", get(users::list_users))
        .route(
            "/users/{user_id}",
            get(users::get_user).patch(users::update_user).delete(users::delete_user),
        )
        .route("/users/{user_id}/role", patch(users::update_user_role))
        .route("/users/{user_id}/profile", get(profiles::get_profile).patch(profiles::update_profile))
        .route("/users/{user_id}/reviews", get(reviews::list_user_reviews))
        .route("/users/{user_id}/watchlist", get(watchlist::get_watchlist));

    let catalogue_routes = Router::new()
        .route("/movies", get(movies::list_movies).post(movies::create_movie))
        .route("/movies/latest", get(movies::latest_movies))
        .route("/movies/top-rated", get(movies::top_rated_movies))
        .route("/movies/classics", get(movies::classic_movies))
        .route(
            "/movies/{movie_id}",
            get(movies::get_movie).patch(movies::update_movie).delete(movies::delete_movie),
        )
        .route("/genres", get(genres::list_genres).post(genres::create_genre))
        .route(
            "/genres/{genre_id}",
            get(genres::get_genre).patch(genres::update_genre).delete(genres::delete_genre),
        )
        .route("/directors", get(people::list_directors).post(people::create_director))
        .route(
            "/directors/{director_id}",
            get(people::get_director).patch(people::update_director).delete(people::delete_director),
        )
        .route("/actors", get(people::list_actors).post(people::create_actor))
        .route(
            "/actors/{actor_id}",
            get(people::get_actor).patch(people::update_actor).delete(people::delete_actor),
        );

    let content_routes = Router::new()
        .route(
            "/movies/{movie_id}/reviews",
            get(reviews::list_movie_reviews).post(reviews::create_review),
        )
        .route(
            "/movies/{movie_id}/watchlist",
            post(watchlist::add_to_watchlist).delete(watchlist::remove_movie_from_watchlist),
        )
        .route(
            "/reviews/{review_id}",
            get(reviews::get_review).patch(reviews::update_review).delete(reviews::delete_review),
        )
        .route(
            "/reviews/{review_id}/comments",
            get(comments::list_comments).post(comments::create_comment),
        )
        .route(
            "/comments/{comment_id}",
            patch(comments::update_comment).delete(comments::delete_comment),
        )
        .route("/watchlist/{entry_id}", axum::routing::delete(watchlist::delete_watchlist_entry));

    let site_routes = Router::new()
        .route("/home", get(home::home))
        .route("/admin/dashboard", get(admin::dashboard))
        .route("/admin/reviews", get(admin::list_reviews))
        .route("/permissions/check", get(permissions::check_permission));

    let cors = create_cors_layer(&state.config)?;

    let router = Router::new()
        .route("/healthz", get(|| async { "OK" }))
        .merge(auth_routes)
        .merge(user_routes)
        .merge(catalogue_routes)
        .merge(content_routes)
        .merge(site_routes)
        .with_state(state)
        .route("/api-docs/openapi.json", get(|| async { axum::Json(ApiDoc::openapi()) }))
        .merge(Scalar::with_url("/docs", ApiDoc::openapi()))
        .layer(cors)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_request(DefaultOnRequest::new().level(Level::DEBUG))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        );

    Ok(router)
}

/// The server, ready to run.
///
/// 1. **Create**: [`Application::new`] opens the database, runs migrations and makes sure the
///    configured superuser exists
/// 2. **Serve**: [`Application::serve`] binds the TCP port and handles requests until the shutdown
///    future resolves
pub struct Application {
    router: Router,
    config: Config,
    pool: SqlitePool,
}

impl Application {
    /// Create a new application instance with all resources initialized
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        let pool = setup_database(&config).await?;
        Self::new_with_pool(config, pool).await
    }

    /// Build the application on an existing, migrated pool
    pub async fn new_with_pool(config: Config, pool: SqlitePool) -> anyhow::Result<Self> {
        debug!("Starting moodie with configuration: {:#?}", config);

        if config.admin_password.is_some() {
            let params = Argon2Params::from(&config.auth.native.password);
            create_initial_admin_user(&config.admin_email, config.admin_password.as_deref(), params, &pool).await?;
        }

        let app_state = AppState::builder().db(pool.clone()).config(config.clone()).build();
        let router = build_router(app_state)?;

        Ok(Self { router, config, pool })
    }

    /// Convert application into a test server (for tests)
    #[cfg(test)]
    pub fn into_test_server(self) -> axum_test::TestServer {
        axum_test::TestServer::new(self.router).expect("Failed to create test server")
    }

    /// Start serving the application
    pub async fn serve<F>(self, shutdown: F) -> anyhow::Result<()>
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let bind_addr = self.config.bind_address();
        let listener = TcpListener::bind(&bind_addr).await?;
        info!("moodie listening on http://{}, docs at http://localhost:{}/docs", bind_addr, self.config.port);

        axum::serve(listener, self.router).with_graceful_shutdown(shutdown).await?;

        info!("Closing database connections...");
        self.pool.close().await;

        info!("Shutting down telemetry...");
        telemetry::shutdown_telemetry();

        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::create_initial_admin_user;
    use crate::{
        auth::password::{self, Argon2Params},
        db::handlers::Users,
        test_utils::*,
        types::Role,
    };
    use sqlx::SqlitePool;

    fn fast_params() -> Argon2Params {
        Argon2Params {
            memory_kib: 128,
            iterations: 1,
            parallelism: 1,
        }
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_create_initial_admin_user_new_user(pool: SqlitePool) {
        let email = "new-admin@example.com";

        let user_id = create_initial_admin_user(email, Some("hunter2hunter2"), fast_params(), &pool)
            .await
            .expect("Should create admin user successfully");

        let mut conn = pool.acquire().await.unwrap();
        let created = Users::new(&mut conn).get_user_by_email(email).await.unwrap().expect("User should exist");

        assert_eq!(created.id, user_id);
        assert_eq!(created.username, email);
        assert_eq!(created.role, Role::Superuser);
        assert_eq!(created.auth_source, "system");
        let hash = created.password_hash.expect("password should be set");
        assert!(password::verify_password("hunter2hunter2", &hash).unwrap());
    }

    #[sqlx::test]
    async fn test_create_initial_admin_user_promotes_existing_user(pool: SqlitePool) {
        let existing = create_test_user(&pool, Role::User).await;

        let returned = create_initial_admin_user(&existing.email, None, fast_params(), &pool).await.unwrap();
        assert_eq!(returned, existing.id);

        let again = create_initial_admin_user(&existing.email, None, fast_params(), &pool).await.unwrap();
        assert_eq!(again, existing.id);

        let mut conn = pool.acquire().await.unwrap();
        let user = Users::new(&mut conn).get_user_by_email(&existing.email).await.unwrap().unwrap();
        assert_eq!(user.role, Role::Superuser);
    }

    #[sqlx::test]
    async fn test_application_integration(pool: SqlitePool) {
        let mut config = create_test_config();
        config.admin_email = "root@moodie.test".to_string();
        config.admin_password = Some("correct horse battery".to_string());

        let app = crate::Application::new_with_pool(config, pool.clone()).await;
        assert!(app.is_ok(), "Application::new_with_pool should succeed");
        let server = app.unwrap().into_test_server();

        let health = server.get("/healthz").await;
        health.assert_status_ok();
        assert_eq!(health.text(), "OK");

        let docs = server.get("/api-docs/openapi.json").await;
        docs.assert_status_ok();
        let doc: serde_json::Value = docs.json();
        assert!(doc["paths"]["/movies"].is_object());

        server.get("/users").await.assert_status_forbidden();
        server.get("/users/current").await.assert_status_unauthorized();

        let response = server
            .get("/users/current")
            .add_header("x-moodie-user", "root@moodie.test")
            .await;
        response.assert_status_ok();
        let me: serde_json::Value = response.json();
        assert_eq!(me["role"], "superuser");
    }

    #[tokio::test]
    async fn test_application_creates_and_migrates_database_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("moodie.db");

        let mut config = create_test_config();
        config.database.url = format!("sqlite://{}", path.display());

        let server = crate::Application::new(config).await.expect("Application::new should succeed").into_test_server();
        assert!(path.exists());

        let home: serde_json::Value = server.get("/home").await.json();
        assert_eq!(home["total_movies"], 0);
    }

    #[sqlx::test]
    async fn test_cors_preflight(pool: SqlitePool) {
        let (server, _) = create_test_app(pool, create_test_config()).await;

        let response = server
            .method(axum::http::Method::OPTIONS, "/movies")
            .add_header("origin", "http://localhost:3000")
            .add_header("access-control-request-method", "POST")
            .await;
        assert_eq!(
            response.headers().get("access-control-allow-origin").and_then(|v| v.to_str().ok()),
            Some("http://localhost:3000")
        );
    }
}
