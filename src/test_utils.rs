//! Shared fixtures for handler and repository tests.

use crate::{
    api::models::users::CurrentUser,
    config::{AuthConfig, Config, NativeAuthConfig, PasswordConfig, ProxyHeaderAuthConfig, SessionConfig},
    db::{
        handlers::{Genres, Movies, Repository, Reviews, Users},
        models::{
            genres::GenreDBResponse,
            movies::{MovieCreateDBRequest, MovieDBResponse},
            reviews::{ReviewCreateDBRequest, ReviewDBResponse},
            users::UserCreateDBRequest,
        },
    },
    types::{MovieId, Role, UserId},
};
use axum_test::TestServer;
use chrono::NaiveDate;
use sqlx::SqlitePool;
use uuid::Uuid;

pub async fn create_test_app(pool: SqlitePool, config: Config) -> (TestServer, crate::AppState) {
    let state = crate::AppState::builder().db(pool.clone()).config(config.clone()).build();

    let app = crate::Application::new_with_pool(config, pool)
        .await
        .expect("Failed to create application");

    (app.into_test_server(), state)
}

pub fn create_test_config() -> Config {
    Config {
        host: "127.0.0.1".to_string(),
        port: 0,
        admin_email: "admin@moodie.test".to_string(),
        admin_password: None,
        secret_key: Some("test-secret-key-for-testing-only".to_string()),
        auth: AuthConfig {
            native: NativeAuthConfig {
                enabled: true,
                allow_registration: true,
                password: PasswordConfig {
                    // Cheap hashing keeps the auth tests fast
                    argon2_memory_kib: 128,
                    argon2_iterations: 1,
                    argon2_parallelism: 1,
                    ..Default::default()
                },
                session: SessionConfig {
                    cookie_secure: false,
                    ..Default::default()
                },
            },
            proxy_header: ProxyHeaderAuthConfig {
                enabled: true,
                ..Default::default()
            },
            ..Default::default()
        },
        ..Default::default()
    }
}

/// Create a user with a unique username and email. The profile row comes with it.
pub async fn create_test_user(pool: &SqlitePool, role: Role) -> CurrentUser {
    let mut conn = pool.acquire().await.expect("Failed to acquire connection");
    let suffix = Uuid::new_v4().simple().to_string();
    let username = format!("user_{}", &suffix[..12]);

    let user = Users::new(&mut conn)
        .create(&UserCreateDBRequest {
            email: format!("{username}@example.com"),
            username,
            display_name: Some("Test User".to_string()),
            role,
            auth_source: "test".to_string(),
            password_hash: None,
        })
        .await
        .expect("Failed to create test user");

    CurrentUser::from(user)
}

/// Headers that authenticate as `user` through the proxy header.
pub fn auth_header(user: &CurrentUser) -> (String, String) {
    ("x-moodie-user".to_string(), user.email.clone())
}

pub async fn create_test_genre(pool: &SqlitePool, name: &str) -> GenreDBResponse {
    let mut conn = pool.acquire().await.expect("Failed to acquire connection");
    Genres::new(&mut conn).get_or_create(name).await.expect("Failed to create test genre")
}

/// A Drama released on June 1st of `year`, with no director, cast or IMDb rating.
pub async fn create_test_movie(pool: &SqlitePool, title: &str, year: i32) -> MovieDBResponse {
    let drama = create_test_genre(pool, "Drama").await;

    let mut conn = pool.acquire().await.expect("Failed to acquire connection");
    Movies::new(&mut conn)
        .create(&MovieCreateDBRequest {
            title: title.to_string(),
            release_year: year,
            release_date: NaiveDate::from_ymd_opt(year, 6, 1),
            plot: format!("The plot of {title}."),
            poster_url: None,
            backdrop_url: None,
            trailer_url: None,
            imdb_rating: None,
            director_id: None,
            genre_ids: vec![drama.id],
            actor_ids: vec![],
        })
        .await
        .expect("Failed to create test movie")
}

pub async fn create_test_review(pool: &SqlitePool, movie_id: MovieId, user_id: UserId, rating: i64) -> ReviewDBResponse {
    let mut conn = pool.acquire().await.expect("Failed to acquire connection");
    Reviews::new(&mut conn)
        .create(&ReviewCreateDBRequest {
            movie_id,
            user_id,
            rating,
            title: format!("{rating} out of 10"),
            content: "Worth watching.".to_string(),
        })
        .await
        .expect("Failed to create test review")
}
