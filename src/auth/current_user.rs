//! Request extractors for the caller's identity.
//!
//! [`CurrentUser`] requires valid credentials and rejects with 401 otherwise. [`Identity`] never
//! rejects for missing or stale credentials: it falls back to the anonymous identity and leaves the
//! decision to the permission evaluator.

use crate::{
    AppState,
    api::models::users::CurrentUser,
    auth::{permissions::Identity, session, utils::generate_random_display_name},
    config::Config,
    db::{
        errors::DbError,
        handlers::{Repository, Users},
        models::users::UserCreateDBRequest,
    },
    errors::{Error, Result},
    types::Role,
};
use axum::{extract::FromRequestParts, http::request::Parts};
use sqlx::SqlitePool;
use tracing::{debug, instrument, trace};

pub const PROXY_HEADER_AUTH_SOURCE: &str = "proxy-header";

/// Pull the session token out of the cookie header, if there is one.
fn session_cookie<'a>(parts: &'a Parts, config: &Config) -> Option<Result<&'a str>> {
    let cookie_header = parts.headers.get(axum::http::header::COOKIE)?;

    let cookie_str = match cookie_header.to_str() {
        Ok(s) => s,
        Err(e) => {
            return Some(Err(Error::BadRequest {
                message: format!("Invalid cookie header: {e}"),
            }));
        }
    };
    let cookie_name = &config.auth.native.session.cookie_name;

    cookie_str
        .split(';')
        .filter_map(|cookie| cookie.trim().split_once('='))
        .find(|(name, _)| name == cookie_name)
        .map(|(_, value)| Ok(value))
}

/// Authenticate from the JWT session cookie.
/// Returns:
/// - None: No session cookie present
/// - Some(Ok(user)): Token verified and the account still exists
/// - Some(Err(error)): Cookie present but invalid, expired, or for a deleted account
#[instrument(skip(parts, config, db))]
async fn try_jwt_session_auth(parts: &Parts, config: &Config, db: &SqlitePool) -> Option<Result<CurrentUser>> {
    let token = match session_cookie(parts, config)? {
        Ok(token) => token,
        Err(e) => return Some(Err(e)),
    };

    let claims = match session::verify_session_token(token, config) {
        Ok(claims) => claims,
        Err(e) => return Some(Err(e)),
    };

    let mut conn = match db.acquire().await {
        Ok(conn) => conn,
        Err(e) => return Some(Err(DbError::from(e).into())),
    };

    // The role always comes from the database, never from the token
    match Users::new(&mut conn).get_by_id(claims.sub).await {
        Ok(Some(user)) => Some(Ok(CurrentUser::from(user))),
        Ok(None) => Some(Err(Error::Unauthenticated {
            message: Some("Account no longer exists".to_string()),
        })),
        Err(e) => Some(Err(e.into())),
    }
}

/// Authenticate from the trusted proxy header carrying the user's email.
/// Returns:
/// - None: No proxy header present, or unknown user with auto-creation off
/// - Some(Ok(user)): Known user, or a freshly created one
/// - Some(Err(error)): Database failure
#[instrument(skip(parts, config, db))]
async fn try_proxy_header_auth(parts: &Parts, config: &Config, db: &SqlitePool) -> Option<Result<CurrentUser>> {
    let user_email = parts
        .headers
        .get(&config.auth.proxy_header.header_name)
        .and_then(|h| h.to_str().ok())
        .map(str::trim)
        .filter(|email| !email.is_empty())?;

    let mut tx = match db.begin().await {
        Ok(tx) => tx,
        Err(e) => return Some(Err(DbError::from(e).into())),
    };
    let mut user_repo = Users::new(&mut tx);

    let user = match user_repo.get_user_by_email(user_email).await {
        Ok(Some(user)) => user,
        Ok(None) if config.auth.proxy_header.auto_create_users => {
            let create_request = UserCreateDBRequest {
                // Email is unique, so it doubles as a unique username
                username: user_email.to_string(),
                email: user_email.to_string(),
                display_name: Some(generate_random_display_name()),
                role: Role::User,
                auth_source: PROXY_HEADER_AUTH_SOURCE.to_string(),
                password_hash: None,
            };
            match user_repo.create(&create_request).await {
                Ok(user) => {
                    debug!(user_id = %user.id, "Auto-created user from proxy header");
                    user
                }
                Err(e) => return Some(Err(Error::Database(e))),
            }
        }
        Ok(None) => return None,
        Err(e) => return Some(Err(Error::Database(e))),
    };

    if let Err(e) = tx.commit().await {
        return Some(Err(DbError::from(e).into()));
    }
    Some(Ok(CurrentUser::from(user)))
}

impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = Error;

    #[instrument(skip(parts, state))]
    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self> {
        // Each method returns None when its credentials are absent. The first success wins; a
        // database failure is surfaced as is, everything else ends up as 401.
        let mut auth_errors = Vec::new();

        if state.config.auth.native.enabled {
            match try_jwt_session_auth(parts, &state.config, &state.db).await {
                Some(Ok(user)) => {
                    debug!("Found JWT session authenticated user: {}", user.id);
                    return Ok(user);
                }
                Some(Err(e @ Error::Database(_))) => return Err(e),
                Some(Err(e)) => {
                    trace!("JWT session authentication failed: {:?}", e);
                    auth_errors.push(("JWT session", e));
                }
                None => trace!("No JWT session authentication attempted"),
            }
        }

        if state.config.auth.proxy_header.enabled {
            match try_proxy_header_auth(parts, &state.config, &state.db).await {
                Some(Ok(user)) => {
                    debug!("Found proxy header authenticated user: {}", user.id);
                    return Ok(user);
                }
                Some(Err(e)) => return Err(e),
                None => trace!("No proxy header authentication attempted"),
            }
        }

        trace!("No authentication method succeeded ({} failed): {:?}", auth_errors.len(), auth_errors);
        Err(Error::Unauthenticated { message: None })
    }
}

impl FromRequestParts<AppState> for Identity {
    type Rejection = Error;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self> {
        match CurrentUser::from_request_parts(parts, state).await {
            Ok(user) => Ok(Identity::from(&user)),
            Err(Error::Unauthenticated { .. }) => Ok(Identity::anonymous()),
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{create_test_config, create_test_user};
    use axum::http::StatusCode;

    fn create_test_parts_with_header(header_name: &str, header_value: &str) -> Parts {
        let request = axum::http::Request::builder()
            .uri("http://localhost/test")
            .header(header_name, header_value)
            .body(())
            .unwrap();

        let (parts, _body) = request.into_parts();
        parts
    }

    fn state(pool: &SqlitePool, config: Config) -> AppState {
        AppState::builder().db(pool.clone()).config(config).build()
    }

    #[sqlx::test]
    async fn test_existing_user_extraction(pool: SqlitePool) {
        let state = state(&pool, create_test_config());
        let test_user = create_test_user(&pool, Role::Staff).await;

        let mut parts = create_test_parts_with_header("x-moodie-user", &test_user.email);
        let current_user = CurrentUser::from_request_parts(&mut parts, &state).await.unwrap();

        assert_eq!(current_user.id, test_user.id);
        assert_eq!(current_user.username, test_user.username);
        assert_eq!(current_user.role, Role::Staff);
    }

    #[sqlx::test]
    async fn test_auto_create_nonexistent_user(pool: SqlitePool) {
        let state = state(&pool, create_test_config());
        let new_email = "newcomer@example.com";

        let mut parts = create_test_parts_with_header("x-moodie-user", new_email);
        let current_user = CurrentUser::from_request_parts(&mut parts, &state).await.unwrap();

        assert_eq!(current_user.email, new_email);
        assert_eq!(current_user.role, Role::User);

        let mut conn = pool.acquire().await.unwrap();
        let db_user = Users::new(&mut conn).get_user_by_email(new_email).await.unwrap().unwrap();
        assert_eq!(db_user.auth_source, PROXY_HEADER_AUTH_SOURCE);
        assert!(db_user.display_name.is_some());
    }

    #[sqlx::test]
    async fn test_no_auto_create_when_disabled(pool: SqlitePool) {
        let mut config = create_test_config();
        config.auth.proxy_header.auto_create_users = false;
        let state = state(&pool, config);

        let mut parts = create_test_parts_with_header("x-moodie-user", "stranger@example.com");
        let error = CurrentUser::from_request_parts(&mut parts, &state).await.unwrap_err();
        assert_eq!(error.status_code(), StatusCode::UNAUTHORIZED);
    }

    #[sqlx::test]
    async fn test_missing_header_returns_unauthorized(pool: SqlitePool) {
        let state = state(&pool, create_test_config());

        let request = axum::http::Request::builder().uri("http://localhost/test").body(()).unwrap();
        let (mut parts, _body) = request.into_parts();

        let error = CurrentUser::from_request_parts(&mut parts, &state).await.unwrap_err();
        assert_eq!(error.status_code(), StatusCode::UNAUTHORIZED);
    }

    #[sqlx::test]
    async fn test_session_cookie_reads_role_from_database(pool: SqlitePool) {
        let config = create_test_config();
        let state = state(&pool, config.clone());
        let user = create_test_user(&pool, Role::User).await;
        let token = session::create_session_token(&user, &config).unwrap();

        // Promote after the token was issued
        sqlx::query("UPDATE users SET role = 'staff' WHERE id = ?")
            .bind(user.id)
            .execute(&pool)
            .await
            .unwrap();

        let cookie = format!("other=1; {}={}", config.auth.native.session.cookie_name, token);
        let mut parts = create_test_parts_with_header("cookie", &cookie);
        let current_user = CurrentUser::from_request_parts(&mut parts, &state).await.unwrap();
        assert_eq!(current_user.id, user.id);
        assert_eq!(current_user.role, Role::Staff);
    }

    #[sqlx::test]
    async fn test_session_for_deleted_user_is_rejected(pool: SqlitePool) {
        let config = create_test_config();
        let state = state(&pool, config.clone());
        let user = create_test_user(&pool, Role::User).await;
        let token = session::create_session_token(&user, &config).unwrap();

        sqlx::query("DELETE FROM users WHERE id = ?").bind(user.id).execute(&pool).await.unwrap();

        let cookie = format!("{}={}", config.auth.native.session.cookie_name, token);
        let mut parts = create_test_parts_with_header("cookie", &cookie);
        let error = CurrentUser::from_request_parts(&mut parts, &state).await.unwrap_err();
        assert_eq!(error.status_code(), StatusCode::UNAUTHORIZED);
    }

    #[sqlx::test]
    async fn test_identity_falls_back_to_anonymous(pool: SqlitePool) {
        let config = create_test_config();
        let state = state(&pool, config.clone());

        let cookie = format!("{}=garbage", config.auth.native.session.cookie_name);
        let mut parts = create_test_parts_with_header("cookie", &cookie);
        let identity = Identity::from_request_parts(&mut parts, &state).await.unwrap();
        assert_eq!(identity, Identity::anonymous());

        let user = create_test_user(&pool, Role::User).await;
        let mut parts = create_test_parts_with_header("x-moodie-user", &user.email);
        let identity = Identity::from_request_parts(&mut parts, &state).await.unwrap();
        assert_eq!(identity, Identity::new(user.id, Role::User));
    }
}
