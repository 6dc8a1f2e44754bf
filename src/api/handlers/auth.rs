use axum::{Json, extract::State};

use crate::{
    AppState,
    api::{
        handlers::validated,
        models::{
            auth::{
                AuthResponse, AuthSuccessResponse, ChangePasswordRequest, LoginInfo, LoginRequest, LoginResponse, LogoutResponse,
                RegisterRequest, RegisterResponse, RegistrationInfo,
            },
            users::{CurrentUser, UserResponse},
        },
    },
    auth::{
        password::{self, Argon2Params},
        session,
        utils::generate_random_display_name,
    },
    config::{Config, SessionConfig},
    db::{
        handlers::{Repository, Users},
        models::users::{UserCreateDBRequest, UserUpdateDBRequest},
    },
    errors::Error,
    sanitize::sanitize_optional,
    types::Role,
};

const INVALID_CREDENTIALS: &str = "Invalid email, username or password";

fn ensure_native_enabled(config: &Config) -> Result<(), Error> {
    if config.auth.native.enabled {
        Ok(())
    } else {
        Err(Error::BadRequest {
            message: "Native authentication is disabled".to_string(),
        })
    }
}

/// Get registration information
#[utoipa::path(
    get,
    path = "/authentication/register",
    tag = "authentication",
    responses(
        (status = 200, description = "Registration info", body = RegistrationInfo),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn get_registration_info(State(state): State<AppState>) -> Result<Json<RegistrationInfo>, Error> {
    let enabled = state.config.auth.native.enabled && state.config.auth.native.allow_registration;
    Ok(Json(RegistrationInfo {
        enabled,
        message: if enabled {
            "Registration is enabled".to_string()
        } else {
            "Registration is disabled".to_string()
        },
    }))
}

/// Register a new user account
#[utoipa::path(
    post,
    path = "/authentication/register",
    request_body = RegisterRequest,
    tag = "authentication",
    responses(
        (status = 201, description = "User registered successfully", body = AuthResponse),
        (status = 400, description = "Invalid input or registration disabled"),
        (status = 409, description = "Email or username already taken"),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn register(State(state): State<AppState>, Json(request): Json<RegisterRequest>) -> Result<RegisterResponse, Error> {
    ensure_native_enabled(&state.config)?;
    if !state.config.auth.native.allow_registration {
        return Err(Error::BadRequest {
            message: "User registration is disabled".to_string(),
        });
    }

    let request = validated(request)?;
    let password_config = &state.config.auth.native.password;
    password::validate_password_length(&request.password, password_config)?;

    let password_hash = password::hash_password(request.password, Argon2Params::from(password_config)).await?;

    let create_request = UserCreateDBRequest {
        username: request.username.trim().to_string(),
        email: request.email.trim().to_lowercase(),
        display_name: sanitize_optional(request.display_name.as_deref()).or_else(|| Some(generate_random_display_name())),
        role: Role::User,
        auth_source: "native".to_string(),
        password_hash: Some(password_hash),
    };

    let mut tx = state.db.begin().await.map_err(|e| Error::Database(e.into()))?;
    // Duplicate email or username surfaces as a unique violation (409)
    let created_user = Users::new(&mut tx).create(&create_request).await?;
    tx.commit().await.map_err(|e| Error::Database(e.into()))?;

    let user_response = UserResponse::from(created_user);
    let token = session::create_session_token(&user_response.clone().into(), &state.config)?;
    let cookie = create_session_cookie(&token, &state.config);

    Ok(RegisterResponse {
        auth_response: AuthResponse {
            user: user_response,
            message: "Registration successful".to_string(),
        },
        cookie,
    })
}

/// Get login information
#[utoipa::path(
    get,
    path = "/authentication/login",
    tag = "authentication",
    responses(
        (status = 200, description = "Login info", body = LoginInfo),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn get_login_info(State(state): State<AppState>) -> Result<Json<LoginInfo>, Error> {
    Ok(Json(LoginInfo {
        enabled: state.config.auth.native.enabled,
        message: if state.config.auth.native.enabled {
            "Native login is enabled".to_string()
        } else {
            "Native login is disabled".to_string()
        },
    }))
}

/// Login with email or username and password
#[utoipa::path(
    post,
    path = "/authentication/login",
    request_body = LoginRequest,
    tag = "authentication",
    responses(
        (status = 200, description = "Login successful", body = AuthResponse),
        (status = 401, description = "Invalid credentials"),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn login(State(state): State<AppState>, Json(request): Json<LoginRequest>) -> Result<LoginResponse, Error> {
    ensure_native_enabled(&state.config)?;

    let mut pool_conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut user_repo = Users::new(&mut pool_conn);

    let invalid = || Error::Unauthenticated {
        message: Some(INVALID_CREDENTIALS.to_string()),
    };

    let user = user_repo.get_user_by_login(request.login.trim()).await?.ok_or_else(invalid)?;
    let password_hash = user.password_hash.clone().ok_or_else(invalid)?;

    if !password::check_password(request.password, password_hash).await? {
        return Err(invalid());
    }

    user_repo.record_login(user.id).await?;

    let user_response = UserResponse::from(user);
    let token = session::create_session_token(&user_response.clone().into(), &state.config)?;
    let cookie = create_session_cookie(&token, &state.config);

    Ok(LoginResponse {
        auth_response: AuthResponse {
            user: user_response,
            message: "Login successful".to_string(),
        },
        cookie,
    })
}

/// Logout (clear session)
#[utoipa::path(
    post,
    path = "/authentication/logout",
    tag = "authentication",
    responses(
        (status = 200, description = "Logout successful", body = AuthSuccessResponse),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn logout(State(state): State<AppState>) -> Result<LogoutResponse, Error> {
    let cookie = session_cookie("", 0, &state.config.auth.native.session);

    Ok(LogoutResponse {
        auth_response: AuthSuccessResponse {
            message: "Logout successful".to_string(),
        },
        cookie,
    })
}

/// Change password for authenticated user
#[utoipa::path(
    post,
    path = "/authentication/password-change",
    request_body = ChangePasswordRequest,
    tag = "authentication",
    responses(
        (status = 200, description = "Password changed successfully", body = AuthSuccessResponse),
        (status = 400, description = "Invalid request"),
        (status = 401, description = "Current password is incorrect"),
    ),
    security(
        ("CookieAuth" = []),
        ("X-Moodie-User" = [])
    )
)]
#[tracing::instrument(skip_all)]
pub async fn change_password(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(request): Json<ChangePasswordRequest>,
) -> Result<Json<AuthSuccessResponse>, Error> {
    ensure_native_enabled(&state.config)?;

    let mut tx = state.db.begin().await.map_err(|e| Error::Database(e.into()))?;
    let mut user_repo = Users::new(&mut tx);

    let user = user_repo.get_by_id(current_user.id).await?.ok_or_else(|| Error::Unauthenticated {
        message: Some("User not found".to_string()),
    })?;

    let password_hash = user.password_hash.ok_or_else(|| Error::BadRequest {
        message: "Cannot change password for non-native authentication users".to_string(),
    })?;

    if !password::check_password(request.current_password, password_hash).await? {
        return Err(Error::Unauthenticated {
            message: Some("Current password is incorrect".to_string()),
        });
    }

    let password_config = &state.config.auth.native.password;
    password::validate_password_length(&request.new_password, password_config)?;
    let new_password_hash = password::hash_password(request.new_password, Argon2Params::from(password_config)).await?;

    user_repo
        .update(
            current_user.id,
            &UserUpdateDBRequest {
                password_hash: Some(new_password_hash),
                ..Default::default()
            },
        )
        .await?;
    tx.commit().await.map_err(|e| Error::Database(e.into()))?;

    Ok(Json(AuthSuccessResponse {
        message: "Password changed successfully".to_string(),
    }))
}

fn create_session_cookie(token: &str, config: &Config) -> String {
    let session_config = &config.auth.native.session;
    session_cookie(token, session_config.timeout.as_secs(), session_config)
}

/// `Secure` takes no value, so it is only emitted when enabled.
fn session_cookie(value: &str, max_age: u64, session_config: &SessionConfig) -> String {
    let secure = if session_config.cookie_secure { "; Secure" } else { "" };
    format!(
        "{}={}; Path=/; HttpOnly{}; SameSite={}; Max-Age={}",
        session_config.cookie_name, value, secure, session_config.cookie_same_site, max_age
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{create_test_app, create_test_config};
    use axum::http::StatusCode;
    use serde_json::json;
    use sqlx::SqlitePool;

    fn register_body(username: &str, email: &str) -> serde_json::Value {
        json!({
            "username": username,
            "email": email,
            "password": "password123",
        })
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_register_and_login(pool: SqlitePool) {
        let (server, _) = create_test_app(pool, create_test_config()).await;

        let response = server
            .post("/authentication/register")
            .json(&register_body("lumiere", "lumiere@example.com"))
            .await;
        response.assert_status(StatusCode::CREATED);
        let set_cookie = response.headers().get("set-cookie").unwrap().to_str().unwrap().to_string();
        assert!(set_cookie.starts_with("moodie_session="));

        let body: AuthResponse = response.json();
        assert_eq!(body.user.role, Role::User);
        assert!(body.user.display_name.is_some());

        // Login works with either the username or the email
        for login in ["lumiere", "lumiere@example.com"] {
            let response = server
                .post("/authentication/login")
                .json(&json!({ "login": login, "password": "password123" }))
                .await;
            response.assert_status_ok();
        }

        let response = server
            .post("/authentication/login")
            .json(&json!({ "email": "lumiere@example.com", "password": "wrong-password" }))
            .await;
        response.assert_status(StatusCode::UNAUTHORIZED);
    }

    #[sqlx::test]
    async fn test_session_cookie_authenticates(pool: SqlitePool) {
        let (server, _) = create_test_app(pool, create_test_config()).await;

        let response = server
            .post("/authentication/register")
            .json(&register_body("melies", "melies@example.com"))
            .await;
        let set_cookie = response.headers().get("set-cookie").unwrap().to_str().unwrap().to_string();
        let cookie = set_cookie.split(';').next().unwrap().to_string();

        let response = server.get("/users/current").add_header("cookie", cookie).await;
        response.assert_status_ok();
        let user: UserResponse = response.json();
        assert_eq!(user.username, "melies");
    }

    #[sqlx::test]
    async fn test_register_duplicate_is_conflict(pool: SqlitePool) {
        let (server, _) = create_test_app(pool, create_test_config()).await;

        server
            .post("/authentication/register")
            .json(&register_body("varda", "varda@example.com"))
            .await
            .assert_status(StatusCode::CREATED);

        let response = server
            .post("/authentication/register")
            .json(&register_body("someone_else", "varda@example.com"))
            .await;
        response.assert_status(StatusCode::CONFLICT);
        let body: serde_json::Value = response.json();
        assert_eq!(body["message"], "An account with this email address already exists");

        let response = server
            .post("/authentication/register")
            .json(&register_body("varda", "other@example.com"))
            .await;
        response.assert_status(StatusCode::CONFLICT);
    }

    #[sqlx::test]
    async fn test_register_disabled(pool: SqlitePool) {
        let mut config = create_test_config();
        config.auth.native.allow_registration = false;
        let (server, _) = create_test_app(pool, config).await;

        let response = server
            .post("/authentication/register")
            .json(&register_body("tati", "tati@example.com"))
            .await;
        response.assert_status(StatusCode::BAD_REQUEST);

        let info: RegistrationInfo = server.get("/authentication/register").await.json();
        assert!(!info.enabled);
    }

    #[sqlx::test]
    async fn test_register_validation(pool: SqlitePool) {
        let mut config = create_test_config();
        config.auth.native.password.min_length = 10;
        let (server, _) = create_test_app(pool, config).await;

        // Too short for the configured minimum
        server
            .post("/authentication/register")
            .json(&register_body("bresson", "bresson@example.com"))
            .await
            .assert_status(StatusCode::BAD_REQUEST);

        // Not an email address
        server
            .post("/authentication/register")
            .json(&json!({ "username": "bresson", "email": "not-an-email", "password": "long-enough-password" }))
            .await
            .assert_status(StatusCode::BAD_REQUEST);
    }

    #[sqlx::test]
    async fn test_change_password(pool: SqlitePool) {
        let (server, _) = create_test_app(pool, create_test_config()).await;

        let response = server
            .post("/authentication/register")
            .json(&register_body("ozu", "ozu@example.com"))
            .await;
        let set_cookie = response.headers().get("set-cookie").unwrap().to_str().unwrap().to_string();
        let cookie = set_cookie.split(';').next().unwrap().to_string();

        server
            .post("/authentication/password-change")
            .add_header("cookie", cookie.clone())
            .json(&json!({ "current_password": "wrong", "new_password": "tokyo-story" }))
            .await
            .assert_status(StatusCode::UNAUTHORIZED);

        server
            .post("/authentication/password-change")
            .add_header("cookie", cookie)
            .json(&json!({ "current_password": "password123", "new_password": "tokyo-story" }))
            .await
            .assert_status_ok();

        server
            .post("/authentication/login")
            .json(&json!({ "login": "ozu", "password": "tokyo-story" }))
            .await
            .assert_status_ok();
    }

    #[sqlx::test]
    async fn test_logout_clears_cookie(pool: SqlitePool) {
        let (server, _) = create_test_app(pool, create_test_config()).await;

        let response = server.post("/authentication/logout").await;
        response.assert_status_ok();
        let set_cookie = response.headers().get("set-cookie").unwrap().to_str().unwrap();
        assert!(set_cookie.contains("Max-Age=0"));
        assert!(!set_cookie.contains("Secure"));
    }

    #[sqlx::test]
    async fn test_insecure_cookie_omits_secure_attribute(pool: SqlitePool) {
        let (server, _) = create_test_app(pool, create_test_config()).await;

        let response = server
            .post("/authentication/register")
            .json(&register_body("melies", "melies@example.com"))
            .await;
        response.assert_status(StatusCode::CREATED);
        let set_cookie = response.headers().get("set-cookie").unwrap().to_str().unwrap().to_string();
        assert!(set_cookie.contains("HttpOnly"));
        assert!(!set_cookie.contains("Secure"));
    }

    #[test]
    fn test_secure_cookie_attribute() {
        let mut config = create_test_config();
        config.auth.native.session.cookie_secure = true;
        let cookie = create_session_cookie("token", &config);
        assert!(cookie.starts_with("moodie_session=token; Path=/; HttpOnly; Secure; SameSite=strict"));
        assert!(!cookie.contains("Secure="));

        let cleared = session_cookie("", 0, &config.auth.native.session);
        assert_eq!(cleared, "moodie_session=; Path=/; HttpOnly; Secure; SameSite=strict; Max-Age=0");
    }
}
