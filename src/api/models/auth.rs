use axum::{
    Json,
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::{api::models::users::UserResponse, errors::Error};

/// Registration information
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct RegistrationInfo {
    pub enabled: bool,
    pub message: String,
}

/// Login information
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct LoginInfo {
    pub enabled: bool,
    pub message: String,
}

/// Request to register a new user
#[derive(Debug, Serialize, Deserialize, ToSchema, Validate)]
pub struct RegisterRequest {
    /// Username (must be unique)
    #[validate(length(min = 3, max = 150))]
    pub username: String,
    /// Email address (must be unique)
    #[validate(email)]
    pub email: String,
    /// Password (will be hashed). Length bounds come from configuration.
    pub password: String,
    #[validate(length(min = 1, max = 150))]
    pub display_name: Option<String>,
}

/// Request to login
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct LoginRequest {
    /// Email address or username
    #[serde(alias = "email", alias = "username")]
    pub login: String,
    pub password: String,
}

/// Response after successful login or registration
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct AuthResponse {
    pub user: UserResponse,
    pub message: String,
}

/// Generic success response
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct AuthSuccessResponse {
    pub message: String,
}

/// Request to change password (for authenticated users)
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ChangePasswordRequest {
    pub current_password: String,
    pub new_password: String,
}

fn with_cookie<T: Serialize>(status: StatusCode, cookie: &str, body: T) -> Response {
    match HeaderValue::from_str(cookie) {
        Ok(value) => (status, [(header::SET_COOKIE, value)], Json(body)).into_response(),
        Err(e) => Error::Internal {
            operation: format!("build session cookie header: {e}"),
        }
        .into_response(),
    }
}

/// Structured response for successful registration
pub struct RegisterResponse {
    pub auth_response: AuthResponse,
    pub cookie: String,
}

impl IntoResponse for RegisterResponse {
    fn into_response(self) -> Response {
        with_cookie(StatusCode::CREATED, &self.cookie, self.auth_response)
    }
}

/// Structured response for successful login
pub struct LoginResponse {
    pub auth_response: AuthResponse,
    pub cookie: String,
}

impl IntoResponse for LoginResponse {
    fn into_response(self) -> Response {
        with_cookie(StatusCode::OK, &self.cookie, self.auth_response)
    }
}

/// Structured response for successful logout
pub struct LogoutResponse {
    pub auth_response: AuthSuccessResponse,
    pub cookie: String,
}

impl IntoResponse for LogoutResponse {
    fn into_response(self) -> Response {
        with_cookie(StatusCode::OK, &self.cookie, self.auth_response)
    }
}
