use crate::db::errors::DbError;
use crate::types::Action;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error as ThisError;

#[derive(ThisError, Debug)]
pub enum Error {
    /// Authentication required but not provided
    #[error("Not authenticated")]
    Unauthenticated { message: Option<String> },

    /// The permission evaluator denied the action. `reason` goes to the logs only; the
    /// response body is the same whatever the reason was.
    #[error("Insufficient permissions to {action} {resource} ({reason})")]
    InsufficientPermissions {
        action: Action,
        resource: String,
        reason: &'static str,
    },

    /// Invalid request data or business rule violation
    #[error("{message}")]
    BadRequest { message: String },

    /// Requested resource not found
    #[error("{resource} with ID {id} not found")]
    NotFound { resource: String, id: String },

    /// Generic internal service error
    #[error("Failed to {operation}")]
    Internal { operation: String },

    /// Database operation error
    #[error(transparent)]
    Database(#[from] DbError),

    /// Unexpected error with full context chain
    #[error(transparent)]
    Other(#[from] anyhow::Error),

    /// Conflict error raised by services rather than by a constraint
    #[error("Conflict: {message}")]
    Conflict { message: String },
}

/// User-facing message and resource name for a unique constraint violation.
fn unique_violation_detail(table: Option<&str>, columns: &[String]) -> (&'static str, &'static str) {
    let has = |name: &str| columns.iter().any(|c| c == name);
    match table {
        Some("users") if has("email") => ("An account with this email address already exists", "user"),
        Some("users") if has("username") => ("This username is already taken", "user"),
        Some("reviews") => ("You have already reviewed this movie.", "review"),
        Some("genres") => ("A genre with this name already exists", "genre"),
        Some("movies") => ("A movie with this title and release year already exists", "movie"),
        Some("watchlist") => ("This movie is already on your watchlist", "watchlist"),
        _ => ("Resource already exists", "unknown"),
    }
}

impl Error {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Error::Unauthenticated { .. } => StatusCode::UNAUTHORIZED,
            Error::InsufficientPermissions { .. } => StatusCode::FORBIDDEN,
            Error::BadRequest { .. } => StatusCode::BAD_REQUEST,
            Error::NotFound { .. } => StatusCode::NOT_FOUND,
            Error::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            Error::Database(db_err) => match db_err {
                DbError::NotFound => StatusCode::NOT_FOUND,
                DbError::UniqueViolation { .. } => StatusCode::CONFLICT,
                DbError::ForeignKeyViolation { .. } => StatusCode::BAD_REQUEST,
                DbError::CheckViolation { .. } => StatusCode::BAD_REQUEST,
                DbError::Other(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Error::Other(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Error::Conflict { .. } => StatusCode::CONFLICT,
        }
    }

    /// Returns a user-safe error message, without leaking internal implementation details
    pub fn user_message(&self) -> String {
        match self {
            Error::Unauthenticated { message } => message.clone().unwrap_or_else(|| "Authentication required".to_string()),
            Error::InsufficientPermissions { action, resource, .. } => {
                format!("Insufficient permissions to {action} {resource}")
            }
            Error::BadRequest { message } => message.clone(),
            Error::NotFound { resource, id } => {
                format!("{resource} with ID {id} not found")
            }
            Error::Internal { .. } => "Internal server error".to_string(),
            Error::Database(db_err) => match db_err {
                DbError::NotFound => "Resource not found".to_string(),
                DbError::UniqueViolation { table, columns, .. } => unique_violation_detail(table.as_deref(), columns).0.to_string(),
                DbError::ForeignKeyViolation { .. } => "Invalid reference to related resource".to_string(),
                DbError::CheckViolation { .. } => "Invalid data provided".to_string(),
                DbError::Other(_) => "Database error occurred".to_string(),
            },
            Error::Other(_) => "Internal server error".to_string(),
            Error::Conflict { message } => message.clone(),
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        // Log full error details for debugging - different log levels based on severity
        match &self {
            Error::Database(DbError::Other(_)) | Error::Internal { .. } | Error::Other(_) => {
                tracing::error!("Internal service error: {:#}", self);
            }
            Error::Database(_) => {
                tracing::warn!("Database constraint error: {}", self);
            }
            Error::Unauthenticated { .. } | Error::InsufficientPermissions { .. } => {
                tracing::info!("Authorization error: {}", self);
            }
            Error::BadRequest { .. } | Error::NotFound { .. } => {
                tracing::debug!("Client error: {}", self);
            }
            Error::Conflict { .. } => {
                tracing::warn!("Conflict error: {}", self);
            }
        }

        let status = self.status_code();

        match &self {
            Error::Conflict { message } => (status, axum::response::Json(json!({ "message": message }))).into_response(),
            // Unique violations get a minimal structured body naming the resource
            Error::Database(DbError::UniqueViolation { table, columns, .. }) => {
                let (message, resource) = unique_violation_detail(table.as_deref(), columns);
                let body = json!({
                    "message": message,
                    "resource": resource
                });
                (status, axum::response::Json(body)).into_response()
            }
            _ => {
                let user_message = self.user_message();
                (status, user_message).into_response()
            }
        }
    }
}

/// Convert from String errors (e.g., from external functions)
impl From<String> for Error {
    fn from(msg: String) -> Self {
        Error::Internal { operation: msg }
    }
}

/// Type alias for service operation results
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ContentKind;

    #[test]
    fn test_denial_message_does_not_include_reason() {
        let not_owner = Error::InsufficientPermissions {
            action: Action::Delete,
            resource: ContentKind::Review.to_string(),
            reason: "not the owner",
        };
        let anonymous = Error::InsufficientPermissions {
            action: Action::Delete,
            resource: ContentKind::Review.to_string(),
            reason: "authentication required",
        };

        assert_eq!(not_owner.status_code(), StatusCode::FORBIDDEN);
        assert_eq!(not_owner.user_message(), anonymous.user_message());
        assert!(!not_owner.user_message().contains("owner"));
        // The reason is still available to the logs
        assert!(not_owner.to_string().contains("not the owner"));
    }

    #[test]
    fn test_review_unique_violation_message() {
        let err = Error::Database(DbError::UniqueViolation {
            table: Some("reviews".to_string()),
            columns: vec!["movie_id".to_string(), "user_id".to_string()],
            message: "UNIQUE constraint failed: reviews.movie_id, reviews.user_id".to_string(),
        });
        assert_eq!(err.status_code(), StatusCode::CONFLICT);
        assert_eq!(err.user_message(), "You have already reviewed this movie.");
    }

    #[test]
    fn test_user_unique_violation_messages() {
        let email = Error::Database(DbError::UniqueViolation {
            table: Some("users".to_string()),
            columns: vec!["email".to_string()],
            message: String::new(),
        });
        let username = Error::Database(DbError::UniqueViolation {
            table: Some("users".to_string()),
            columns: vec!["username".to_string()],
            message: String::new(),
        });
        assert_eq!(email.user_message(), "An account with this email address already exists");
        assert_eq!(username.user_message(), "This username is already taken");
    }

    #[test]
    fn test_internal_errors_hide_details() {
        let err = Error::Internal {
            operation: "decode secret material".to_string(),
        };
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.user_message(), "Internal server error");
    }
}
