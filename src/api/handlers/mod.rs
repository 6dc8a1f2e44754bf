//! HTTP request handlers for all API endpoints.
//!
//! Handlers take an identity (via [`crate::auth::permissions::Identity`],
//! [`crate::api::models::users::CurrentUser`] or
//! [`crate::auth::permissions::RequiresPermission`]), load what they act on and ask the
//! permission evaluator before writing anything.

pub mod admin;
pub mod auth;
pub mod comments;
pub mod genres;
pub mod home;
pub mod movies;
pub mod people;
pub mod permissions;
pub mod profiles;
pub mod reviews;
pub mod users;
pub mod watchlist;

use axum::{Json, extract::rejection::JsonRejection};
use validator::Validate;

use crate::errors::Error;

/// Unwrap a body taken as `Result<Json<T>, JsonRejection>`, so handlers can authorize before a
/// malformed body is reported. A rejected body becomes a 400.
pub(crate) fn json_body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, Error> {
    payload
        .map(|Json(body)| body)
        .map_err(|rejection| Error::BadRequest { message: rejection.body_text() })
}

/// Run the payload's `validator` rules, turning a failure into a 400.
pub(crate) fn validated<T: Validate>(payload: T) -> Result<T, Error> {
    payload.validate().map_err(|e| Error::BadRequest { message: e.to_string() })?;
    Ok(payload)
}
