//! API layer for HTTP request handling and data models.
//!
//! - **[`handlers`]**: Axum route handlers for all API endpoints
//! - **[`models`]**: Request/response data structures for API communication
//!
//! # API Structure
//!
//! - **Authentication** (`/authentication/*`): registration, login, logout, password change
//! - **Users** (`/users/*`): accounts, roles, profiles, and per-user reviews and watchlists
//! - **Catalogue** (`/movies`, `/genres`, `/directors`, `/actors`): public reads, staff writes
//! - **Content** (`/movies/{id}/reviews`, `/reviews/*`, `/comments/*`, `/watchlist/*`): owned by
//!   the user who created it
//! - **Site** (`/home`, `/admin/*`, `/permissions/check`)
//!
//! All endpoints are documented with `utoipa`; the rendered reference lives at `/docs`.

pub mod handlers;
pub mod models;
