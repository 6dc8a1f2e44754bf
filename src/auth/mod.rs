//! Authentication and authorization.
//!
//! # Identifying the caller
//!
//! Two credential types are accepted, tried in this order:
//!
//! 1. **Session cookie**: a JWT issued by `/authentication/login` or `/authentication/register`,
//!    stored in an HTTP-only cookie. Only its subject is trusted; the user is reloaded from the
//!    database on every request.
//! 2. **Proxy header**: an email address placed in `x-moodie-user` by a trusted upstream proxy.
//!    Unknown emails get a `user` account when auto-creation is on.
//!
//! Handlers choose how strict to be through the extractors in [`current_user`] and
//! [`permissions`]:
//!
//! ```ignore
//! // Anyone, including anonymous callers
//! async fn get_movie(identity: Identity) -> Result<Json<MovieDetailResponse>> { ... }
//!
//! // Signed-in callers only (401 otherwise)
//! async fn get_watchlist(current_user: CurrentUser) -> Result<Json<...>> { ... }
//!
//! // Callers whose role allows the action (403 otherwise)
//! async fn create_movie(_: RequiresPermission<action::ManageMovies>) -> Result<...> { ... }
//! ```
//!
//! # Deciding what they may do
//!
//! [`permissions::evaluate`] is the single decision point. It is a pure function of the caller's
//! [`permissions::Identity`], an [`crate::types::Action`] and, for edit and delete, the target
//! content item. Ownership of that item is resolved by [`ownership`].
//!
//! # Modules
//!
//! - [`current_user`]: request extractors for the caller
//! - [`ownership`]: who created a piece of content
//! - [`password`]: Argon2 hashing and length rules
//! - [`permissions`]: the evaluator and the [`permissions::RequiresPermission`] extractor
//! - [`session`]: JWT session tokens
//! - [`utils`]: display name generation

pub mod current_user;
pub mod ownership;
pub mod password;
pub mod permissions;
pub mod session;
pub mod utils;
