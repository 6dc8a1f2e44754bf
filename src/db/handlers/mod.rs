//! Repository implementations for database access.
//!
//! Each repository:
//! - Wraps a `&mut SqliteConnection` (usually a transaction)
//! - Provides strongly-typed CRUD operations
//! - Returns models from [`crate::db::models`]
//!
//! # Available Repositories
//!
//! - [`Users`]: Accounts, login lookup
//! - [`Profiles`]: Per-user profile and favorite genres
//! - [`Genres`], [`People`] (directors and actors), [`Movies`]: The catalogue
//! - [`Reviews`], [`Comments`], [`Watchlist`]: User-owned content
//!
//! # Common Pattern
//!
//! ```ignore
//! use moodie::db::handlers::{Reviews, Repository};
//!
//! let mut tx = pool.begin().await?;
//! let mut repo = Reviews::new(&mut tx);
//! let review = repo.get_by_id(review_id).await?;
//! tx.commit().await?;
//! ```
//!
//! Handlers that mutate content load the target, run the permission check and write inside
//! one transaction; dropping the transaction on a denial leaves nothing behind.

pub mod comments;
pub mod genres;
pub mod movies;
pub mod people;
pub mod profiles;
pub mod repository;
pub mod reviews;
pub mod users;
pub mod watchlist;

pub use comments::Comments;
pub use genres::Genres;
pub use movies::Movies;
pub use people::People;
pub use profiles::Profiles;
pub use repository::Repository;
pub use reviews::Reviews;
pub use users::Users;
pub use watchlist::Watchlist;
