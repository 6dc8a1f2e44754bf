//! Database record models.
//!
//! Each module holds the create/update requests and the response type for one table (or, for
//! [`people`], two identically shaped tables). Repositories in [`crate::db::handlers`] read rows
//! into private `FromRow` structs and convert them into these responses, so storage details
//! stay out of the API layer.
//!
//! Content owned by a user ([`reviews`], [`comments`], [`watchlist`]) implements
//! [`crate::auth::ownership::OwnedResource`] so handlers can hand it straight to the permission
//! evaluator.

pub mod comments;
pub mod genres;
pub mod movies;
pub mod people;
pub mod profiles;
pub mod reviews;
pub mod users;
pub mod watchlist;
