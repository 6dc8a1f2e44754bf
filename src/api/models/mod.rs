//! API request and response data models.
//!
//! These are distinct from the database models in [`crate::db::models`]: responses embed related
//! records (a movie's genres, a review's author) and never expose password hashes.
//!
//! - [`auth`]: registration, login and password change payloads
//! - [`users`], [`profiles`]: accounts and their public profiles
//! - [`genres`], [`people`], [`movies`]: the catalogue
//! - [`reviews`], [`comments`], [`watchlist`]: user-created content
//! - [`dashboard`]: home page and admin statistics
//! - [`permissions`]: permission queries

pub mod auth;
pub mod comments;
pub mod dashboard;
pub mod genres;
pub mod movies;
pub mod pagination;
pub mod people;
pub mod permissions;
pub mod profiles;
pub mod reviews;
pub mod users;
pub mod watchlist;
