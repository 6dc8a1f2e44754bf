//! Response models for the home page and the admin dashboard.

use crate::api::models::{movies::MovieResponse, reviews::ReviewResponse, users::UserResponse};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct HomeResponse {
    pub latest: Vec<MovieResponse>,
    pub top_rated: Vec<MovieResponse>,
    pub total_movies: i64,
    pub total_genres: i64,
    pub total_reviews: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct DashboardCounts {
    pub movies: i64,
    pub genres: i64,
    pub directors: i64,
    pub actors: i64,
    pub reviews: i64,
    pub comments: i64,
    /// All accounts, whatever their role
    pub users: i64,
    pub staff: i64,
    pub superusers: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct DashboardResponse {
    pub counts: DashboardCounts,
    pub recent_reviews: Vec<ReviewResponse>,
    pub recent_users: Vec<UserResponse>,
}
