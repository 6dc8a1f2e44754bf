//! API request/response models for reviews.

use super::pagination::Pagination;
use crate::api::models::users::UserSummary;
use crate::db::models::reviews::ReviewDBResponse;
use crate::types::{MovieId, ReviewId, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, Validate)]
pub struct ReviewCreate {
    #[validate(range(min = 1, max = 10))]
    pub rating: i64,
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    #[validate(length(min = 1))]
    pub content: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema, Validate)]
pub struct ReviewUpdate {
    #[validate(range(min = 1, max = 10))]
    pub rating: Option<i64>,
    #[validate(length(min = 1, max = 200))]
    pub title: Option<String>,
    #[validate(length(min = 1))]
    pub content: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ReviewResponse {
    #[schema(value_type = String, format = "uuid")]
    pub id: ReviewId,
    #[schema(value_type = String, format = "uuid")]
    pub movie_id: MovieId,
    pub movie_title: String,
    pub user: UserSummary,
    pub rating: i64,
    pub title: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ReviewResponse {
    pub fn new(db: ReviewDBResponse, movie_title: String, user: UserSummary) -> Self {
        Self {
            id: db.id,
            movie_id: db.movie_id,
            movie_title,
            user,
            rating: db.rating,
            title: db.title,
            content: db.content,
            created_at: db.created_at,
            updated_at: db.updated_at,
        }
    }
}

/// Query for the moderation listing of all reviews.
#[derive(Debug, Deserialize, IntoParams, ToSchema)]
pub struct ListReviewsQuery {
    #[serde(flatten)]
    #[param(inline)]
    pub pagination: Pagination,

    #[param(value_type = Option<String>, format = "uuid")]
    #[schema(value_type = Option<String>, format = "uuid")]
    pub movie_id: Option<MovieId>,

    #[param(value_type = Option<String>, format = "uuid")]
    #[schema(value_type = Option<String>, format = "uuid")]
    pub user_id: Option<UserId>,
}
