//! API request/response models for comments.

use crate::api::models::users::UserSummary;
use crate::db::models::comments::CommentDBResponse;
use crate::types::{CommentId, ReviewId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

/// Body for both creating and editing a comment.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, Validate)]
pub struct CommentContent {
    #[validate(length(min = 1, max = 2000))]
    pub content: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CommentResponse {
    #[schema(value_type = String, format = "uuid")]
    pub id: CommentId,
    #[schema(value_type = String, format = "uuid")]
    pub review_id: ReviewId,
    pub user: UserSummary,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CommentResponse {
    pub fn new(db: CommentDBResponse, user: UserSummary) -> Self {
        Self {
            id: db.id,
            review_id: db.review_id,
            user,
            content: db.content,
            created_at: db.created_at,
            updated_at: db.updated_at,
        }
    }
}
