//! Database models for comments on reviews.

use crate::auth::ownership::OwnedResource;
use crate::types::{CommentId, ContentKind, ReviewId, UserId};
use chrono::{DateTime, Utc};
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct CommentCreateDBRequest {
    pub review_id: ReviewId,
    pub user_id: UserId,
    pub content: String,
}

#[derive(Debug, Clone)]
pub struct CommentUpdateDBRequest {
    pub content: String,
}

#[derive(Debug, Clone)]
pub struct CommentDBResponse {
    pub id: CommentId,
    pub review_id: ReviewId,
    pub user_id: UserId,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl OwnedResource for CommentDBResponse {
    const KIND: ContentKind = ContentKind::Comment;

    fn resource_id(&self) -> Uuid {
        self.id
    }

    fn owner_id(&self) -> UserId {
        self.user_id
    }
}
