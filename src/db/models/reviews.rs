//! Database models for reviews.

use crate::auth::ownership::OwnedResource;
use crate::types::{ContentKind, MovieId, ReviewId, UserId};
use chrono::{DateTime, Utc};
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct ReviewCreateDBRequest {
    pub movie_id: MovieId,
    pub user_id: UserId,
    pub rating: i64,
    pub title: String,
    pub content: String,
}

/// The owner and movie of a review are fixed at creation, so only the text and rating change.
#[derive(Debug, Clone, Default)]
pub struct ReviewUpdateDBRequest {
    pub rating: Option<i64>,
    pub title: Option<String>,
    pub content: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ReviewDBResponse {
    pub id: ReviewId,
    pub movie_id: MovieId,
    pub user_id: UserId,
    pub rating: i64,
    pub title: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl OwnedResource for ReviewDBResponse {
    const KIND: ContentKind = ContentKind::Review;

    fn resource_id(&self) -> Uuid {
        self.id
    }

    fn owner_id(&self) -> UserId {
        self.user_id
    }
}
