//! Database models for watchlist entries.

use crate::auth::ownership::OwnedResource;
use crate::types::{ContentKind, MovieId, UserId, WatchlistEntryId};
use chrono::{DateTime, Utc};
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct WatchlistEntryCreateDBRequest {
    pub user_id: UserId,
    pub movie_id: MovieId,
}

#[derive(Debug, Clone)]
pub struct WatchlistEntryDBResponse {
    pub id: WatchlistEntryId,
    pub user_id: UserId,
    pub movie_id: MovieId,
    pub added_at: DateTime<Utc>,
}

impl OwnedResource for WatchlistEntryDBResponse {
    const KIND: ContentKind = ContentKind::WatchlistEntry;

    fn resource_id(&self) -> Uuid {
        self.id
    }

    fn owner_id(&self) -> UserId {
        self.user_id
    }
}
