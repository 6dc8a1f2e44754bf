//! API response models for watchlists.

use crate::api::models::movies::MovieResponse;
use crate::types::WatchlistEntryId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct WatchlistEntryResponse {
    #[schema(value_type = String, format = "uuid")]
    pub id: WatchlistEntryId,
    pub movie: MovieResponse,
    pub added_at: DateTime<Utc>,
}

/// Result of adding a movie. `created` is false when the movie was already on the list.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct WatchlistAddResponse {
    #[serde(flatten)]
    pub entry: WatchlistEntryResponse,
    pub created: bool,
}
