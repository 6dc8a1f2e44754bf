//! Database models for user profiles.

use crate::types::{GenreId, UserId};
use chrono::{DateTime, NaiveDate, Utc};

/// Database request for updating a profile. `None` leaves the column unchanged; `Some(None)`
/// clears a nullable column.
#[derive(Debug, Clone, Default)]
pub struct ProfileUpdateDBRequest {
    pub bio: Option<String>,
    pub avatar_url: Option<Option<String>>,
    pub birth_date: Option<Option<NaiveDate>>,
    pub location: Option<String>,
    /// Replaces the whole favorite genre set when present
    pub favorite_genre_ids: Option<Vec<GenreId>>,
}

/// Database response for a profile
#[derive(Debug, Clone)]
pub struct ProfileDBResponse {
    pub user_id: UserId,
    pub bio: String,
    pub avatar_url: Option<String>,
    pub birth_date: Option<NaiveDate>,
    pub location: String,
    pub favorite_genre_ids: Vec<GenreId>,
    pub updated_at: DateTime<Utc>,
}
