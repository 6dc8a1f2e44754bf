//! API request/response models for user profiles.

use crate::api::models::genres::GenreSummary;
use crate::db::models::profiles::ProfileDBResponse;
use crate::types::{GenreId, UserId};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_with::rust::double_option;
use utoipa::ToSchema;
use validator::Validate;

/// Partial profile update. Omitted fields are left alone; `favorite_genre_ids` replaces the whole
/// set when present. An empty `bio` or `location` clears it.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema, Validate)]
pub struct ProfileUpdate {
    #[validate(length(max = 500))]
    pub bio: Option<String>,
    /// None = no change, Some(None) = clear, Some(url) = set
    #[serde(default, skip_serializing_if = "Option::is_none", with = "double_option")]
    #[validate(url, length(max = 500))]
    pub avatar_url: Option<Option<String>>,
    /// None = no change, Some(None) = clear, Some(date) = set
    #[serde(default, skip_serializing_if = "Option::is_none", with = "double_option")]
    pub birth_date: Option<Option<NaiveDate>>,
    #[validate(length(max = 100))]
    pub location: Option<String>,
    #[schema(value_type = Option<Vec<String>>)]
    pub favorite_genre_ids: Option<Vec<GenreId>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ProfileResponse {
    #[schema(value_type = String, format = "uuid")]
    pub user_id: UserId,
    pub username: String,
    pub display_name: Option<String>,
    pub bio: String,
    pub avatar_url: Option<String>,
    pub birth_date: Option<NaiveDate>,
    pub location: String,
    pub favorite_genres: Vec<GenreSummary>,
    pub updated_at: DateTime<Utc>,
}

impl ProfileResponse {
    pub fn new(profile: ProfileDBResponse, username: String, display_name: Option<String>, favorite_genres: Vec<GenreSummary>) -> Self {
        Self {
            user_id: profile.user_id,
            username,
            display_name,
            bio: profile.bio,
            avatar_url: profile.avatar_url,
            birth_date: profile.birth_date,
            location: profile.location,
            favorite_genres,
            updated_at: profile.updated_at,
        }
    }
}
