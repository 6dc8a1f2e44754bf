//! API request/response models for genres.

use crate::api::models::movies::MovieResponse;
use crate::db::models::genres::GenreDBResponse;
use crate::types::GenreId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, Validate)]
pub struct GenreCreate {
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[validate(url, length(max = 500))]
    pub poster_url: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema, Validate)]
pub struct GenreUpdate {
    #[validate(length(min = 1, max = 100))]
    pub name: Option<String>,
    pub description: Option<String>,
    #[validate(url, length(max = 500))]
    pub poster_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct GenreResponse {
    #[schema(value_type = String, format = "uuid")]
    pub id: GenreId,
    pub name: String,
    pub description: String,
    pub poster_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// A genre and the movies filed under it.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct GenreDetailResponse {
    #[serde(flatten)]
    pub genre: GenreResponse,
    pub movies: Vec<MovieResponse>,
}

/// Id and name, as embedded in movies and profiles.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct GenreSummary {
    #[schema(value_type = String, format = "uuid")]
    pub id: GenreId,
    pub name: String,
}

impl From<GenreDBResponse> for GenreResponse {
    fn from(db: GenreDBResponse) -> Self {
        Self {
            id: db.id,
            name: db.name,
            description: db.description,
            poster_url: db.poster_url,
            created_at: db.created_at,
        }
    }
}

impl From<&GenreDBResponse> for GenreSummary {
    fn from(db: &GenreDBResponse) -> Self {
        Self {
            id: db.id,
            name: db.name.clone(),
        }
    }
}
