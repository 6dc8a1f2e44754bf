//! API request/response models for directors and actors, which share one shape.

use super::pagination::Pagination;
use crate::api::models::movies::MovieResponse;
use crate::db::models::people::PersonDBResponse;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, Validate)]
pub struct PersonCreate {
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    #[serde(default)]
    pub bio: String,
    pub birth_date: Option<NaiveDate>,
    #[validate(url, length(max = 500))]
    pub photo_url: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema, Validate)]
pub struct PersonUpdate {
    #[validate(length(min = 1, max = 200))]
    pub name: Option<String>,
    pub bio: Option<String>,
    pub birth_date: Option<NaiveDate>,
    #[validate(url, length(max = 500))]
    pub photo_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PersonResponse {
    #[schema(value_type = String, format = "uuid")]
    pub id: Uuid,
    pub name: String,
    pub bio: String,
    pub birth_date: Option<NaiveDate>,
    pub photo_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// A director or actor and the movies they worked on.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PersonDetailResponse {
    #[serde(flatten)]
    pub person: PersonResponse,
    pub movies: Vec<MovieResponse>,
}

/// Id and name, as embedded in movies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct PersonSummary {
    #[schema(value_type = String, format = "uuid")]
    pub id: Uuid,
    pub name: String,
}

#[derive(Debug, Deserialize, IntoParams, ToSchema)]
pub struct ListPeopleQuery {
    #[serde(flatten)]
    #[param(inline)]
    pub pagination: Pagination,

    /// Case-insensitive name substring
    pub search: Option<String>,
}

impl From<PersonDBResponse> for PersonResponse {
    fn from(db: PersonDBResponse) -> Self {
        Self {
            id: db.id,
            name: db.name,
            bio: db.bio,
            birth_date: db.birth_date,
            photo_url: db.photo_url,
            created_at: db.created_at,
        }
    }
}

impl From<&PersonDBResponse> for PersonSummary {
    fn from(db: &PersonDBResponse) -> Self {
        Self {
            id: db.id,
            name: db.name.clone(),
        }
    }
}
