//! Database models for genres.

use crate::types::GenreId;
use chrono::{DateTime, Utc};

#[derive(Debug, Clone)]
pub struct GenreCreateDBRequest {
    pub name: String,
    pub description: String,
    pub poster_url: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct GenreUpdateDBRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub poster_url: Option<String>,
}

#[derive(Debug, Clone)]
pub struct GenreDBResponse {
    pub id: GenreId,
    pub name: String,
    pub description: String,
    pub poster_url: Option<String>,
    pub created_at: DateTime<Utc>,
}
