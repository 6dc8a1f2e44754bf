//! Database models for movies.

use crate::types::{ActorId, DirectorId, GenreId, MovieId};
use chrono::{DateTime, NaiveDate, Utc};

#[derive(Debug, Clone)]
pub struct MovieCreateDBRequest {
    pub title: String,
    pub release_year: i32,
    pub release_date: Option<NaiveDate>,
    pub plot: String,
    pub poster_url: Option<String>,
    pub backdrop_url: Option<String>,
    pub trailer_url: Option<String>,
    pub imdb_rating: Option<f64>,
    pub director_id: Option<DirectorId>,
    pub genre_ids: Vec<GenreId>,
    pub actor_ids: Vec<ActorId>,
}

/// `None` leaves a column unchanged; link lists are replaced wholesale when present.
#[derive(Debug, Clone, Default)]
pub struct MovieUpdateDBRequest {
    pub title: Option<String>,
    pub release_year: Option<i32>,
    pub release_date: Option<NaiveDate>,
    pub plot: Option<String>,
    pub poster_url: Option<String>,
    pub backdrop_url: Option<String>,
    pub trailer_url: Option<String>,
    pub imdb_rating: Option<f64>,
    pub director_id: Option<DirectorId>,
    pub genre_ids: Option<Vec<GenreId>>,
    pub actor_ids: Option<Vec<ActorId>>,
}

#[derive(Debug, Clone)]
pub struct MovieDBResponse {
    pub id: MovieId,
    pub title: String,
    pub release_year: i32,
    pub release_date: Option<NaiveDate>,
    pub plot: String,
    pub poster_url: Option<String>,
    pub backdrop_url: Option<String>,
    pub trailer_url: Option<String>,
    pub imdb_rating: Option<f64>,
    pub director_id: Option<DirectorId>,
    pub genre_ids: Vec<GenreId>,
    pub actor_ids: Vec<ActorId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
