//! API request/response models for movies.

use super::pagination::{MOVIES_PAGE_SIZE, Pagination};
use crate::api::models::{genres::GenreSummary, people::PersonSummary, reviews::ReviewResponse};
use crate::db::{handlers::movies::MovieFilter, models::movies::MovieDBResponse};
use crate::sanitize::sanitize_optional;
use crate::types::{ActorId, DirectorId, GenreId, MovieId};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_with::{DisplayFromStr, serde_as};
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

pub const MIN_RELEASE_YEAR: i32 = 1888;
pub const MAX_RELEASE_YEAR: i32 = 2030;

/// Round an IMDb rating to one decimal place.
pub fn round_rating(rating: f64) -> f64 {
    (rating * 10.0).round() / 10.0
}

/// Create a movie. Genres, director and actors can be given as existing ids, as new names to be
/// created on save, or both.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, Validate)]
pub struct MovieCreate {
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    #[validate(range(min = 1888, max = 2030))]
    pub release_year: i32,
    pub release_date: Option<NaiveDate>,
    #[serde(default)]
    pub plot: String,
    #[validate(url, length(max = 500))]
    pub poster_url: Option<String>,
    #[validate(url, length(max = 500))]
    pub backdrop_url: Option<String>,
    #[validate(url, length(max = 500))]
    pub trailer_url: Option<String>,
    #[validate(range(min = 0.0, max = 10.0))]
    pub imdb_rating: Option<f64>,
    #[serde(default)]
    #[schema(value_type = Vec<String>)]
    pub genre_ids: Vec<GenreId>,
    /// Genre names to create (or reuse, ignoring case)
    #[serde(default)]
    pub new_genres: Vec<String>,
    #[schema(value_type = Option<String>, format = "uuid")]
    pub director_id: Option<DirectorId>,
    /// Director name to create (or reuse) when `director_id` is not given
    pub new_director: Option<String>,
    #[serde(default)]
    #[schema(value_type = Vec<String>)]
    pub actor_ids: Vec<ActorId>,
    #[serde(default)]
    pub new_actors: Vec<String>,
}

/// Partial movie update. Genre and actor lists are replaced when either their ids or their new
/// names are present.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema, Validate)]
pub struct MovieUpdate {
    #[validate(length(min = 1, max = 200))]
    pub title: Option<String>,
    #[validate(range(min = 1888, max = 2030))]
    pub release_year: Option<i32>,
    pub release_date: Option<NaiveDate>,
    pub plot: Option<String>,
    #[validate(url, length(max = 500))]
    pub poster_url: Option<String>,
    #[validate(url, length(max = 500))]
    pub backdrop_url: Option<String>,
    #[validate(url, length(max = 500))]
    pub trailer_url: Option<String>,
    #[validate(range(min = 0.0, max = 10.0))]
    pub imdb_rating: Option<f64>,
    #[schema(value_type = Option<Vec<String>>)]
    pub genre_ids: Option<Vec<GenreId>>,
    pub new_genres: Option<Vec<String>>,
    #[schema(value_type = Option<String>, format = "uuid")]
    pub director_id: Option<DirectorId>,
    pub new_director: Option<String>,
    #[schema(value_type = Option<Vec<String>>)]
    pub actor_ids: Option<Vec<ActorId>>,
    pub new_actors: Option<Vec<String>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct MovieResponse {
    #[schema(value_type = String, format = "uuid")]
    pub id: MovieId,
    pub title: String,
    pub release_year: i32,
    pub release_date: Option<NaiveDate>,
    pub plot: String,
    pub poster_url: Option<String>,
    pub backdrop_url: Option<String>,
    pub trailer_url: Option<String>,
    pub imdb_rating: Option<f64>,
    pub genres: Vec<GenreSummary>,
    pub director: Option<PersonSummary>,
    pub actors: Vec<PersonSummary>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl MovieResponse {
    pub fn new(db: MovieDBResponse, genres: Vec<GenreSummary>, director: Option<PersonSummary>, actors: Vec<PersonSummary>) -> Self {
        Self {
            id: db.id,
            title: db.title,
            release_year: db.release_year,
            release_date: db.release_date,
            plot: db.plot,
            poster_url: db.poster_url,
            backdrop_url: db.backdrop_url,
            trailer_url: db.trailer_url,
            imdb_rating: db.imdb_rating,
            genres,
            director,
            actors,
            created_at: db.created_at,
            updated_at: db.updated_at,
        }
    }
}

/// Movie detail page: the movie plus review statistics, related titles and, for a signed-in
/// caller, their own watchlist and review state.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct MovieDetailResponse {
    #[serde(flatten)]
    pub movie: MovieResponse,
    /// Mean user rating, 0 when there are no reviews
    pub average_rating: f64,
    pub review_count: i64,
    pub related: Vec<MovieResponse>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub in_watchlist: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_review: Option<ReviewResponse>,
}

/// Query parameters for the movie listing.
///
/// Numeric filters are taken as strings and parsed leniently: a malformed or out-of-range value
/// is ignored rather than rejected.
#[derive(Debug, Default, Deserialize, IntoParams, ToSchema)]
pub struct ListMoviesQuery {
    #[serde(flatten)]
    #[param(inline)]
    pub pagination: Pagination,

    /// Case-insensitive title substring
    pub title: Option<String>,
    /// Case-insensitive genre name substring
    pub genre: Option<String>,
    /// Case-insensitive director name substring
    pub director: Option<String>,
    /// Only movies with a user review rated at least this (0-10)
    pub rating_min: Option<String>,
    /// Earliest release year (1888-2030)
    pub year_min: Option<String>,
    /// Latest release year (1888-2030)
    pub year_max: Option<String>,
}

fn parse_year(value: Option<&str>) -> Option<i32> {
    value
        .and_then(|v| v.trim().parse::<i32>().ok())
        .filter(|year| (MIN_RELEASE_YEAR..=MAX_RELEASE_YEAR).contains(year))
}

impl ListMoviesQuery {
    pub fn to_filter(&self) -> MovieFilter {
        let rating_min = self
            .rating_min
            .as_deref()
            .and_then(|v| v.trim().parse::<f64>().ok())
            .filter(|r| (0.0..=10.0).contains(r))
            // Review ratings are whole numbers
            .map(|r| r.ceil() as i64);

        MovieFilter {
            skip: self.pagination.skip(),
            limit: self.pagination.limit_or(MOVIES_PAGE_SIZE),
            title: sanitize_optional(self.title.as_deref()),
            genre: sanitize_optional(self.genre.as_deref()),
            director: sanitize_optional(self.director.as_deref()),
            rating_min,
            year_min: parse_year(self.year_min.as_deref()),
            year_max: parse_year(self.year_max.as_deref()),
            ..Default::default()
        }
    }
}

/// Query for the latest, top-rated and classics collections.
#[serde_as]
#[derive(Debug, Default, Deserialize, IntoParams, ToSchema)]
pub struct CollectionQuery {
    /// Number of movies (default 10, max 100)
    #[serde_as(as = "Option<DisplayFromStr>")]
    #[serde(default)]
    pub limit: Option<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lenient_filters() {
        let query = ListMoviesQuery {
            title: Some("  <b>alien</b> ".to_string()),
            genre: Some("   ".to_string()),
            rating_min: Some("7.5".to_string()),
            year_min: Some("1700".to_string()),
            year_max: Some("nineteen-ninety".to_string()),
            ..Default::default()
        };
        let filter = query.to_filter();
        assert_eq!(filter.title.as_deref(), Some("alien"));
        assert_eq!(filter.genre, None);
        assert_eq!(filter.rating_min, Some(8));
        assert_eq!(filter.year_min, None);
        assert_eq!(filter.year_max, None);
        assert_eq!(filter.limit, MOVIES_PAGE_SIZE);
    }

    #[test]
    fn test_rating_out_of_range_ignored() {
        let query = ListMoviesQuery {
            rating_min: Some("11".to_string()),
            year_min: Some("1999".to_string()),
            ..Default::default()
        };
        let filter = query.to_filter();
        assert_eq!(filter.rating_min, None);
        assert_eq!(filter.year_min, Some(1999));
    }

    #[test]
    fn test_round_rating() {
        assert_eq!(round_rating(8.46), 8.5);
        assert_eq!(round_rating(7.0), 7.0);
    }
}
