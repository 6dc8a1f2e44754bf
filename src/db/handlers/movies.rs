//! Database repository for movies and their genre/actor links.

use crate::db::{
    errors::{DbError, Result},
    handlers::repository::Repository,
    models::movies::{MovieCreateDBRequest, MovieDBResponse, MovieUpdateDBRequest},
};
use crate::types::{ActorId, DirectorId, GenreId, MovieId, abbrev_uuid};
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{Connection, FromRow, QueryBuilder, Sqlite, SqliteConnection};
use std::collections::HashMap;
use tracing::instrument;
use uuid::Uuid;

/// Filter for the movie listing. String filters are case-insensitive substrings.
#[derive(Debug, Clone, Default)]
pub struct MovieFilter {
    pub skip: i64,
    pub limit: i64,
    pub title: Option<String>,
    pub genre: Option<String>,
    pub director: Option<String>,
    pub genre_id: Option<GenreId>,
    pub director_id: Option<DirectorId>,
    pub actor_id: Option<ActorId>,
    /// Only movies with at least one user review rated this or higher
    pub rating_min: Option<i64>,
    pub year_min: Option<i32>,
    pub year_max: Option<i32>,
}

impl MovieFilter {
    pub fn new(skip: i64, limit: i64) -> Self {
        Self {
            skip,
            limit,
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, FromRow)]
struct Movie {
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
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<(Movie, Vec<GenreId>, Vec<ActorId>)> for MovieDBResponse {
    fn from((movie, genre_ids, actor_ids): (Movie, Vec<GenreId>, Vec<ActorId>)) -> Self {
        Self {
            id: movie.id,
            title: movie.title,
            release_year: movie.release_year,
            release_date: movie.release_date,
            plot: movie.plot,
            poster_url: movie.poster_url,
            backdrop_url: movie.backdrop_url,
            trailer_url: movie.trailer_url,
            imdb_rating: movie.imdb_rating,
            director_id: movie.director_id,
            genre_ids,
            actor_ids,
            created_at: movie.created_at,
            updated_at: movie.updated_at,
        }
    }
}

pub struct Movies<'c> {
    db: &'c mut SqliteConnection,
}

/// Escape `\`, `%` and `_` so the value matches literally inside `LIKE ... ESCAPE '\'`.
fn escape_like(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

fn push_filters<'a>(query: &mut QueryBuilder<'a, Sqlite>, filter: &'a MovieFilter) {
    query.push(" WHERE 1 = 1");
    if let Some(title) = &filter.title {
        query
            .push(" AND m.title LIKE '%' || ")
            .push_bind(escape_like(title))
            .push(" || '%' ESCAPE '\\'");
    }
    if let Some(genre) = &filter.genre {
        query
            .push(" AND EXISTS (SELECT 1 FROM movie_genres mg JOIN genres g ON g.id = mg.genre_id WHERE mg.movie_id = m.id AND g.name LIKE '%' || ")
            .push_bind(escape_like(genre))
            .push(" || '%' ESCAPE '\\')");
    }
    if let Some(director) = &filter.director {
        query
            .push(" AND EXISTS (SELECT 1 FROM directors d WHERE d.id = m.director_id AND d.name LIKE '%' || ")
            .push_bind(escape_like(director))
            .push(" || '%' ESCAPE '\\')");
    }
    if let Some(genre_id) = filter.genre_id {
        query
            .push(" AND EXISTS (SELECT 1 FROM movie_genres mg WHERE mg.movie_id = m.id AND mg.genre_id = ")
            .push_bind(genre_id)
            .push(")");
    }
    if let Some(director_id) = filter.director_id {
        query.push(" AND m.director_id = ").push_bind(director_id);
    }
    if let Some(actor_id) = filter.actor_id {
        query
            .push(" AND EXISTS (SELECT 1 FROM movie_actors ma WHERE ma.movie_id = m.id AND ma.actor_id = ")
            .push_bind(actor_id)
            .push(")");
    }
    if let Some(rating_min) = filter.rating_min {
        query
            .push(" AND EXISTS (SELECT 1 FROM reviews r WHERE r.movie_id = m.id AND r.rating >= ")
            .push_bind(rating_min)
            .push(")");
    }
    if let Some(year_min) = filter.year_min {
        query.push(" AND m.release_year >= ").push_bind(year_min);
    }
    if let Some(year_max) = filter.year_max {
        query.push(" AND m.release_year <= ").push_bind(year_max);
    }
}

async fn insert_links(db: &mut SqliteConnection, movie_id: MovieId, genre_ids: &[GenreId], actor_ids: &[ActorId]) -> Result<()> {
    for genre_id in genre_ids {
        sqlx::query("INSERT OR IGNORE INTO movie_genres (movie_id, genre_id) VALUES (?, ?)")
            .bind(movie_id)
            .bind(genre_id)
            .execute(&mut *db)
            .await?;
    }
    for actor_id in actor_ids {
        sqlx::query("INSERT OR IGNORE INTO movie_actors (movie_id, actor_id) VALUES (?, ?)")
            .bind(movie_id)
            .bind(actor_id)
            .execute(&mut *db)
            .await?;
    }
    Ok(())
}

#[async_trait::async_trait]
impl<'c> Repository for Movies<'c> {
    type CreateRequest = MovieCreateDBRequest;
    type UpdateRequest = MovieUpdateDBRequest;
    type Response = MovieDBResponse;
    type Id = MovieId;
    type Filter = MovieFilter;

    #[instrument(skip(self, request), fields(title = %request.title, year = request.release_year), err)]
    async fn create(&mut self, request: &Self::CreateRequest) -> Result<Self::Response> {
        let movie_id = Uuid::new_v4();
        let now = Utc::now();

        let mut tx = self.db.begin().await?;
        sqlx::query(
            r#"
            INSERT INTO movies (id, title, release_year, release_date, plot, poster_url, backdrop_url, trailer_url,
                                imdb_rating, director_id, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(movie_id)
        .bind(&request.title)
        .bind(request.release_year)
        .bind(request.release_date)
        .bind(&request.plot)
        .bind(&request.poster_url)
        .bind(&request.backdrop_url)
        .bind(&request.trailer_url)
        .bind(request.imdb_rating)
        .bind(request.director_id)
        .bind(now)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        insert_links(&mut *tx, movie_id, &request.genre_ids, &request.actor_ids).await?;
        tx.commit().await?;

        self.get_by_id(movie_id).await?.ok_or(DbError::NotFound)
    }

    #[instrument(skip(self), fields(movie_id = %abbrev_uuid(&id)), err)]
    async fn get_by_id(&mut self, id: Self::Id) -> Result<Option<Self::Response>> {
        let movie = sqlx::query_as::<_, Movie>("SELECT * FROM movies WHERE id = ?")
            .bind(id)
            .fetch_optional(&mut *self.db)
            .await?;
        match movie {
            Some(movie) => Ok(Some(self.with_links(movie).await?)),
            None => Ok(None),
        }
    }

    #[instrument(skip(self, ids), fields(count = ids.len()), err)]
    async fn get_bulk(&mut self, ids: Vec<Self::Id>) -> Result<HashMap<Self::Id, Self::Response>> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }
        let mut query = QueryBuilder::<Sqlite>::new("SELECT * FROM movies WHERE id IN (");
        let mut separated = query.separated(", ");
        for id in &ids {
            separated.push_bind(*id);
        }
        separated.push_unseparated(")");
        let movies = query.build_query_as::<Movie>().fetch_all(&mut *self.db).await?;

        let mut result = HashMap::with_capacity(movies.len());
        for movie in movies {
            let movie = self.with_links(movie).await?;
            result.insert(movie.id, movie);
        }
        Ok(result)
    }

    #[instrument(skip(self, filter), fields(limit = filter.limit, skip = filter.skip), err)]
    async fn list(&mut self, filter: &Self::Filter) -> Result<Vec<Self::Response>> {
        let mut query = QueryBuilder::<Sqlite>::new("SELECT m.* FROM movies m");
        push_filters(&mut query, filter);
        query
            .push(" ORDER BY m.release_year DESC, m.title LIMIT ")
            .push_bind(filter.limit)
            .push(" OFFSET ")
            .push_bind(filter.skip);
        let movies = query.build_query_as::<Movie>().fetch_all(&mut *self.db).await?;
        self.with_links_all(movies).await
    }

    #[instrument(skip(self), fields(movie_id = %abbrev_uuid(&id)), err)]
    async fn delete(&mut self, id: Self::Id) -> Result<bool> {
        let result = sqlx::query("DELETE FROM movies WHERE id = ?").bind(id).execute(&mut *self.db).await?;
        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self, request), fields(movie_id = %abbrev_uuid(&id)), err)]
    async fn update(&mut self, id: Self::Id, request: &Self::UpdateRequest) -> Result<Self::Response> {
        let mut tx = self.db.begin().await?;
        let updated = sqlx::query(
            r#"
            UPDATE movies SET
                title = COALESCE(?, title),
                release_year = COALESCE(?, release_year),
                release_date = COALESCE(?, release_date),
                plot = COALESCE(?, plot),
                poster_url = COALESCE(?, poster_url),
                backdrop_url = COALESCE(?, backdrop_url),
                trailer_url = COALESCE(?, trailer_url),
                imdb_rating = COALESCE(?, imdb_rating),
                director_id = COALESCE(?, director_id),
                updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(&request.title)
        .bind(request.release_year)
        .bind(request.release_date)
        .bind(&request.plot)
        .bind(&request.poster_url)
        .bind(&request.backdrop_url)
        .bind(&request.trailer_url)
        .bind(request.imdb_rating)
        .bind(request.director_id)
        .bind(Utc::now())
        .bind(id)
        .execute(&mut *tx)
        .await?;
        if updated.rows_affected() == 0 {
            return Err(DbError::NotFound);
        }

        if let Some(genre_ids) = &request.genre_ids {
            sqlx::query("DELETE FROM movie_genres WHERE movie_id = ?").bind(id).execute(&mut *tx).await?;
            insert_links(&mut *tx, id, genre_ids, &[]).await?;
        }
        if let Some(actor_ids) = &request.actor_ids {
            sqlx::query("DELETE FROM movie_actors WHERE movie_id = ?").bind(id).execute(&mut *tx).await?;
            insert_links(&mut *tx, id, &[], actor_ids).await?;
        }
        tx.commit().await?;

        self.get_by_id(id).await?.ok_or(DbError::NotFound)
    }
}

impl<'c> Movies<'c> {
    pub fn new(db: &'c mut SqliteConnection) -> Self {
        Self { db }
    }

    async fn with_links(&mut self, movie: Movie) -> Result<MovieDBResponse> {
        let genre_ids = sqlx::query_scalar::<_, GenreId>(
            "SELECT mg.genre_id FROM movie_genres mg JOIN genres g ON g.id = mg.genre_id WHERE mg.movie_id = ? ORDER BY g.name",
        )
        .bind(movie.id)
        .fetch_all(&mut *self.db)
        .await?;
        let actor_ids = sqlx::query_scalar::<_, ActorId>(
            "SELECT ma.actor_id FROM movie_actors ma JOIN actors a ON a.id = ma.actor_id WHERE ma.movie_id = ? ORDER BY a.name",
        )
        .bind(movie.id)
        .fetch_all(&mut *self.db)
        .await?;
        Ok(MovieDBResponse::from((movie, genre_ids, actor_ids)))
    }

    async fn with_links_all(&mut self, movies: Vec<Movie>) -> Result<Vec<MovieDBResponse>> {
        let mut result = Vec::with_capacity(movies.len());
        for movie in movies {
            result.push(self.with_links(movie).await?);
        }
        Ok(result)
    }

    /// Count movies matching the filter, ignoring its skip and limit
    #[instrument(skip(self, filter), err)]
    pub async fn count(&mut self, filter: &MovieFilter) -> Result<i64> {
        let mut query = QueryBuilder::<Sqlite>::new("SELECT COUNT(*) FROM movies m");
        push_filters(&mut query, filter);
        Ok(query.build_query_scalar::<i64>().fetch_one(&mut *self.db).await?)
    }

    /// Movies released on or after `since`, newest release first.
    #[instrument(skip(self), err)]
    pub async fn latest(&mut self, since: NaiveDate, limit: i64) -> Result<Vec<MovieDBResponse>> {
        let movies = sqlx::query_as::<_, Movie>(
            "SELECT * FROM movies WHERE release_date IS NOT NULL AND release_date >= ? ORDER BY release_date DESC LIMIT ?",
        )
        .bind(since)
        .bind(limit)
        .fetch_all(&mut *self.db)
        .await?;
        self.with_links_all(movies).await
    }

    /// Movies with an IMDb rating, highest first.
    #[instrument(skip(self), err)]
    pub async fn top_rated(&mut self, limit: i64) -> Result<Vec<MovieDBResponse>> {
        let movies = sqlx::query_as::<_, Movie>(
            "SELECT * FROM movies WHERE imdb_rating IS NOT NULL ORDER BY imdb_rating DESC, title LIMIT ?",
        )
        .bind(limit)
        .fetch_all(&mut *self.db)
        .await?;
        self.with_links_all(movies).await
    }

    /// Movies released before `released_before` with an IMDb rating of at least `min_rating`.
    #[instrument(skip(self), err)]
    pub async fn classics(&mut self, released_before: NaiveDate, min_rating: f64, limit: i64) -> Result<Vec<MovieDBResponse>> {
        let movies = sqlx::query_as::<_, Movie>(
            r#"
            SELECT * FROM movies
            WHERE release_date IS NOT NULL AND release_date < ?
              AND imdb_rating IS NOT NULL AND imdb_rating >= ?
            ORDER BY imdb_rating DESC, title
            LIMIT ?
            "#,
        )
        .bind(released_before)
        .bind(min_rating)
        .bind(limit)
        .fetch_all(&mut *self.db)
        .await?;
        self.with_links_all(movies).await
    }

    /// Other movies sharing a genre or the director with `id`.
    #[instrument(skip(self), fields(movie_id = %abbrev_uuid(&id)), err)]
    pub async fn related(&mut self, id: MovieId, limit: i64) -> Result<Vec<MovieDBResponse>> {
        let movies = sqlx::query_as::<_, Movie>(
            r#"
            SELECT m.* FROM movies m
            WHERE m.id != ?1
              AND (
                EXISTS (
                    SELECT 1 FROM movie_genres mg
                    WHERE mg.movie_id = m.id
                      AND mg.genre_id IN (SELECT genre_id FROM movie_genres WHERE movie_id = ?1)
                )
                OR (m.director_id IS NOT NULL AND m.director_id = (SELECT director_id FROM movies WHERE id = ?1))
              )
            ORDER BY m.release_year DESC, m.title
            LIMIT ?2
            "#,
        )
        .bind(id)
        .bind(limit)
        .fetch_all(&mut *self.db)
        .await?;
        self.with_links_all(movies).await
    }
}
