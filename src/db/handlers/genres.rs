//! Database repository for genres.

use crate::db::{
    errors::{DbError, Result},
    handlers::repository::Repository,
    models::genres::{GenreCreateDBRequest, GenreDBResponse, GenreUpdateDBRequest},
};
use crate::types::{GenreId, abbrev_uuid};
use chrono::{DateTime, Utc};
use sqlx::{FromRow, QueryBuilder, Sqlite, SqliteConnection};
use std::collections::HashMap;
use tracing::instrument;
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct GenreFilter {
    pub skip: i64,
    pub limit: i64,
}

impl GenreFilter {
    pub fn new(skip: i64, limit: i64) -> Self {
        Self { skip, limit }
    }
}

#[derive(Debug, Clone, FromRow)]
struct Genre {
    pub id: GenreId,
    pub name: String,
    pub description: String,
    pub poster_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<Genre> for GenreDBResponse {
    fn from(genre: Genre) -> Self {
        Self {
            id: genre.id,
            name: genre.name,
            description: genre.description,
            poster_url: genre.poster_url,
            created_at: genre.created_at,
        }
    }
}

pub struct Genres<'c> {
    db: &'c mut SqliteConnection,
}

#[async_trait::async_trait]
impl<'c> Repository for Genres<'c> {
    type CreateRequest = GenreCreateDBRequest;
    type UpdateRequest = GenreUpdateDBRequest;
    type Response = GenreDBResponse;
    type Id = GenreId;
    type Filter = GenreFilter;

    #[instrument(skip(self, request), fields(name = %request.name), err)]
    async fn create(&mut self, request: &Self::CreateRequest) -> Result<Self::Response> {
        let genre = sqlx::query_as::<_, Genre>(
            "INSERT INTO genres (id, name, description, poster_url, created_at) VALUES (?, ?, ?, ?, ?) RETURNING *",
        )
        .bind(Uuid::new_v4())
        .bind(&request.name)
        .bind(&request.description)
        .bind(&request.poster_url)
        .bind(Utc::now())
        .fetch_one(&mut *self.db)
        .await?;

        Ok(GenreDBResponse::from(genre))
    }

    #[instrument(skip(self), fields(genre_id = %abbrev_uuid(&id)), err)]
    async fn get_by_id(&mut self, id: Self::Id) -> Result<Option<Self::Response>> {
        let genre = sqlx::query_as::<_, Genre>("SELECT * FROM genres WHERE id = ?")
            .bind(id)
            .fetch_optional(&mut *self.db)
            .await?;
        Ok(genre.map(GenreDBResponse::from))
    }

    #[instrument(skip(self, ids), fields(count = ids.len()), err)]
    async fn get_bulk(&mut self, ids: Vec<Self::Id>) -> Result<HashMap<Self::Id, Self::Response>> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }
        let mut query = QueryBuilder::<Sqlite>::new("SELECT * FROM genres WHERE id IN (");
        let mut separated = query.separated(", ");
        for id in &ids {
            separated.push_bind(*id);
        }
        separated.push_unseparated(")");

        let genres = query.build_query_as::<Genre>().fetch_all(&mut *self.db).await?;
        Ok(genres.into_iter().map(|g| (g.id, GenreDBResponse::from(g))).collect())
    }

    #[instrument(skip(self, filter), fields(limit = filter.limit, skip = filter.skip), err)]
    async fn list(&mut self, filter: &Self::Filter) -> Result<Vec<Self::Response>> {
        let genres = sqlx::query_as::<_, Genre>("SELECT * FROM genres ORDER BY name LIMIT ? OFFSET ?")
            .bind(filter.limit)
            .bind(filter.skip)
            .fetch_all(&mut *self.db)
            .await?;
        Ok(genres.into_iter().map(GenreDBResponse::from).collect())
    }

    #[instrument(skip(self), fields(genre_id = %abbrev_uuid(&id)), err)]
    async fn delete(&mut self, id: Self::Id) -> Result<bool> {
        let result = sqlx::query("DELETE FROM genres WHERE id = ?").bind(id).execute(&mut *self.db).await?;
        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self, request), fields(genre_id = %abbrev_uuid(&id)), err)]
    async fn update(&mut self, id: Self::Id, request: &Self::UpdateRequest) -> Result<Self::Response> {
        let genre = sqlx::query_as::<_, Genre>(
            r#"
            UPDATE genres SET
                name = COALESCE(?, name),
                description = COALESCE(?, description),
                poster_url = COALESCE(?, poster_url)
            WHERE id = ?
            RETURNING *
            "#,
        )
        .bind(&request.name)
        .bind(&request.description)
        .bind(&request.poster_url)
        .bind(id)
        .fetch_optional(&mut *self.db)
        .await?
        .ok_or(DbError::NotFound)?;
        Ok(GenreDBResponse::from(genre))
    }
}

impl<'c> Genres<'c> {
    pub fn new(db: &'c mut SqliteConnection) -> Self {
        Self { db }
    }

    pub async fn count(&mut self) -> Result<i64> {
        Ok(sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM genres")
            .fetch_one(&mut *self.db)
            .await?)
    }

    /// Look a genre up by name, case-insensitively, creating it if missing.
    #[instrument(skip(self), err)]
    pub async fn get_or_create(&mut self, name: &str) -> Result<GenreDBResponse> {
        let existing = sqlx::query_as::<_, Genre>("SELECT * FROM genres WHERE name = ?")
            .bind(name)
            .fetch_optional(&mut *self.db)
            .await?;
        if let Some(genre) = existing {
            return Ok(GenreDBResponse::from(genre));
        }
        self.create(&GenreCreateDBRequest {
            name: name.to_string(),
            description: String::new(),
            poster_url: None,
        })
        .await
    }
}
