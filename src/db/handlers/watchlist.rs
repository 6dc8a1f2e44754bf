//! Database repository for watchlist entries.
//!
//! Entries have nothing to update, so this is a plain repository rather than a
//! [`Repository`](super::Repository) implementation.

use crate::db::{
    errors::{DbError, Result},
    models::watchlist::{WatchlistEntryCreateDBRequest, WatchlistEntryDBResponse},
};
use crate::types::{MovieId, UserId, WatchlistEntryId, abbrev_uuid};
use chrono::{DateTime, Utc};
use sqlx::{FromRow, SqliteConnection};
use tracing::instrument;
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct WatchlistFilter {
    pub user_id: UserId,
    pub skip: i64,
    pub limit: i64,
}

#[derive(Debug, Clone, FromRow)]
struct WatchlistEntry {
    pub id: WatchlistEntryId,
    pub user_id: UserId,
    pub movie_id: MovieId,
    pub added_at: DateTime<Utc>,
}

impl From<WatchlistEntry> for WatchlistEntryDBResponse {
    fn from(entry: WatchlistEntry) -> Self {
        Self {
            id: entry.id,
            user_id: entry.user_id,
            movie_id: entry.movie_id,
            added_at: entry.added_at,
        }
    }
}

pub struct Watchlist<'c> {
    db: &'c mut SqliteConnection,
}

impl<'c> Watchlist<'c> {
    pub fn new(db: &'c mut SqliteConnection) -> Self {
        Self { db }
    }

    /// Add a movie to a user's watchlist. Adding it twice returns the existing entry and
    /// `false`.
    #[instrument(skip(self, request), fields(user_id = %abbrev_uuid(&request.user_id), movie_id = %abbrev_uuid(&request.movie_id)), err)]
    pub async fn add(&mut self, request: &WatchlistEntryCreateDBRequest) -> Result<(WatchlistEntryDBResponse, bool)> {
        let inserted = sqlx::query(
            "INSERT INTO watchlist (id, user_id, movie_id, added_at) VALUES (?, ?, ?, ?) ON CONFLICT (user_id, movie_id) DO NOTHING",
        )
        .bind(Uuid::new_v4())
        .bind(request.user_id)
        .bind(request.movie_id)
        .bind(Utc::now())
        .execute(&mut *self.db)
        .await?;

        let entry = self
            .get_for_user_and_movie(request.user_id, request.movie_id)
            .await?
            .ok_or(DbError::NotFound)?;
        Ok((entry, inserted.rows_affected() > 0))
    }

    #[instrument(skip(self), fields(entry_id = %abbrev_uuid(&id)), err)]
    pub async fn get_by_id(&mut self, id: WatchlistEntryId) -> Result<Option<WatchlistEntryDBResponse>> {
        let entry = sqlx::query_as::<_, WatchlistEntry>("SELECT * FROM watchlist WHERE id = ?")
            .bind(id)
            .fetch_optional(&mut *self.db)
            .await?;
        Ok(entry.map(WatchlistEntryDBResponse::from))
    }

    #[instrument(skip(self), fields(user_id = %abbrev_uuid(&user_id), movie_id = %abbrev_uuid(&movie_id)), err)]
    pub async fn get_for_user_and_movie(&mut self, user_id: UserId, movie_id: MovieId) -> Result<Option<WatchlistEntryDBResponse>> {
        let entry = sqlx::query_as::<_, WatchlistEntry>("SELECT * FROM watchlist WHERE user_id = ? AND movie_id = ?")
            .bind(user_id)
            .bind(movie_id)
            .fetch_optional(&mut *self.db)
            .await?;
        Ok(entry.map(WatchlistEntryDBResponse::from))
    }

    /// A user's entries, most recently added first.
    #[instrument(skip(self, filter), fields(user_id = %abbrev_uuid(&filter.user_id), limit = filter.limit, skip = filter.skip), err)]
    pub async fn list(&mut self, filter: &WatchlistFilter) -> Result<Vec<WatchlistEntryDBResponse>> {
        let entries = sqlx::query_as::<_, WatchlistEntry>(
            "SELECT * FROM watchlist WHERE user_id = ? ORDER BY added_at DESC LIMIT ? OFFSET ?",
        )
        .bind(filter.user_id)
        .bind(filter.limit)
        .bind(filter.skip)
        .fetch_all(&mut *self.db)
        .await?;
        Ok(entries.into_iter().map(WatchlistEntryDBResponse::from).collect())
    }

    #[instrument(skip(self), fields(user_id = %abbrev_uuid(&user_id)), err)]
    pub async fn count(&mut self, user_id: UserId) -> Result<i64> {
        Ok(sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM watchlist WHERE user_id = ?")
            .bind(user_id)
            .fetch_one(&mut *self.db)
            .await?)
    }

    #[instrument(skip(self), fields(entry_id = %abbrev_uuid(&id)), err)]
    pub async fn delete(&mut self, id: WatchlistEntryId) -> Result<bool> {
        let result = sqlx::query("DELETE FROM watchlist WHERE id = ?").bind(id).execute(&mut *self.db).await?;
        Ok(result.rows_affected() > 0)
    }
}
