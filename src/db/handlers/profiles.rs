//! Database repository for user profiles.
//!
//! Profiles are created together with their user (see [`super::Users`]) and deleted with it,
//! so this repository only reads and updates.

use crate::db::{
    errors::{DbError, Result},
    models::profiles::{ProfileDBResponse, ProfileUpdateDBRequest},
};
use crate::types::{GenreId, UserId, abbrev_uuid};
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{Connection, FromRow, SqliteConnection};
use tracing::instrument;

#[derive(Debug, Clone, FromRow)]
struct Profile {
    pub user_id: UserId,
    pub bio: String,
    pub avatar_url: Option<String>,
    pub birth_date: Option<NaiveDate>,
    pub location: String,
    pub updated_at: DateTime<Utc>,
}

impl From<(Profile, Vec<GenreId>)> for ProfileDBResponse {
    fn from((profile, favorite_genre_ids): (Profile, Vec<GenreId>)) -> Self {
        Self {
            user_id: profile.user_id,
            bio: profile.bio,
            avatar_url: profile.avatar_url,
            birth_date: profile.birth_date,
            location: profile.location,
            favorite_genre_ids,
            updated_at: profile.updated_at,
        }
    }
}

pub struct Profiles<'c> {
    db: &'c mut SqliteConnection,
}

impl<'c> Profiles<'c> {
    pub fn new(db: &'c mut SqliteConnection) -> Self {
        Self { db }
    }

    async fn favorite_genres(&mut self, user_id: UserId) -> Result<Vec<GenreId>> {
        let ids = sqlx::query_scalar::<_, GenreId>(
            r#"
            SELECT pfg.genre_id FROM profile_favorite_genres pfg
            JOIN genres g ON g.id = pfg.genre_id
            WHERE pfg.user_id = ?
            ORDER BY g.name
            "#,
        )
        .bind(user_id)
        .fetch_all(&mut *self.db)
        .await?;
        Ok(ids)
    }

    #[instrument(skip(self), fields(user_id = %abbrev_uuid(&user_id)), err)]
    pub async fn get(&mut self, user_id: UserId) -> Result<Option<ProfileDBResponse>> {
        let profile = sqlx::query_as::<_, Profile>("SELECT * FROM profiles WHERE user_id = ?")
            .bind(user_id)
            .fetch_optional(&mut *self.db)
            .await?;

        match profile {
            Some(profile) => {
                let genres = self.favorite_genres(user_id).await?;
                Ok(Some(ProfileDBResponse::from((profile, genres))))
            }
            None => Ok(None),
        }
    }

    /// Update profile fields; the favorite genre set is replaced atomically when given.
    #[instrument(skip(self, request), fields(user_id = %abbrev_uuid(&user_id)), err)]
    pub async fn update(&mut self, user_id: UserId, request: &ProfileUpdateDBRequest) -> Result<ProfileDBResponse> {
        let mut tx = self.db.begin().await?;

        let profile = sqlx::query_as::<_, Profile>(
            r#"
            UPDATE profiles SET
                bio = COALESCE(?, bio),
                avatar_url = CASE WHEN ? THEN ? ELSE avatar_url END,
                birth_date = CASE WHEN ? THEN ? ELSE birth_date END,
                location = COALESCE(?, location),
                updated_at = ?
            WHERE user_id = ?
            RETURNING *
            "#,
        )
        .bind(&request.bio)
        .bind(request.avatar_url.is_some())
        .bind(request.avatar_url.as_ref().and_then(Option::as_deref))
        .bind(request.birth_date.is_some())
        .bind(request.birth_date.flatten())
        .bind(&request.location)
        .bind(Utc::now())
        .bind(user_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(DbError::NotFound)?;

        if let Some(genre_ids) = &request.favorite_genre_ids {
            sqlx::query("DELETE FROM profile_favorite_genres WHERE user_id = ?")
                .bind(user_id)
                .execute(&mut *tx)
                .await?;
            for genre_id in genre_ids {
                sqlx::query("INSERT OR IGNORE INTO profile_favorite_genres (user_id, genre_id) VALUES (?, ?)")
                    .bind(user_id)
                    .bind(genre_id)
                    .execute(&mut *tx)
                    .await?;
            }
        }

        tx.commit().await?;

        let genres = self.favorite_genres(user_id).await?;
        Ok(ProfileDBResponse::from((profile, genres)))
    }
}
