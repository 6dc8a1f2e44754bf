//! Database repository for reviews.

use crate::db::{
    errors::{DbError, Result},
    handlers::repository::Repository,
    models::reviews::{ReviewCreateDBRequest, ReviewDBResponse, ReviewUpdateDBRequest},
};
use crate::types::{MovieId, ReviewId, UserId, abbrev_uuid};
use chrono::{DateTime, Utc};
use sqlx::{FromRow, QueryBuilder, Sqlite, SqliteConnection};
use std::collections::HashMap;
use tracing::instrument;
use uuid::Uuid;

#[derive(Debug, Clone, Default)]
pub struct ReviewFilter {
    pub skip: i64,
    pub limit: i64,
    pub movie_id: Option<MovieId>,
    pub user_id: Option<UserId>,
}

impl ReviewFilter {
    pub fn new(skip: i64, limit: i64) -> Self {
        Self {
            skip,
            limit,
            ..Default::default()
        }
    }

    pub fn for_movie(mut self, movie_id: MovieId) -> Self {
        self.movie_id = Some(movie_id);
        self
    }

    pub fn by_user(mut self, user_id: UserId) -> Self {
        self.user_id = Some(user_id);
        self
    }
}

/// Average user rating and number of reviews for a movie.
#[derive(Debug, Clone, Copy, PartialEq, FromRow)]
pub struct RatingSummary {
    pub average: f64,
    pub count: i64,
}

#[derive(Debug, Clone, FromRow)]
struct Review {
    pub id: ReviewId,
    pub movie_id: MovieId,
    pub user_id: UserId,
    pub rating: i64,
    pub title: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Review> for ReviewDBResponse {
    fn from(review: Review) -> Self {
        Self {
            id: review.id,
            movie_id: review.movie_id,
            user_id: review.user_id,
            rating: review.rating,
            title: review.title,
            content: review.content,
            created_at: review.created_at,
            updated_at: review.updated_at,
        }
    }
}

pub struct Reviews<'c> {
    db: &'c mut SqliteConnection,
}

fn push_filters(query: &mut QueryBuilder<'_, Sqlite>, filter: &ReviewFilter) {
    query.push(" WHERE 1 = 1");
    if let Some(movie_id) = filter.movie_id {
        query.push(" AND movie_id = ").push_bind(movie_id);
    }
    if let Some(user_id) = filter.user_id {
        query.push(" AND user_id = ").push_bind(user_id);
    }
}

#[async_trait::async_trait]
impl<'c> Repository for Reviews<'c> {
    type CreateRequest = ReviewCreateDBRequest;
    type UpdateRequest = ReviewUpdateDBRequest;
    type Response = ReviewDBResponse;
    type Id = ReviewId;
    type Filter = ReviewFilter;

    #[instrument(skip(self, request), fields(movie_id = %abbrev_uuid(&request.movie_id), user_id = %abbrev_uuid(&request.user_id)), err)]
    async fn create(&mut self, request: &Self::CreateRequest) -> Result<Self::Response> {
        let now = Utc::now();
        let review = sqlx::query_as::<_, Review>(
            r#"
            INSERT INTO reviews (id, movie_id, user_id, rating, title, content, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(request.movie_id)
        .bind(request.user_id)
        .bind(request.rating)
        .bind(&request.title)
        .bind(&request.content)
        .bind(now)
        .bind(now)
        .fetch_one(&mut *self.db)
        .await?;
        Ok(ReviewDBResponse::from(review))
    }

    #[instrument(skip(self), fields(review_id = %abbrev_uuid(&id)), err)]
    async fn get_by_id(&mut self, id: Self::Id) -> Result<Option<Self::Response>> {
        let review = sqlx::query_as::<_, Review>("SELECT * FROM reviews WHERE id = ?")
            .bind(id)
            .fetch_optional(&mut *self.db)
            .await?;
        Ok(review.map(ReviewDBResponse::from))
    }

    #[instrument(skip(self, ids), fields(count = ids.len()), err)]
    async fn get_bulk(&mut self, ids: Vec<Self::Id>) -> Result<HashMap<Self::Id, Self::Response>> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }
        let mut query = QueryBuilder::<Sqlite>::new("SELECT * FROM reviews WHERE id IN (");
        let mut separated = query.separated(", ");
        for id in &ids {
            separated.push_bind(*id);
        }
        separated.push_unseparated(")");
        let reviews = query.build_query_as::<Review>().fetch_all(&mut *self.db).await?;
        Ok(reviews.into_iter().map(|r| (r.id, ReviewDBResponse::from(r))).collect())
    }

    /// Newest first.
    #[instrument(skip(self, filter), fields(limit = filter.limit, skip = filter.skip), err)]
    async fn list(&mut self, filter: &Self::Filter) -> Result<Vec<Self::Response>> {
        let mut query = QueryBuilder::<Sqlite>::new("SELECT * FROM reviews");
        push_filters(&mut query, filter);
        query
            .push(" ORDER BY created_at DESC LIMIT ")
            .push_bind(filter.limit)
            .push(" OFFSET ")
            .push_bind(filter.skip);
        let reviews = query.build_query_as::<Review>().fetch_all(&mut *self.db).await?;
        Ok(reviews.into_iter().map(ReviewDBResponse::from).collect())
    }

    #[instrument(skip(self), fields(review_id = %abbrev_uuid(&id)), err)]
    async fn delete(&mut self, id: Self::Id) -> Result<bool> {
        let result = sqlx::query("DELETE FROM reviews WHERE id = ?").bind(id).execute(&mut *self.db).await?;
        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self, request), fields(review_id = %abbrev_uuid(&id)), err)]
    async fn update(&mut self, id: Self::Id, request: &Self::UpdateRequest) -> Result<Self::Response> {
        let review = sqlx::query_as::<_, Review>(
            r#"
            UPDATE reviews SET
                rating = COALESCE(?, rating),
                title = COALESCE(?, title),
                content = COALESCE(?, content),
                updated_at = ?
            WHERE id = ?
            RETURNING *
            "#,
        )
        .bind(request.rating)
        .bind(&request.title)
        .bind(&request.content)
        .bind(Utc::now())
        .bind(id)
        .fetch_optional(&mut *self.db)
        .await?
        .ok_or(DbError::NotFound)?;
        Ok(ReviewDBResponse::from(review))
    }
}

impl<'c> Reviews<'c> {
    pub fn new(db: &'c mut SqliteConnection) -> Self {
        Self { db }
    }

    /// Count reviews matching the filter, ignoring its skip and limit
    #[instrument(skip(self, filter), err)]
    pub async fn count(&mut self, filter: &ReviewFilter) -> Result<i64> {
        let mut query = QueryBuilder::<Sqlite>::new("SELECT COUNT(*) FROM reviews");
        push_filters(&mut query, filter);
        Ok(query.build_query_scalar::<i64>().fetch_one(&mut *self.db).await?)
    }

    /// Average is 0 when the movie has no reviews.
    #[instrument(skip(self), fields(movie_id = %abbrev_uuid(&movie_id)), err)]
    pub async fn rating_summary(&mut self, movie_id: MovieId) -> Result<RatingSummary> {
        let summary = sqlx::query_as::<_, RatingSummary>(
            "SELECT COALESCE(AVG(CAST(rating AS REAL)), 0.0) AS average, COUNT(*) AS count FROM reviews WHERE movie_id = ?",
        )
        .bind(movie_id)
        .fetch_one(&mut *self.db)
        .await?;
        Ok(summary)
    }

    /// The review `user_id` wrote for `movie_id`, if any.
    #[instrument(skip(self), fields(movie_id = %abbrev_uuid(&movie_id), user_id = %abbrev_uuid(&user_id)), err)]
    pub async fn get_for_movie_and_user(&mut self, movie_id: MovieId, user_id: UserId) -> Result<Option<ReviewDBResponse>> {
        let review = sqlx::query_as::<_, Review>("SELECT * FROM reviews WHERE movie_id = ? AND user_id = ?")
            .bind(movie_id)
            .bind(user_id)
            .fetch_optional(&mut *self.db)
            .await?;
        Ok(review.map(ReviewDBResponse::from))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{create_test_movie, create_test_user};
    use crate::types::Role;
    use sqlx::SqlitePool;

    fn review(movie_id: MovieId, user_id: UserId, rating: i64) -> ReviewCreateDBRequest {
        ReviewCreateDBRequest {
            movie_id,
            user_id,
            rating,
            title: "Worth it".to_string(),
            content: "Would watch again".to_string(),
        }
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_one_review_per_movie_and_user(pool: SqlitePool) {
        let user = create_test_user(&pool, Role::User).await;
        let movie = create_test_movie(&pool, "Stalker", 1979).await;
        let mut conn = pool.acquire().await.unwrap();
        let mut repo = Reviews::new(&mut conn);

        repo.create(&review(movie.id, user.id, 8)).await.unwrap();
        let err = repo.create(&review(movie.id, user.id, 3)).await.unwrap_err();
        assert!(matches!(err, DbError::UniqueViolation { table: Some(ref t), .. } if t == "reviews"));
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_rating_must_be_in_range(pool: SqlitePool) {
        let user = create_test_user(&pool, Role::User).await;
        let movie = create_test_movie(&pool, "Mirror", 1975).await;
        let mut conn = pool.acquire().await.unwrap();
        let err = Reviews::new(&mut conn).create(&review(movie.id, user.id, 11)).await.unwrap_err();
        assert!(matches!(err, DbError::CheckViolation { .. }));
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_rating_summary(pool: SqlitePool) {
        let movie = create_test_movie(&pool, "Ran", 1985).await;
        let a = create_test_user(&pool, Role::User).await;
        let b = create_test_user(&pool, Role::User).await;
        let mut conn = pool.acquire().await.unwrap();
        let mut repo = Reviews::new(&mut conn);

        let empty = repo.rating_summary(movie.id).await.unwrap();
        assert_eq!(empty, RatingSummary { average: 0.0, count: 0 });

        repo.create(&review(movie.id, a.id, 9)).await.unwrap();
        repo.create(&review(movie.id, b.id, 6)).await.unwrap();
        let summary = repo.rating_summary(movie.id).await.unwrap();
        assert_eq!(summary.count, 2);
        assert!((summary.average - 7.5).abs() < f64::EPSILON);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_list_by_movie_and_user(pool: SqlitePool) {
        let first = create_test_movie(&pool, "Ikiru", 1952).await;
        let second = create_test_movie(&pool, "Rashomon", 1950).await;
        let user = create_test_user(&pool, Role::User).await;
        let other = create_test_user(&pool, Role::User).await;
        let mut conn = pool.acquire().await.unwrap();
        let mut repo = Reviews::new(&mut conn);

        repo.create(&review(first.id, user.id, 7)).await.unwrap();
        repo.create(&review(second.id, user.id, 8)).await.unwrap();
        repo.create(&review(first.id, other.id, 5)).await.unwrap();

        let for_first = ReviewFilter::new(0, 10).for_movie(first.id);
        assert_eq!(repo.count(&for_first).await.unwrap(), 2);

        let by_user = repo.list(&ReviewFilter::new(0, 10).by_user(user.id)).await.unwrap();
        assert_eq!(by_user.len(), 2);
        // Newest first
        assert_eq!(by_user[0].movie_id, second.id);

        let mine = repo.get_for_movie_and_user(first.id, other.id).await.unwrap().unwrap();
        assert_eq!(mine.rating, 5);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_update_keeps_owner(pool: SqlitePool) {
        let movie = create_test_movie(&pool, "High and Low", 1963).await;
        let user = create_test_user(&pool, Role::User).await;
        let mut conn = pool.acquire().await.unwrap();
        let mut repo = Reviews::new(&mut conn);

        let created = repo.create(&review(movie.id, user.id, 6)).await.unwrap();
        let updated = repo
            .update(
                created.id,
                &ReviewUpdateDBRequest {
                    rating: Some(9),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.rating, 9);
        assert_eq!(updated.user_id, user.id);
        assert_eq!(updated.title, "Worth it");
    }
}
