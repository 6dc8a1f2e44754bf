//! Database repository for comments.

use crate::db::{
    errors::{DbError, Result},
    handlers::repository::Repository,
    models::comments::{CommentCreateDBRequest, CommentDBResponse, CommentUpdateDBRequest},
};
use crate::types::{CommentId, ReviewId, UserId, abbrev_uuid};
use chrono::{DateTime, Utc};
use sqlx::{FromRow, QueryBuilder, Sqlite, SqliteConnection};
use std::collections::HashMap;
use tracing::instrument;
use uuid::Uuid;

#[derive(Debug, Clone, Default)]
pub struct CommentFilter {
    pub skip: i64,
    pub limit: i64,
    pub review_id: Option<ReviewId>,
    pub user_id: Option<UserId>,
}

impl CommentFilter {
    pub fn for_review(review_id: ReviewId, skip: i64, limit: i64) -> Self {
        Self {
            skip,
            limit,
            review_id: Some(review_id),
            user_id: None,
        }
    }
}

#[derive(Debug, Clone, FromRow)]
struct Comment {
    pub id: CommentId,
    pub review_id: ReviewId,
    pub user_id: UserId,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Comment> for CommentDBResponse {
    fn from(comment: Comment) -> Self {
        Self {
            id: comment.id,
            review_id: comment.review_id,
            user_id: comment.user_id,
            content: comment.content,
            created_at: comment.created_at,
            updated_at: comment.updated_at,
        }
    }
}

pub struct Comments<'c> {
    db: &'c mut SqliteConnection,
}

fn push_filters(query: &mut QueryBuilder<'_, Sqlite>, filter: &CommentFilter) {
    query.push(" WHERE 1 = 1");
    if let Some(review_id) = filter.review_id {
        query.push(" AND review_id = ").push_bind(review_id);
    }
    if let Some(user_id) = filter.user_id {
        query.push(" AND user_id = ").push_bind(user_id);
    }
}

#[async_trait::async_trait]
impl<'c> Repository for Comments<'c> {
    type CreateRequest = CommentCreateDBRequest;
    type UpdateRequest = CommentUpdateDBRequest;
    type Response = CommentDBResponse;
    type Id = CommentId;
    type Filter = CommentFilter;

    #[instrument(skip(self, request), fields(review_id = %abbrev_uuid(&request.review_id), user_id = %abbrev_uuid(&request.user_id)), err)]
    async fn create(&mut self, request: &Self::CreateRequest) -> Result<Self::Response> {
        let now = Utc::now();
        let comment = sqlx::query_as::<_, Comment>(
            "INSERT INTO comments (id, review_id, user_id, content, created_at, updated_at) VALUES (?, ?, ?, ?, ?, ?) RETURNING *",
        )
        .bind(Uuid::new_v4())
        .bind(request.review_id)
        .bind(request.user_id)
        .bind(&request.content)
        .bind(now)
        .bind(now)
        .fetch_one(&mut *self.db)
        .await?;
        Ok(CommentDBResponse::from(comment))
    }

    #[instrument(skip(self), fields(comment_id = %abbrev_uuid(&id)), err)]
    async fn get_by_id(&mut self, id: Self::Id) -> Result<Option<Self::Response>> {
        let comment = sqlx::query_as::<_, Comment>("SELECT * FROM comments WHERE id = ?")
            .bind(id)
            .fetch_optional(&mut *self.db)
            .await?;
        Ok(comment.map(CommentDBResponse::from))
    }

    #[instrument(skip(self, ids), fields(count = ids.len()), err)]
    async fn get_bulk(&mut self, ids: Vec<Self::Id>) -> Result<HashMap<Self::Id, Self::Response>> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }
        let mut query = QueryBuilder::<Sqlite>::new("SELECT * FROM comments WHERE id IN (");
        let mut separated = query.separated(", ");
        for id in &ids {
            separated.push_bind(*id);
        }
        separated.push_unseparated(")");
        let comments = query.build_query_as::<Comment>().fetch_all(&mut *self.db).await?;
        Ok(comments.into_iter().map(|c| (c.id, CommentDBResponse::from(c))).collect())
    }

    /// Oldest first, so a thread reads top to bottom.
    #[instrument(skip(self, filter), fields(limit = filter.limit, skip = filter.skip), err)]
    async fn list(&mut self, filter: &Self::Filter) -> Result<Vec<Self::Response>> {
        let mut query = QueryBuilder::<Sqlite>::new("SELECT * FROM comments");
        push_filters(&mut query, filter);
        query
            .push(" ORDER BY created_at ASC LIMIT ")
            .push_bind(filter.limit)
            .push(" OFFSET ")
            .push_bind(filter.skip);
        let comments = query.build_query_as::<Comment>().fetch_all(&mut *self.db).await?;
        Ok(comments.into_iter().map(CommentDBResponse::from).collect())
    }

    #[instrument(skip(self), fields(comment_id = %abbrev_uuid(&id)), err)]
    async fn delete(&mut self, id: Self::Id) -> Result<bool> {
        let result = sqlx::query("DELETE FROM comments WHERE id = ?").bind(id).execute(&mut *self.db).await?;
        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self, request), fields(comment_id = %abbrev_uuid(&id)), err)]
    async fn update(&mut self, id: Self::Id, request: &Self::UpdateRequest) -> Result<Self::Response> {
        let comment = sqlx::query_as::<_, Comment>("UPDATE comments SET content = ?, updated_at = ? WHERE id = ? RETURNING *")
            .bind(&request.content)
            .bind(Utc::now())
            .bind(id)
            .fetch_optional(&mut *self.db)
            .await?
            .ok_or(DbError::NotFound)?;
        Ok(CommentDBResponse::from(comment))
    }
}

impl<'c> Comments<'c> {
    pub fn new(db: &'c mut SqliteConnection) -> Self {
        Self { db }
    }

    #[instrument(skip(self, filter), err)]
    pub async fn count(&mut self, filter: &CommentFilter) -> Result<i64> {
        let mut query = QueryBuilder::<Sqlite>::new("SELECT COUNT(*) FROM comments");
        push_filters(&mut query, filter);
        Ok(query.build_query_scalar::<i64>().fetch_one(&mut *self.db).await?)
    }
}
