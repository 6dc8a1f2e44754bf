//! Database repository for directors and actors.

use crate::db::{
    errors::{DbError, Result},
    handlers::repository::Repository,
    models::people::{PersonCreateDBRequest, PersonDBResponse, PersonKind, PersonUpdateDBRequest},
};
use crate::types::abbrev_uuid;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{FromRow, QueryBuilder, Sqlite, SqliteConnection};
use std::collections::HashMap;
use tracing::instrument;
use uuid::Uuid;

#[derive(Debug, Clone, Default)]
pub struct PersonFilter {
    pub skip: i64,
    pub limit: i64,
    /// Case-insensitive name substring
    pub search: Option<String>,
}

impl PersonFilter {
    pub fn new(skip: i64, limit: i64) -> Self {
        Self {
            skip,
            limit,
            search: None,
        }
    }
}

#[derive(Debug, Clone, FromRow)]
struct Person {
    pub id: Uuid,
    pub name: String,
    pub bio: String,
    pub birth_date: Option<NaiveDate>,
    pub photo_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<Person> for PersonDBResponse {
    fn from(person: Person) -> Self {
        Self {
            id: person.id,
            name: person.name,
            bio: person.bio,
            birth_date: person.birth_date,
            photo_url: person.photo_url,
            created_at: person.created_at,
        }
    }
}

/// Repository over either the `directors` or the `actors` table.
pub struct People<'c> {
    db: &'c mut SqliteConnection,
    kind: PersonKind,
}

#[async_trait::async_trait]
impl<'c> Repository for People<'c> {
    type CreateRequest = PersonCreateDBRequest;
    type UpdateRequest = PersonUpdateDBRequest;
    type Response = PersonDBResponse;
    type Id = Uuid;
    type Filter = PersonFilter;

    #[instrument(skip(self, request), fields(table = self.kind.table(), name = %request.name), err)]
    async fn create(&mut self, request: &Self::CreateRequest) -> Result<Self::Response> {
        let sql = format!(
            "INSERT INTO {} (id, name, bio, birth_date, photo_url, created_at) VALUES (?, ?, ?, ?, ?, ?) RETURNING *",
            self.kind.table()
        );
        let person = sqlx::query_as::<_, Person>(&sql)
            .bind(Uuid::new_v4())
            .bind(&request.name)
            .bind(&request.bio)
            .bind(request.birth_date)
            .bind(&request.photo_url)
            .bind(Utc::now())
            .fetch_one(&mut *self.db)
            .await?;
        Ok(PersonDBResponse::from(person))
    }

    #[instrument(skip(self), fields(table = self.kind.table(), id = %abbrev_uuid(&id)), err)]
    async fn get_by_id(&mut self, id: Self::Id) -> Result<Option<Self::Response>> {
        let sql = format!("SELECT * FROM {} WHERE id = ?", self.kind.table());
        let person = sqlx::query_as::<_, Person>(&sql).bind(id).fetch_optional(&mut *self.db).await?;
        Ok(person.map(PersonDBResponse::from))
    }

    #[instrument(skip(self, ids), fields(table = self.kind.table(), count = ids.len()), err)]
    async fn get_bulk(&mut self, ids: Vec<Self::Id>) -> Result<HashMap<Self::Id, Self::Response>> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }
        let mut query = QueryBuilder::<Sqlite>::new(format!("SELECT * FROM {} WHERE id IN (", self.kind.table()));
        let mut separated = query.separated(", ");
        for id in &ids {
            separated.push_bind(*id);
        }
        separated.push_unseparated(")");
        let people = query.build_query_as::<Person>().fetch_all(&mut *self.db).await?;
        Ok(people.into_iter().map(|p| (p.id, PersonDBResponse::from(p))).collect())
    }

    #[instrument(skip(self, filter), fields(table = self.kind.table(), limit = filter.limit, skip = filter.skip), err)]
    async fn list(&mut self, filter: &Self::Filter) -> Result<Vec<Self::Response>> {
        let mut query = QueryBuilder::<Sqlite>::new(format!("SELECT * FROM {}", self.kind.table()));
        if let Some(search) = &filter.search {
            query.push(" WHERE name LIKE '%' || ").push_bind(search).push(" || '%'");
        }
        query
            .push(" ORDER BY name LIMIT ")
            .push_bind(filter.limit)
            .push(" OFFSET ")
            .push_bind(filter.skip);
        let people = query.build_query_as::<Person>().fetch_all(&mut *self.db).await?;
        Ok(people.into_iter().map(PersonDBResponse::from).collect())
    }

    #[instrument(skip(self), fields(table = self.kind.table(), id = %abbrev_uuid(&id)), err)]
    async fn delete(&mut self, id: Self::Id) -> Result<bool> {
        let sql = format!("DELETE FROM {} WHERE id = ?", self.kind.table());
        let result = sqlx::query(&sql).bind(id).execute(&mut *self.db).await?;
        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self, request), fields(table = self.kind.table(), id = %abbrev_uuid(&id)), err)]
    async fn update(&mut self, id: Self::Id, request: &Self::UpdateRequest) -> Result<Self::Response> {
        let sql = format!(
            r#"
            UPDATE {} SET
                name = COALESCE(?, name),
                bio = COALESCE(?, bio),
                birth_date = COALESCE(?, birth_date),
                photo_url = COALESCE(?, photo_url)
            WHERE id = ?
            RETURNING *
            "#,
            self.kind.table()
        );
        let person = sqlx::query_as::<_, Person>(&sql)
            .bind(&request.name)
            .bind(&request.bio)
            .bind(request.birth_date)
            .bind(&request.photo_url)
            .bind(id)
            .fetch_optional(&mut *self.db)
            .await?
            .ok_or(DbError::NotFound)?;
        Ok(PersonDBResponse::from(person))
    }
}

impl<'c> People<'c> {
    pub fn new(db: &'c mut SqliteConnection, kind: PersonKind) -> Self {
        Self { db, kind }
    }

    pub fn directors(db: &'c mut SqliteConnection) -> Self {
        Self::new(db, PersonKind::Director)
    }

    pub fn actors(db: &'c mut SqliteConnection) -> Self {
        Self::new(db, PersonKind::Actor)
    }

    pub async fn count(&mut self, filter: &PersonFilter) -> Result<i64> {
        let mut query = QueryBuilder::<Sqlite>::new(format!("SELECT COUNT(*) FROM {}", self.kind.table()));
        if let Some(search) = &filter.search {
            query.push(" WHERE name LIKE '%' || ").push_bind(search).push(" || '%'");
        }
        Ok(query.build_query_scalar::<i64>().fetch_one(&mut *self.db).await?)
    }

    /// Names are not unique, so this reuses the first exact match.
    #[instrument(skip(self), fields(table = self.kind.table()), err)]
    pub async fn get_or_create(&mut self, name: &str) -> Result<PersonDBResponse> {
        let sql = format!("SELECT * FROM {} WHERE name = ? ORDER BY created_at LIMIT 1", self.kind.table());
        let existing = sqlx::query_as::<_, Person>(&sql)
            .bind(name)
            .fetch_optional(&mut *self.db)
            .await?;
        match existing {
            Some(person) => Ok(PersonDBResponse::from(person)),
            None => self.create(&PersonCreateDBRequest::named(name)).await,
        }
    }
}
