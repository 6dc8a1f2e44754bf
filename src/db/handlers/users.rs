//! Database repository for users.

use crate::types::{Role, UserId, abbrev_uuid};
use crate::db::{
    errors::{DbError, Result},
    handlers::repository::Repository,
    models::users::{UserCreateDBRequest, UserDBResponse, UserUpdateDBRequest},
};
use chrono::{DateTime, Utc};
use sqlx::{Connection, FromRow, QueryBuilder, Sqlite, SqliteConnection};
use std::collections::HashMap;
use tracing::instrument;
use uuid::Uuid;

/// Filter for listing users
#[derive(Debug, Clone, Default)]
pub struct UserFilter {
    pub skip: i64,
    pub limit: i64,
    /// Case-insensitive substring of username, email or display name
    pub search: Option<String>,
    pub role: Option<Role>,
}

impl UserFilter {
    pub fn new(skip: i64, limit: i64) -> Self {
        Self {
            skip,
            limit,
            ..Default::default()
        }
    }

    pub fn with_search(mut self, search: String) -> Self {
        self.search = Some(search);
        self
    }

    pub fn with_role(mut self, role: Role) -> Self {
        self.role = Some(role);
        self
    }
}

// Database entity model
#[derive(Debug, Clone, FromRow)]
struct User {
    pub id: UserId,
    pub username: String,
    pub email: String,
    pub display_name: Option<String>,
    pub role: Role,
    pub auth_source: String,
    pub password_hash: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub last_login: Option<DateTime<Utc>>,
}

impl From<User> for UserDBResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            username: user.username,
            email: user.email,
            display_name: user.display_name,
            role: user.role,
            auth_source: user.auth_source,
            password_hash: user.password_hash,
            created_at: user.created_at,
            updated_at: user.updated_at,
            last_login: user.last_login,
        }
    }
}

pub struct Users<'c> {
    db: &'c mut SqliteConnection,
}

fn push_filters<'a>(query: &mut QueryBuilder<'a, Sqlite>, filter: &'a UserFilter) {
    query.push(" WHERE 1 = 1");
    if let Some(search) = &filter.search {
        query
            .push(" AND (username LIKE '%' || ")
            .push_bind(search)
            .push(" || '%' OR email LIKE '%' || ")
            .push_bind(search)
            .push(" || '%' OR COALESCE(display_name, '') LIKE '%' || ")
            .push_bind(search)
            .push(" || '%')");
    }
    if let Some(role) = filter.role {
        query.push(" AND role = ").push_bind(role);
    }
}

#[async_trait::async_trait]
impl<'c> Repository for Users<'c> {
    type CreateRequest = UserCreateDBRequest;
    type UpdateRequest = UserUpdateDBRequest;
    type Response = UserDBResponse;
    type Id = UserId;
    type Filter = UserFilter;

    /// Creates the account and its empty profile together.
    #[instrument(skip(self, request), fields(username = %request.username, role = %request.role), err)]
    async fn create(&mut self, request: &Self::CreateRequest) -> Result<Self::Response> {
        let user_id = Uuid::new_v4();
        let now = Utc::now();

        let mut tx = self.db.begin().await?;
        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (id, username, email, display_name, role, auth_source, password_hash, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            RETURNING *
            "#,
        )
        .bind(user_id)
        .bind(&request.username)
        .bind(&request.email)
        .bind(&request.display_name)
        .bind(request.role)
        .bind(&request.auth_source)
        .bind(&request.password_hash)
        .bind(now)
        .bind(now)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query("INSERT INTO profiles (user_id, updated_at) VALUES (?, ?)")
            .bind(user_id)
            .bind(now)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        Ok(UserDBResponse::from(user))
    }

    #[instrument(skip(self), fields(user_id = %abbrev_uuid(&id)), err)]
    async fn get_by_id(&mut self, id: Self::Id) -> Result<Option<Self::Response>> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = ?")
            .bind(id)
            .fetch_optional(&mut *self.db)
            .await?;

        Ok(user.map(UserDBResponse::from))
    }

    #[instrument(skip(self, ids), fields(count = ids.len()), err)]
    async fn get_bulk(&mut self, ids: Vec<UserId>) -> Result<HashMap<Self::Id, UserDBResponse>> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }

        let mut query = QueryBuilder::<Sqlite>::new("SELECT * FROM users WHERE id IN (");
        let mut separated = query.separated(", ");
        for id in &ids {
            separated.push_bind(*id);
        }
        separated.push_unseparated(")");

        let users = query.build_query_as::<User>().fetch_all(&mut *self.db).await?;

        Ok(users.into_iter().map(|u| (u.id, UserDBResponse::from(u))).collect())
    }

    #[instrument(skip(self, filter), fields(limit = filter.limit, skip = filter.skip), err)]
    async fn list(&mut self, filter: &Self::Filter) -> Result<Vec<Self::Response>> {
        let mut query = QueryBuilder::<Sqlite>::new("SELECT * FROM users");
        push_filters(&mut query, filter);
        query
            .push(" ORDER BY created_at DESC LIMIT ")
            .push_bind(filter.limit)
            .push(" OFFSET ")
            .push_bind(filter.skip);

        let users = query.build_query_as::<User>().fetch_all(&mut *self.db).await?;

        Ok(users.into_iter().map(UserDBResponse::from).collect())
    }

    #[instrument(skip(self), fields(user_id = %abbrev_uuid(&id)), err)]
    async fn delete(&mut self, id: Self::Id) -> Result<bool> {
        let result = sqlx::query("DELETE FROM users WHERE id = ?").bind(id).execute(&mut *self.db).await?;

        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self, request), fields(user_id = %abbrev_uuid(&id)), err)]
    async fn update(&mut self, id: Self::Id, request: &Self::UpdateRequest) -> Result<Self::Response> {
        let user = sqlx::query_as::<_, User>(
            r#"
            UPDATE users SET
                display_name = COALESCE(?, display_name),
                role = COALESCE(?, role),
                password_hash = COALESCE(?, password_hash),
                updated_at = ?
            WHERE id = ?
            RETURNING *
            "#,
        )
        .bind(&request.display_name)
        .bind(request.role)
        .bind(&request.password_hash)
        .bind(Utc::now())
        .bind(id)
        .fetch_optional(&mut *self.db)
        .await?
        .ok_or(DbError::NotFound)?;

        Ok(UserDBResponse::from(user))
    }
}

impl<'c> Users<'c> {
    pub fn new(db: &'c mut SqliteConnection) -> Self {
        Self { db }
    }

    /// Count users matching the filter, ignoring its skip and limit
    #[instrument(skip(self, filter), err)]
    pub async fn count(&mut self, filter: &UserFilter) -> Result<i64> {
        let mut query = QueryBuilder::<Sqlite>::new("SELECT COUNT(*) FROM users");
        push_filters(&mut query, filter);
        let count = query.build_query_scalar::<i64>().fetch_one(&mut *self.db).await?;
        Ok(count)
    }

    #[instrument(skip(self, email), err)]
    pub async fn get_user_by_email(&mut self, email: &str) -> Result<Option<UserDBResponse>> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE email = ?")
            .bind(email)
            .fetch_optional(&mut *self.db)
            .await?;

        Ok(user.map(UserDBResponse::from))
    }

    /// Login accepts either the email or the username.
    #[instrument(skip(self, login), err)]
    pub async fn get_user_by_login(&mut self, login: &str) -> Result<Option<UserDBResponse>> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE email = ? OR username = ? LIMIT 1")
            .bind(login)
            .bind(login)
            .fetch_optional(&mut *self.db)
            .await?;

        Ok(user.map(UserDBResponse::from))
    }

    #[instrument(skip(self), fields(user_id = %abbrev_uuid(&id)), err)]
    pub async fn record_login(&mut self, id: UserId) -> Result<()> {
        sqlx::query("UPDATE users SET last_login = ? WHERE id = ?")
            .bind(Utc::now())
            .bind(id)
            .execute(&mut *self.db)
            .await?;
        Ok(())
    }

    /// The most recently registered users.
    #[instrument(skip(self), err)]
    pub async fn recent(&mut self, limit: i64) -> Result<Vec<UserDBResponse>> {
        let users = sqlx::query_as::<_, User>("SELECT * FROM users ORDER BY created_at DESC LIMIT ?")
            .bind(limit)
            .fetch_all(&mut *self.db)
            .await?;
        Ok(users.into_iter().map(UserDBResponse::from).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::SqlitePool;

    fn create_request(username: &str, role: Role) -> UserCreateDBRequest {
        UserCreateDBRequest {
            username: username.to_string(),
            email: format!("{username}@example.com"),
            display_name: None,
            role,
            auth_source: "native".to_string(),
            password_hash: None,
        }
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_create_user_with_profile(pool: SqlitePool) {
        let mut conn = pool.acquire().await.unwrap();
        let mut repo = Users::new(&mut conn);

        let user = repo.create(&create_request("cinephile", Role::User)).await.unwrap();
        assert_eq!(user.username, "cinephile");
        assert_eq!(user.email, "cinephile@example.com");
        assert_eq!(user.role, Role::User);
        assert!(user.last_login.is_none());

        let profiles: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM profiles WHERE user_id = ?")
            .bind(user.id)
            .fetch_one(&mut *conn)
            .await
            .unwrap();
        assert_eq!(profiles, 1);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_duplicate_email_is_unique_violation(pool: SqlitePool) {
        let mut conn = pool.acquire().await.unwrap();
        let mut repo = Users::new(&mut conn);

        repo.create(&create_request("first", Role::User)).await.unwrap();
        let mut duplicate = create_request("second", Role::User);
        duplicate.email = "first@example.com".to_string();

        let err = repo.create(&duplicate).await.unwrap_err();
        match err {
            DbError::UniqueViolation { table, columns, .. } => {
                assert_eq!(table.as_deref(), Some("users"));
                assert_eq!(columns, vec!["email".to_string()]);
            }
            other => panic!("expected unique violation, got {other:?}"),
        }
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_login_by_email_or_username(pool: SqlitePool) {
        let mut conn = pool.acquire().await.unwrap();
        let mut repo = Users::new(&mut conn);

        let created = repo.create(&create_request("critic", Role::User)).await.unwrap();

        let by_username = repo.get_user_by_login("critic").await.unwrap().unwrap();
        let by_email = repo.get_user_by_login("critic@example.com").await.unwrap().unwrap();
        assert_eq!(by_username.id, created.id);
        assert_eq!(by_email.id, created.id);
        assert!(repo.get_user_by_login("nobody").await.unwrap().is_none());
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_update_role_and_display_name(pool: SqlitePool) {
        let mut conn = pool.acquire().await.unwrap();
        let mut repo = Users::new(&mut conn);

        let user = repo.create(&create_request("promoted", Role::User)).await.unwrap();
        let updated = repo
            .update(
                user.id,
                &UserUpdateDBRequest {
                    display_name: Some("Promoted".to_string()),
                    role: Some(Role::Staff),
                    password_hash: None,
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.role, Role::Staff);
        assert_eq!(updated.display_name.as_deref(), Some("Promoted"));

        // Omitted fields are left alone
        let unchanged = repo.update(user.id, &UserUpdateDBRequest::default()).await.unwrap();
        assert_eq!(unchanged.role, Role::Staff);
        assert_eq!(unchanged.display_name.as_deref(), Some("Promoted"));
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_update_missing_user(pool: SqlitePool) {
        let mut conn = pool.acquire().await.unwrap();
        let mut repo = Users::new(&mut conn);
        let err = repo.update(Uuid::new_v4(), &UserUpdateDBRequest::default()).await.unwrap_err();
        assert!(matches!(err, DbError::NotFound));
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_list_with_search_and_role(pool: SqlitePool) {
        let mut conn = pool.acquire().await.unwrap();
        let mut repo = Users::new(&mut conn);

        repo.create(&create_request("alice", Role::User)).await.unwrap();
        repo.create(&create_request("alfred", Role::Staff)).await.unwrap();
        repo.create(&create_request("bob", Role::User)).await.unwrap();

        let all = repo.list(&UserFilter::new(0, 10)).await.unwrap();
        assert_eq!(all.len(), 3);

        let al = UserFilter::new(0, 10).with_search("AL".to_string());
        assert_eq!(repo.list(&al).await.unwrap().len(), 2);
        assert_eq!(repo.count(&al).await.unwrap(), 2);

        let staff = UserFilter::new(0, 10).with_role(Role::Staff);
        let found = repo.list(&staff).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].username, "alfred");
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_get_bulk_and_delete(pool: SqlitePool) {
        let mut conn = pool.acquire().await.unwrap();
        let mut repo = Users::new(&mut conn);

        let a = repo.create(&create_request("a", Role::User)).await.unwrap();
        let b = repo.create(&create_request("b", Role::User)).await.unwrap();

        let bulk = repo.get_bulk(vec![a.id, b.id, Uuid::new_v4()]).await.unwrap();
        assert_eq!(bulk.len(), 2);

        assert!(repo.delete(a.id).await.unwrap());
        assert!(!repo.delete(a.id).await.unwrap());
        assert!(repo.get_by_id(a.id).await.unwrap().is_none());
    }
}
