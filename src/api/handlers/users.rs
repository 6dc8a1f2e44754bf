use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};

use crate::{
    AppState,
    api::{
        handlers::validated,
        models::{
            pagination::PaginatedResponse,
            users::{CurrentUser, ListUsersQuery, RoleUpdate, UserResponse, UserUpdate},
        },
    },
    auth::permissions::{Identity, RequiresPermission, action, authorize},
    db::{
        handlers::{Repository, Users, users::UserFilter},
        models::users::UserUpdateDBRequest,
    },
    errors::{Error, Result},
    sanitize::sanitize_optional,
    types::{Action, Role, UserId, UserIdOrCurrent},
};

/// Resolve `current` to the caller's id.
pub(crate) fn resolve_user_id(user_id: UserIdOrCurrent, current_user: &CurrentUser) -> UserId {
    match user_id {
        UserIdOrCurrent::Current(_) => current_user.id,
        UserIdOrCurrent::Id(id) => id,
    }
}

/// Callers may always act on their own account; anyone else's needs the manage-users action.
fn authorize_self_or_manage(current_user: &CurrentUser, target_id: UserId) -> Result<()> {
    if current_user.id != target_id {
        authorize(&Identity::from(current_user), Action::ManageUsers, None, "users")?;
    }
    Ok(())
}

fn user_not_found(id: UserId) -> Error {
    Error::NotFound {
        resource: "User".to_string(),
        id: id.to_string(),
    }
}

/// List users
#[utoipa::path(
    get,
    path = "/users",
    tag = "users",
    summary = "List users",
    description = "List user accounts. Requires the manage-users action (staff and superusers).",
    params(ListUsersQuery),
    responses(
        (status = 200, description = "Paginated list of users", body = PaginatedResponse<UserResponse>),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
    ),
    security(
        ("CookieAuth" = []),
        ("X-Moodie-User" = [])
    )
)]
#[tracing::instrument(skip_all)]
pub async fn list_users(
    State(state): State<AppState>,
    Query(query): Query<ListUsersQuery>,
    _: RequiresPermission<action::ManageUsers>,
) -> Result<Json<PaginatedResponse<UserResponse>>> {
    let skip = query.pagination.skip();
    let limit = query.pagination.limit();

    let mut filter = UserFilter::new(skip, limit);
    if let Some(search) = sanitize_optional(query.search.as_deref()) {
        filter = filter.with_search(search);
    }
    if let Some(role) = query.role {
        filter = filter.with_role(role);
    }

    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = Users::new(&mut conn);
    let users = repo.list(&filter).await?;
    let total_count = repo.count(&filter).await?;

    Ok(Json(PaginatedResponse::new(
        users.into_iter().map(UserResponse::from).collect(),
        total_count,
        skip,
        limit,
    )))
}

/// Get a user
#[utoipa::path(
    get,
    path = "/users/{user_id}",
    tag = "users",
    summary = "Get a user",
    description = "Get a user account. Use `current` for the caller's own account; other accounts need the manage-users action.",
    params(
        ("user_id" = String, Path, description = "User ID (UUID) or 'current'"),
    ),
    responses(
        (status = 200, description = "User details", body = UserResponse),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "User not found"),
    ),
    security(
        ("CookieAuth" = []),
        ("X-Moodie-User" = [])
    )
)]
#[tracing::instrument(skip_all)]
pub async fn get_user(
    State(state): State<AppState>,
    Path(user_id): Path<UserIdOrCurrent>,
    current_user: CurrentUser,
) -> Result<Json<UserResponse>> {
    let target_id = resolve_user_id(user_id, &current_user);
    authorize_self_or_manage(&current_user, target_id)?;

    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let user = Users::new(&mut conn)
        .get_by_id(target_id)
        .await?
        .ok_or_else(|| user_not_found(target_id))?;

    Ok(Json(UserResponse::from(user)))
}

/// Update a user's display name
#[utoipa::path(
    patch,
    path = "/users/{user_id}",
    tag = "users",
    summary = "Update a user",
    request_body = UserUpdate,
    params(
        ("user_id" = String, Path, description = "User ID (UUID) or 'current'"),
    ),
    responses(
        (status = 200, description = "User updated", body = UserResponse),
        (status = 400, description = "Invalid display name"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "User not found"),
    ),
    security(
        ("CookieAuth" = []),
        ("X-Moodie-User" = [])
    )
)]
#[tracing::instrument(skip_all)]
pub async fn update_user(
    State(state): State<AppState>,
    Path(user_id): Path<UserIdOrCurrent>,
    current_user: CurrentUser,
    Json(update): Json<UserUpdate>,
) -> Result<Json<UserResponse>> {
    let target_id = resolve_user_id(user_id, &current_user);
    authorize_self_or_manage(&current_user, target_id)?;
    let update = validated(update)?;

    let display_name = match update.display_name {
        Some(name) => Some(sanitize_optional(Some(&name)).ok_or_else(|| Error::BadRequest {
            message: "Display name cannot be empty".to_string(),
        })?),
        None => None,
    };

    let mut tx = state.db.begin().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = Users::new(&mut tx);
    if repo.get_by_id(target_id).await?.is_none() {
        return Err(user_not_found(target_id));
    }
    let user = repo
        .update(
            target_id,
            &UserUpdateDBRequest {
                display_name,
                ..Default::default()
            },
        )
        .await?;
    tx.commit().await.map_err(|e| Error::Database(e.into()))?;

    Ok(Json(UserResponse::from(user)))
}

/// Change a user's role
#[utoipa::path(
    patch,
    path = "/users/{user_id}/role",
    tag = "users",
    summary = "Change a user's role",
    description = "Superuser-only. A superuser cannot change their own role.",
    request_body = RoleUpdate,
    params(
        ("user_id" = uuid::Uuid, Path, description = "User ID"),
    ),
    responses(
        (status = 200, description = "Role changed", body = UserResponse),
        (status = 400, description = "Invalid role or own account"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "User not found"),
    ),
    security(
        ("CookieAuth" = []),
        ("X-Moodie-User" = [])
    )
)]
#[tracing::instrument(skip_all)]
pub async fn update_user_role(
    State(state): State<AppState>,
    Path(user_id): Path<UserId>,
    current_user: RequiresPermission<action::ManageSettings>,
    Json(update): Json<RoleUpdate>,
) -> Result<Json<UserResponse>> {
    if user_id == current_user.id {
        return Err(Error::BadRequest {
            message: "You cannot change your own role".to_string(),
        });
    }
    if update.role == Role::Anonymous {
        return Err(Error::BadRequest {
            message: "The anonymous role cannot be assigned".to_string(),
        });
    }

    let mut tx = state.db.begin().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = Users::new(&mut tx);
    if repo.get_by_id(user_id).await?.is_none() {
        return Err(user_not_found(user_id));
    }
    let user = repo
        .update(
            user_id,
            &UserUpdateDBRequest {
                role: Some(update.role),
                ..Default::default()
            },
        )
        .await?;
    tx.commit().await.map_err(|e| Error::Database(e.into()))?;

    tracing::info!(user_id = %user.id, role = %user.role, changed_by = %current_user.id, "user role changed");
    Ok(Json(UserResponse::from(user)))
}

/// Delete a user
#[utoipa::path(
    delete,
    path = "/users/{user_id}",
    tag = "users",
    summary = "Delete a user",
    description = "Requires the manage-users action. Deleting a superuser additionally needs the superuser-only settings action. You cannot delete yourself.",
    params(
        ("user_id" = uuid::Uuid, Path, description = "User ID"),
    ),
    responses(
        (status = 204, description = "User deleted"),
        (status = 400, description = "Cannot delete yourself"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "User not found"),
    ),
    security(
        ("CookieAuth" = []),
        ("X-Moodie-User" = [])
    )
)]
#[tracing::instrument(skip_all)]
pub async fn delete_user(
    State(state): State<AppState>,
    Path(user_id): Path<UserId>,
    current_user: RequiresPermission<action::ManageUsers>,
) -> Result<StatusCode> {
    if user_id == current_user.id {
        return Err(Error::BadRequest {
            message: "You cannot delete your own account".to_string(),
        });
    }

    let mut tx = state.db.begin().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = Users::new(&mut tx);
    let target = repo.get_by_id(user_id).await?.ok_or_else(|| user_not_found(user_id))?;
    if target.role == Role::Superuser {
        authorize(&Identity::from(&*current_user), Action::ManageSettings, None, "superusers")?;
    }

    repo.delete(user_id).await?;
    tx.commit().await.map_err(|e| Error::Database(e.into()))?;

    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use crate::api::models::{pagination::PaginatedResponse, users::UserResponse};
    use crate::test_utils::{auth_header, create_test_app, create_test_config, create_test_user};
    use crate::types::Role;
    use axum::http::StatusCode;
    use serde_json::json;
    use sqlx::SqlitePool;

    #[sqlx::test]
    #[test_log::test]
    async fn test_get_current_user(pool: SqlitePool) {
        let (server, _) = create_test_app(pool.clone(), create_test_config()).await;
        let user = create_test_user(&pool, Role::User).await;
        let (name, value) = auth_header(&user);

        let response = server.get("/users/current").add_header(name, value).await;
        response.assert_status_ok();
        let body: UserResponse = response.json();
        assert_eq!(body.id, user.id);
        assert_eq!(body.role, Role::User);
    }

    #[sqlx::test]
    async fn test_anonymous_cannot_see_current_user(pool: SqlitePool) {
        let (server, _) = create_test_app(pool, create_test_config()).await;
        server.get("/users/current").await.assert_status(StatusCode::UNAUTHORIZED);
    }

    #[sqlx::test]
    async fn test_list_users_requires_staff(pool: SqlitePool) {
        let (server, _) = create_test_app(pool.clone(), create_test_config()).await;
        let user = create_test_user(&pool, Role::User).await;
        let staff = create_test_user(&pool, Role::Staff).await;

        let (name, value) = auth_header(&user);
        server.get("/users").add_header(name, value).await.assert_status_forbidden();

        let (name, value) = auth_header(&staff);
        let response = server.get("/users").add_header(name, value).await;
        response.assert_status_ok();
        let page: serde_json::Value = response.json();
        assert_eq!(page["total_count"], 2);

        let (name, value) = auth_header(&staff);
        let response = server.get("/users?role=staff").add_header(name, value).await;
        let page: PaginatedResponse<UserResponse> = response.json();
        assert_eq!(page.data.len(), 1);
        assert_eq!(page.data[0].id, staff.id);
    }

    #[sqlx::test]
    async fn test_user_cannot_read_other_account(pool: SqlitePool) {
        let (server, _) = create_test_app(pool.clone(), create_test_config()).await;
        let alice = create_test_user(&pool, Role::User).await;
        let bob = create_test_user(&pool, Role::User).await;
        let staff = create_test_user(&pool, Role::Staff).await;

        let (name, value) = auth_header(&alice);
        server
            .get(&format!("/users/{}", bob.id))
            .add_header(name, value)
            .await
            .assert_status_forbidden();

        let (name, value) = auth_header(&staff);
        server.get(&format!("/users/{}", bob.id)).add_header(name, value).await.assert_status_ok();
    }

    #[sqlx::test]
    async fn test_update_own_display_name(pool: SqlitePool) {
        let (server, _) = create_test_app(pool.clone(), create_test_config()).await;
        let user = create_test_user(&pool, Role::User).await;
        let (name, value) = auth_header(&user);

        let response = server
            .patch("/users/current")
            .add_header(name, value)
            .json(&json!({ "display_name": "  <i>Cinephile</i> " }))
            .await;
        response.assert_status_ok();
        let body: UserResponse = response.json();
        assert_eq!(body.display_name.as_deref(), Some("Cinephile"));
    }

    #[sqlx::test]
    async fn test_role_change_is_superuser_only(pool: SqlitePool) {
        let (server, _) = create_test_app(pool.clone(), create_test_config()).await;
        let staff = create_test_user(&pool, Role::Staff).await;
        let superuser = create_test_user(&pool, Role::Superuser).await;
        let user = create_test_user(&pool, Role::User).await;

        let (name, value) = auth_header(&staff);
        server
            .patch(&format!("/users/{}/role", user.id))
            .add_header(name, value)
            .json(&json!({ "role": "staff" }))
            .await
            .assert_status_forbidden();

        let (name, value) = auth_header(&superuser);
        let response = server
            .patch(&format!("/users/{}/role", user.id))
            .add_header(name, value)
            .json(&json!({ "role": "staff" }))
            .await;
        response.assert_status_ok();
        assert_eq!(response.json::<UserResponse>().role, Role::Staff);

        // Promotion is visible on the promoted user's next request
        let (name, value) = auth_header(&user);
        server.get("/users").add_header(name, value).await.assert_status_ok();

        let (name, value) = auth_header(&superuser);
        server
            .patch(&format!("/users/{}/role", superuser.id))
            .add_header(name, value)
            .json(&json!({ "role": "user" }))
            .await
            .assert_status(StatusCode::BAD_REQUEST);
    }

    #[sqlx::test]
    async fn test_delete_user(pool: SqlitePool) {
        let (server, _) = create_test_app(pool.clone(), create_test_config()).await;
        let staff = create_test_user(&pool, Role::Staff).await;
        let superuser = create_test_user(&pool, Role::Superuser).await;
        let user = create_test_user(&pool, Role::User).await;

        let (name, value) = auth_header(&staff);
        server
            .delete(&format!("/users/{}", staff.id))
            .add_header(name, value)
            .await
            .assert_status(StatusCode::BAD_REQUEST);

        let (name, value) = auth_header(&staff);
        server
            .delete(&format!("/users/{}", superuser.id))
            .add_header(name, value)
            .await
            .assert_status_forbidden();

        let (name, value) = auth_header(&staff);
        server
            .delete(&format!("/users/{}", user.id))
            .add_header(name, value)
            .await
            .assert_status(StatusCode::NO_CONTENT);

        let (name, value) = auth_header(&staff);
        server
            .get(&format!("/users/{}", user.id))
            .add_header(name, value)
            .await
            .assert_status_not_found();
    }
}
