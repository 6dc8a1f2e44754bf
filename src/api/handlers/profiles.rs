use axum::{
    Json,
    extract::{Path, State},
};
use sqlx::SqliteConnection;

use crate::{
    AppState,
    api::{
        handlers::{users::resolve_user_id, validated},
        models::{
            genres::GenreSummary,
            profiles::{ProfileResponse, ProfileUpdate},
            users::CurrentUser,
        },
    },
    auth::permissions::{Identity, authorize},
    db::{
        handlers::{Genres, Profiles, Repository, Users},
        models::{profiles::ProfileUpdateDBRequest, users::UserDBResponse},
    },
    errors::{Error, Result},
    sanitize::sanitize_input,
    types::{Action, UserId, UserIdOrCurrent},
};

async fn load_profile(conn: &mut SqliteConnection, user: UserDBResponse) -> Result<ProfileResponse> {
    let profile = Profiles::new(&mut *conn).get(user.id).await?.ok_or_else(|| Error::NotFound {
        resource: "Profile".to_string(),
        id: user.id.to_string(),
    })?;

    let genres = Genres::new(&mut *conn).get_bulk(profile.favorite_genre_ids.clone()).await?;
    let favorite_genres = profile
        .favorite_genre_ids
        .iter()
        .filter_map(|id| genres.get(id))
        .map(GenreSummary::from)
        .collect();

    Ok(ProfileResponse::new(profile, user.username, user.display_name, favorite_genres))
}

async fn get_user_or_404(conn: &mut SqliteConnection, user_id: UserId) -> Result<UserDBResponse> {
    Users::new(conn).get_by_id(user_id).await?.ok_or_else(|| Error::NotFound {
        resource: "User".to_string(),
        id: user_id.to_string(),
    })
}

/// Get a user's public profile
#[utoipa::path(
    get,
    path = "/users/{user_id}/profile",
    tag = "profiles",
    summary = "Get a profile",
    params(
        ("user_id" = uuid::Uuid, Path, description = "User ID"),
    ),
    responses(
        (status = 200, description = "Public profile", body = ProfileResponse),
        (status = 404, description = "User not found"),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn get_profile(State(state): State<AppState>, Path(user_id): Path<UserId>) -> Result<Json<ProfileResponse>> {
    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let user = get_user_or_404(&mut conn, user_id).await?;
    Ok(Json(load_profile(&mut conn, user).await?))
}

/// Edit a profile
#[utoipa::path(
    patch,
    path = "/users/{user_id}/profile",
    tag = "profiles",
    summary = "Edit a profile",
    description = "Edit your own profile (use `current`). Editing someone else's profile needs the manage-users action. `favorite_genre_ids` replaces the whole set.",
    request_body = ProfileUpdate,
    params(
        ("user_id" = String, Path, description = "User ID (UUID) or 'current'"),
    ),
    responses(
        (status = 200, description = "Profile updated", body = ProfileResponse),
        (status = 400, description = "Invalid profile data or unknown genre"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
    ),
    security(
        ("CookieAuth" = []),
        ("X-Moodie-User" = [])
    )
)]
#[tracing::instrument(skip_all)]
pub async fn update_profile(
    State(state): State<AppState>,
    Path(user_id): Path<UserIdOrCurrent>,
    current_user: CurrentUser,
    Json(update): Json<ProfileUpdate>,
) -> Result<Json<ProfileResponse>> {
    let target_id = resolve_user_id(user_id, &current_user);
    if target_id != current_user.id {
        authorize(&Identity::from(&current_user), Action::ManageUsers, None, "profiles")?;
    }
    let update = validated(update)?;

    let mut tx = state.db.begin().await.map_err(|e| Error::Database(e.into()))?;
    let user = get_user_or_404(&mut tx, target_id).await?;

    let request = ProfileUpdateDBRequest {
        bio: update.bio.as_deref().map(sanitize_input),
        avatar_url: update.avatar_url,
        birth_date: update.birth_date,
        location: update.location.as_deref().map(sanitize_input),
        favorite_genre_ids: update.favorite_genre_ids,
    };
    // Unknown genre ids fail the foreign key and roll the whole update back
    Profiles::new(&mut tx).update(target_id, &request).await?;

    let response = load_profile(&mut tx, user).await?;
    tx.commit().await.map_err(|e| Error::Database(e.into()))?;

    Ok(Json(response))
}

#[cfg(test)]
mod tests {
    use crate::api::models::profiles::ProfileResponse;
    use crate::test_utils::{auth_header, create_test_app, create_test_config, create_test_genre, create_test_user};
    use crate::types::Role;
    use axum::http::StatusCode;
    use serde_json::json;
    use sqlx::SqlitePool;
    use uuid::Uuid;

    #[sqlx::test]
    #[test_log::test]
    async fn test_edit_own_profile(pool: SqlitePool) {
        let (server, _) = create_test_app(pool.clone(), create_test_config()).await;
        let user = create_test_user(&pool, Role::User).await;
        let noir = create_test_genre(&pool, "Noir").await;
        let western = create_test_genre(&pool, "Western").await;

        let (name, value) = auth_header(&user);
        let response = server
            .patch("/users/current/profile")
            .add_header(name, value)
            .json(&json!({
                "bio": "<script>x</script>Mostly <b>noir</b>",
                "location": "Lyon",
                "favorite_genre_ids": [noir.id, western.id],
            }))
            .await;
        response.assert_status_ok();
        let profile: ProfileResponse = response.json();
        assert_eq!(profile.bio, "xMostly noir");
        assert_eq!(profile.location, "Lyon");
        assert_eq!(profile.favorite_genres.len(), 2);

        // Public view, no credentials needed
        let profile: ProfileResponse = server.get(&format!("/users/{}/profile", user.id)).await.json();
        assert_eq!(profile.user_id, user.id);
        assert_eq!(profile.username, user.username);
        assert_eq!(profile.favorite_genres[0].name, "Noir");
    }

    #[sqlx::test]
    async fn test_clear_profile_fields(pool: SqlitePool) {
        let (server, _) = create_test_app(pool.clone(), create_test_config()).await;
        let user = create_test_user(&pool, Role::User).await;

        let (name, value) = auth_header(&user);
        let profile: ProfileResponse = server
            .patch("/users/current/profile")
            .add_header(name, value)
            .json(&json!({
                "bio": "Cinephile",
                "avatar_url": "https://example.com/avatar.png",
                "birth_date": "1985-04-12",
            }))
            .await
            .json();
        assert_eq!(profile.avatar_url.as_deref(), Some("https://example.com/avatar.png"));
        assert!(profile.birth_date.is_some());

        // An unrelated edit keeps them
        let (name, value) = auth_header(&user);
        let profile: ProfileResponse = server
            .patch("/users/current/profile")
            .add_header(name, value)
            .json(&json!({ "location": "Porto" }))
            .await
            .json();
        assert!(profile.avatar_url.is_some());
        assert!(profile.birth_date.is_some());

        // Explicit null clears nullable fields, empty text clears the others
        let (name, value) = auth_header(&user);
        let response = server
            .patch("/users/current/profile")
            .add_header(name, value)
            .json(&json!({ "bio": "", "avatar_url": null, "birth_date": null }))
            .await;
        response.assert_status_ok();
        let profile: ProfileResponse = response.json();
        assert_eq!(profile.bio, "");
        assert_eq!(profile.avatar_url, None);
        assert_eq!(profile.birth_date, None);
        assert_eq!(profile.location, "Porto");
    }

    #[sqlx::test]
    async fn test_favorite_genres_replaced(pool: SqlitePool) {
        let (server, _) = create_test_app(pool.clone(), create_test_config()).await;
        let user = create_test_user(&pool, Role::User).await;
        let noir = create_test_genre(&pool, "Noir").await;
        let western = create_test_genre(&pool, "Western").await;

        for ids in [vec![noir.id, western.id], vec![western.id]] {
            let (name, value) = auth_header(&user);
            server
                .patch("/users/current/profile")
                .add_header(name, value)
                .json(&json!({ "favorite_genre_ids": ids }))
                .await
                .assert_status_ok();
        }

        let profile: ProfileResponse = server.get(&format!("/users/{}/profile", user.id)).await.json();
        assert_eq!(profile.favorite_genres.len(), 1);
        assert_eq!(profile.favorite_genres[0].id, western.id);

        // Unknown genre leaves the set untouched
        let (name, value) = auth_header(&user);
        server
            .patch("/users/current/profile")
            .add_header(name, value)
            .json(&json!({ "favorite_genre_ids": [Uuid::new_v4()] }))
            .await
            .assert_status(StatusCode::BAD_REQUEST);
        let profile: ProfileResponse = server.get(&format!("/users/{}/profile", user.id)).await.json();
        assert_eq!(profile.favorite_genres.len(), 1);
    }

    #[sqlx::test]
    async fn test_cannot_edit_someone_elses_profile(pool: SqlitePool) {
        let (server, _) = create_test_app(pool.clone(), create_test_config()).await;
        let alice = create_test_user(&pool, Role::User).await;
        let bob = create_test_user(&pool, Role::User).await;

        let (name, value) = auth_header(&alice);
        server
            .patch(&format!("/users/{}/profile", bob.id))
            .add_header(name, value)
            .json(&json!({ "bio": "hijacked" }))
            .await
            .assert_status_forbidden();

        server
            .patch("/users/current/profile")
            .json(&json!({ "bio": "anonymous" }))
            .await
            .assert_status(StatusCode::UNAUTHORIZED);
    }

    #[sqlx::test]
    async fn test_profile_validation(pool: SqlitePool) {
        let (server, _) = create_test_app(pool.clone(), create_test_config()).await;
        let user = create_test_user(&pool, Role::User).await;

        let (name, value) = auth_header(&user);
        server
            .patch("/users/current/profile")
            .add_header(name, value)
            .json(&json!({ "bio": "x".repeat(501) }))
            .await
            .assert_status(StatusCode::BAD_REQUEST);

        let (name, value) = auth_header(&user);
        server
            .patch("/users/current/profile")
            .add_header(name, value)
            .json(&json!({ "avatar_url": "not a url" }))
            .await
            .assert_status(StatusCode::BAD_REQUEST);

        server
            .get(&format!("/users/{}/profile", Uuid::new_v4()))
            .await
            .assert_status_not_found();
    }
}
