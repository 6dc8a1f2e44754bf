use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use sqlx::SqliteConnection;

use crate::{
    AppState,
    api::{
        handlers::{
            movies::{get_movie_or_404, movie_response, movie_responses},
            users::resolve_user_id,
        },
        models::{
            pagination::{PaginatedResponse, Pagination},
            users::CurrentUser,
            watchlist::{WatchlistAddResponse, WatchlistEntryResponse},
        },
    },
    auth::{
        ownership::OwnedResource,
        permissions::{Identity, authorize},
    },
    db::{
        handlers::{Movies, Repository, Watchlist, watchlist::WatchlistFilter},
        models::watchlist::{WatchlistEntryCreateDBRequest, WatchlistEntryDBResponse},
    },
    errors::{Error, Result},
    types::{Action, ContentKind, MovieId, UserIdOrCurrent, WatchlistEntryId},
};

async fn entry_responses(conn: &mut SqliteConnection, entries: Vec<WatchlistEntryDBResponse>) -> Result<Vec<WatchlistEntryResponse>> {
    let movie_ids = entries.iter().map(|e| e.movie_id).collect();
    let mut movies = Movies::new(&mut *conn).get_bulk(movie_ids).await?;

    let stored: Vec<_> = entries.iter().filter_map(|e| movies.remove(&e.movie_id)).collect();
    let hydrated = movie_responses(conn, stored).await?;
    let mut by_id: std::collections::HashMap<MovieId, _> = hydrated.into_iter().map(|m| (m.id, m)).collect();

    Ok(entries
        .into_iter()
        .filter_map(|entry| {
            // Entries never outlive their movie; a miss means it was deleted mid-request
            let movie = by_id.remove(&entry.movie_id)?;
            Some(WatchlistEntryResponse {
                id: entry.id,
                movie,
                added_at: entry.added_at,
            })
        })
        .collect())
}

fn entry_not_found(id: impl ToString) -> Error {
    Error::NotFound {
        resource: "Watchlist entry".to_string(),
        id: id.to_string(),
    }
}

/// Get a watchlist
#[utoipa::path(
    get,
    path = "/users/{user_id}/watchlist",
    tag = "watchlist",
    summary = "Get a watchlist",
    description = "Your own watchlist (use `current`), newest first. Anyone else's needs the manage-users action.",
    params(
        ("user_id" = String, Path, description = "User ID (UUID) or 'current'"),
        Pagination,
    ),
    responses(
        (status = 200, description = "Paginated watchlist", body = PaginatedResponse<WatchlistEntryResponse>),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
    ),
    security(
        ("CookieAuth" = []),
        ("X-Moodie-User" = [])
    )
)]
#[tracing::instrument(skip_all)]
pub async fn get_watchlist(
    State(state): State<AppState>,
    Path(user_id): Path<UserIdOrCurrent>,
    Query(pagination): Query<Pagination>,
    current_user: CurrentUser,
) -> Result<Json<PaginatedResponse<WatchlistEntryResponse>>> {
    let owner_id = resolve_user_id(user_id, &current_user);
    if owner_id != current_user.id {
        authorize(&Identity::from(&current_user), Action::ManageUsers, None, "watchlists")?;
    }

    let filter = WatchlistFilter {
        user_id: owner_id,
        skip: pagination.skip(),
        limit: pagination.limit(),
    };

    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = Watchlist::new(&mut conn);
    let entries = repo.list(&filter).await?;
    let total_count = repo.count(owner_id).await?;

    let data = entry_responses(&mut conn, entries).await?;
    Ok(Json(PaginatedResponse::new(data, total_count, filter.skip, filter.limit)))
}

/// Add a movie to your watchlist
#[utoipa::path(
    post,
    path = "/movies/{movie_id}/watchlist",
    tag = "watchlist",
    summary = "Add to watchlist",
    description = "Adding a movie that is already on the list returns the existing entry with `created: false`.",
    params(
        ("movie_id" = uuid::Uuid, Path, description = "Movie ID"),
    ),
    responses(
        (status = 201, description = "Added", body = WatchlistAddResponse),
        (status = 200, description = "Already on the watchlist", body = WatchlistAddResponse),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Movie not found"),
    ),
    security(
        ("CookieAuth" = []),
        ("X-Moodie-User" = [])
    )
)]
#[tracing::instrument(skip_all)]
pub async fn add_to_watchlist(
    State(state): State<AppState>,
    Path(movie_id): Path<MovieId>,
    identity: Identity,
) -> Result<(StatusCode, Json<WatchlistAddResponse>)> {
    authorize(&identity, Action::Create(ContentKind::WatchlistEntry), None, "watchlist")?;
    let user_id = identity.id.ok_or(Error::Unauthenticated { message: None })?;

    let mut tx = state.db.begin().await.map_err(|e| Error::Database(e.into()))?;
    let movie = get_movie_or_404(&mut tx, movie_id).await?;
    let (entry, created) = Watchlist::new(&mut tx).add(&WatchlistEntryCreateDBRequest { user_id, movie_id }).await?;
    let movie = movie_response(&mut tx, movie).await?;
    tx.commit().await.map_err(|e| Error::Database(e.into()))?;

    let status = if created { StatusCode::CREATED } else { StatusCode::OK };
    Ok((
        status,
        Json(WatchlistAddResponse {
            entry: WatchlistEntryResponse {
                id: entry.id,
                movie,
                added_at: entry.added_at,
            },
            created,
        }),
    ))
}

/// Remove a movie from your watchlist
#[utoipa::path(
    delete,
    path = "/movies/{movie_id}/watchlist",
    tag = "watchlist",
    summary = "Remove from watchlist",
    params(
        ("movie_id" = uuid::Uuid, Path, description = "Movie ID"),
    ),
    responses(
        (status = 204, description = "Removed"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Movie is not on your watchlist"),
    ),
    security(
        ("CookieAuth" = []),
        ("X-Moodie-User" = [])
    )
)]
#[tracing::instrument(skip_all)]
pub async fn remove_movie_from_watchlist(
    State(state): State<AppState>,
    Path(movie_id): Path<MovieId>,
    identity: Identity,
) -> Result<StatusCode> {
    let Some(user_id) = identity.id else {
        // Anonymous callers have no list; let the evaluator produce the denial
        authorize(&identity, Action::Delete, None, "watchlist entry")?;
        return Err(Error::Unauthenticated { message: None });
    };

    let mut tx = state.db.begin().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = Watchlist::new(&mut tx);
    let entry = repo
        .get_for_user_and_movie(user_id, movie_id)
        .await?
        .ok_or_else(|| entry_not_found(movie_id))?;
    authorize(&identity, Action::Delete, Some(&entry.content_item()), "watchlist entry")?;

    repo.delete(entry.id).await?;
    tx.commit().await.map_err(|e| Error::Database(e.into()))?;

    Ok(StatusCode::NO_CONTENT)
}

/// Delete a watchlist entry
#[utoipa::path(
    delete,
    path = "/watchlist/{entry_id}",
    tag = "watchlist",
    summary = "Delete a watchlist entry",
    description = "Owners may delete their own entries; staff and superusers may delete any.",
    params(
        ("entry_id" = uuid::Uuid, Path, description = "Watchlist entry ID"),
    ),
    responses(
        (status = 204, description = "Deleted"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Entry not found"),
    ),
    security(
        ("CookieAuth" = []),
        ("X-Moodie-User" = [])
    )
)]
#[tracing::instrument(skip_all)]
pub async fn delete_watchlist_entry(
    State(state): State<AppState>,
    Path(entry_id): Path<WatchlistEntryId>,
    identity: Identity,
) -> Result<StatusCode> {
    let mut tx = state.db.begin().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = Watchlist::new(&mut tx);
    let entry = repo.get_by_id(entry_id).await?.ok_or_else(|| entry_not_found(entry_id))?;
    authorize(&identity, Action::Delete, Some(&entry.content_item()), "watchlist entry")?;

    repo.delete(entry_id).await?;
    tx.commit().await.map_err(|e| Error::Database(e.into()))?;

    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use crate::api::models::{
        pagination::PaginatedResponse,
        watchlist::{WatchlistAddResponse, WatchlistEntryResponse},
    };
    use crate::test_utils::{auth_header, create_test_app, create_test_config, create_test_movie, create_test_user};
    use crate::types::Role;
    use axum::http::StatusCode;
    use sqlx::SqlitePool;

    #[sqlx::test]
    #[test_log::test]
    async fn test_add_is_idempotent(pool: SqlitePool) {
        let (server, _) = create_test_app(pool.clone(), create_test_config()).await;
        let user = create_test_user(&pool, Role::User).await;
        let movie = create_test_movie(&pool, "Paprika", 2006).await;

        let (name, value) = auth_header(&user);
        let response = server.post(&format!("/movies/{}/watchlist", movie.id)).add_header(name, value).await;
        response.assert_status(StatusCode::CREATED);
        let first: WatchlistAddResponse = response.json();
        assert!(first.created);
        assert_eq!(first.entry.movie.title, "Paprika");

        let (name, value) = auth_header(&user);
        let response = server.post(&format!("/movies/{}/watchlist", movie.id)).add_header(name, value).await;
        response.assert_status_ok();
        let second: WatchlistAddResponse = response.json();
        assert!(!second.created);
        assert_eq!(second.entry.id, first.entry.id);

        let (name, value) = auth_header(&user);
        let page: PaginatedResponse<WatchlistEntryResponse> = server.get("/users/current/watchlist").add_header(name, value).await.json();
        assert_eq!(page.total_count, 1);
        assert_eq!(page.data[0].movie.id, movie.id);
    }

    #[sqlx::test]
    async fn test_anonymous_is_denied(pool: SqlitePool) {
        let (server, _) = create_test_app(pool.clone(), create_test_config()).await;
        let movie = create_test_movie(&pool, "Tokyo Godfathers", 2003).await;

        server
            .post(&format!("/movies/{}/watchlist", movie.id))
            .await
            .assert_status_forbidden();
        server
            .delete(&format!("/movies/{}/watchlist", movie.id))
            .await
            .assert_status_forbidden();
        server.get("/users/current/watchlist").await.assert_status(StatusCode::UNAUTHORIZED);
    }

    #[sqlx::test]
    async fn test_lists_are_private(pool: SqlitePool) {
        let (server, _) = create_test_app(pool.clone(), create_test_config()).await;
        let alice = create_test_user(&pool, Role::User).await;
        let bob = create_test_user(&pool, Role::User).await;
        let movie = create_test_movie(&pool, "Millennium Actress", 2001).await;

        let (name, value) = auth_header(&alice);
        let added: WatchlistAddResponse = server
            .post(&format!("/movies/{}/watchlist", movie.id))
            .add_header(name, value)
            .await
            .json();

        let (name, value) = auth_header(&bob);
        let page: PaginatedResponse<WatchlistEntryResponse> = server.get("/users/current/watchlist").add_header(name, value).await.json();
        assert_eq!(page.total_count, 0);

        let (name, value) = auth_header(&bob);
        server
            .get(&format!("/users/{}/watchlist", alice.id))
            .add_header(name, value)
            .await
            .assert_status_forbidden();

        let (name, value) = auth_header(&bob);
        server
            .delete(&format!("/watchlist/{}", added.entry.id))
            .add_header(name, value)
            .await
            .assert_status_forbidden();

        // Bob has no entry for the movie himself
        let (name, value) = auth_header(&bob);
        server
            .delete(&format!("/movies/{}/watchlist", movie.id))
            .add_header(name, value)
            .await
            .assert_status_not_found();

        let (name, value) = auth_header(&alice);
        server
            .delete(&format!("/movies/{}/watchlist", movie.id))
            .add_header(name, value)
            .await
            .assert_status(StatusCode::NO_CONTENT);
    }

    #[sqlx::test]
    async fn test_staff_may_remove_any_entry(pool: SqlitePool) {
        let (server, _) = create_test_app(pool.clone(), create_test_config()).await;
        let user = create_test_user(&pool, Role::User).await;
        let staff = create_test_user(&pool, Role::Staff).await;
        let movie = create_test_movie(&pool, "Perfect Blue", 1997).await;

        let (name, value) = auth_header(&user);
        let added: WatchlistAddResponse = server
            .post(&format!("/movies/{}/watchlist", movie.id))
            .add_header(name, value)
            .await
            .json();

        let (name, value) = auth_header(&staff);
        server
            .delete(&format!("/watchlist/{}", added.entry.id))
            .add_header(name, value)
            .await
            .assert_status(StatusCode::NO_CONTENT);

        let (name, value) = auth_header(&staff);
        server
            .delete(&format!("/watchlist/{}", added.entry.id))
            .add_header(name, value)
            .await
            .assert_status_not_found();
    }
}
