//! Directors and actors share one shape and one set of operations; each route below is a thin
//! wrapper choosing the table.

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use uuid::Uuid;

use crate::{
    AppState,
    api::{
        handlers::{movies::movie_responses, validated},
        models::{
            pagination::{MAX_LIMIT, PaginatedResponse},
            people::{ListPeopleQuery, PersonCreate, PersonDetailResponse, PersonResponse, PersonUpdate},
        },
    },
    auth::permissions::{RequiresPermission, action},
    db::{
        handlers::{Movies, People, Repository, movies::MovieFilter, people::PersonFilter},
        models::people::{PersonCreateDBRequest, PersonKind, PersonUpdateDBRequest},
    },
    errors::{Error, Result},
    sanitize::sanitize_optional,
    types::{ActorId, DirectorId},
};

fn person_not_found(kind: PersonKind, id: Uuid) -> Error {
    Error::NotFound {
        resource: kind.label().to_string(),
        id: id.to_string(),
    }
}

async fn list(state: &AppState, kind: PersonKind, query: ListPeopleQuery) -> Result<PaginatedResponse<PersonResponse>> {
    let filter = PersonFilter {
        search: sanitize_optional(query.search.as_deref()),
        ..PersonFilter::new(query.pagination.skip(), query.pagination.limit_or(MAX_LIMIT))
    };

    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = People::new(&mut conn, kind);
    let people = repo.list(&filter).await?;
    let total_count = repo.count(&filter).await?;

    Ok(PaginatedResponse::new(
        people.into_iter().map(PersonResponse::from).collect(),
        total_count,
        filter.skip,
        filter.limit,
    ))
}

async fn get(state: &AppState, kind: PersonKind, id: Uuid) -> Result<PersonDetailResponse> {
    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let person = People::new(&mut conn, kind)
        .get_by_id(id)
        .await?
        .ok_or_else(|| person_not_found(kind, id))?;

    let mut filter = MovieFilter::new(0, MAX_LIMIT);
    match kind {
        PersonKind::Director => filter.director_id = Some(id),
        PersonKind::Actor => filter.actor_id = Some(id),
    }
    let movies = Movies::new(&mut conn).list(&filter).await?;
    let movies = movie_responses(&mut conn, movies).await?;

    Ok(PersonDetailResponse {
        person: PersonResponse::from(person),
        movies,
    })
}

async fn create(state: &AppState, kind: PersonKind, create: PersonCreate) -> Result<PersonResponse> {
    let create = validated(create)?;
    let name = create.name.trim().to_string();
    if name.is_empty() {
        return Err(Error::BadRequest {
            message: "Name cannot be empty".to_string(),
        });
    }

    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let person = People::new(&mut conn, kind)
        .create(&PersonCreateDBRequest {
            name,
            bio: create.bio,
            birth_date: create.birth_date,
            photo_url: create.photo_url,
        })
        .await?;
    Ok(PersonResponse::from(person))
}

async fn update(state: &AppState, kind: PersonKind, id: Uuid, update: PersonUpdate) -> Result<PersonResponse> {
    let update = validated(update)?;

    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let person = People::new(&mut conn, kind)
        .update(
            id,
            &PersonUpdateDBRequest {
                name: update.name.map(|n| n.trim().to_string()).filter(|n| !n.is_empty()),
                bio: update.bio,
                birth_date: update.birth_date,
                photo_url: update.photo_url,
            },
        )
        .await?;
    Ok(PersonResponse::from(person))
}

async fn delete(state: &AppState, kind: PersonKind, id: Uuid) -> Result<StatusCode> {
    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    if !People::new(&mut conn, kind).delete(id).await? {
        return Err(person_not_found(kind, id));
    }
    Ok(StatusCode::NO_CONTENT)
}

/// List directors
#[utoipa::path(
    get,
    path = "/directors",
    tag = "people",
    summary = "List directors",
    params(ListPeopleQuery),
    responses(
        (status = 200, description = "Paginated list of directors", body = PaginatedResponse<PersonResponse>),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn list_directors(State(state): State<AppState>, Query(query): Query<ListPeopleQuery>) -> Result<Json<PaginatedResponse<PersonResponse>>> {
    Ok(Json(list(&state, PersonKind::Director, query).await?))
}

/// Get a director
#[utoipa::path(
    get,
    path = "/directors/{director_id}",
    tag = "people",
    summary = "Get a director",
    description = "The director and the movies they directed.",
    params(
        ("director_id" = uuid::Uuid, Path, description = "Director ID"),
    ),
    responses(
        (status = 200, description = "Director detail", body = PersonDetailResponse),
        (status = 404, description = "Director not found"),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn get_director(State(state): State<AppState>, Path(director_id): Path<DirectorId>) -> Result<Json<PersonDetailResponse>> {
    Ok(Json(get(&state, PersonKind::Director, director_id).await?))
}

/// Create a director
#[utoipa::path(
    post,
    path = "/directors",
    tag = "people",
    summary = "Create a director",
    request_body = PersonCreate,
    responses(
        (status = 201, description = "Director created", body = PersonResponse),
        (status = 400, description = "Invalid director"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
    ),
    security(
        ("CookieAuth" = []),
        ("X-Moodie-User" = [])
    )
)]
#[tracing::instrument(skip_all)]
pub async fn create_director(
    State(state): State<AppState>,
    _: RequiresPermission<action::ManageMovies>,
    Json(body): Json<PersonCreate>,
) -> Result<(StatusCode, Json<PersonResponse>)> {
    Ok((StatusCode::CREATED, Json(create(&state, PersonKind::Director, body).await?)))
}

/// Update a director
#[utoipa::path(
    patch,
    path = "/directors/{director_id}",
    tag = "people",
    summary = "Update a director",
    request_body = PersonUpdate,
    params(
        ("director_id" = uuid::Uuid, Path, description = "Director ID"),
    ),
    responses(
        (status = 200, description = "Director updated", body = PersonResponse),
        (status = 400, description = "Invalid director"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Director not found"),
    ),
    security(
        ("CookieAuth" = []),
        ("X-Moodie-User" = [])
    )
)]
#[tracing::instrument(skip_all)]
pub async fn update_director(
    State(state): State<AppState>,
    Path(director_id): Path<DirectorId>,
    _: RequiresPermission<action::ManageMovies>,
    Json(body): Json<PersonUpdate>,
) -> Result<Json<PersonResponse>> {
    Ok(Json(update(&state, PersonKind::Director, director_id, body).await?))
}

/// Delete a director
#[utoipa::path(
    delete,
    path = "/directors/{director_id}",
    tag = "people",
    summary = "Delete a director",
    description = "Movies they directed keep existing without a director.",
    params(
        ("director_id" = uuid::Uuid, Path, description = "Director ID"),
    ),
    responses(
        (status = 204, description = "Director deleted"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Director not found"),
    ),
    security(
        ("CookieAuth" = []),
        ("X-Moodie-User" = [])
    )
)]
#[tracing::instrument(skip_all)]
pub async fn delete_director(
    State(state): State<AppState>,
    Path(director_id): Path<DirectorId>,
    _: RequiresPermission<action::ManageMovies>,
) -> Result<StatusCode> {
    delete(&state, PersonKind::Director, director_id).await
}

/// List actors
#[utoipa::path(
    get,
    path = "/actors",
    tag = "people",
    summary = "List actors",
    params(ListPeopleQuery),
    responses(
        (status = 200, description = "Paginated list of actors", body = PaginatedResponse<PersonResponse>),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn list_actors(State(state): State<AppState>, Query(query): Query<ListPeopleQuery>) -> Result<Json<PaginatedResponse<PersonResponse>>> {
    Ok(Json(list(&state, PersonKind::Actor, query).await?))
}

/// Get an actor
#[utoipa::path(
    get,
    path = "/actors/{actor_id}",
    tag = "people",
    summary = "Get an actor",
    description = "The actor and the movies they appear in.",
    params(
        ("actor_id" = uuid::Uuid, Path, description = "Actor ID"),
    ),
    responses(
        (status = 200, description = "Actor detail", body = PersonDetailResponse),
        (status = 404, description = "Actor not found"),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn get_actor(State(state): State<AppState>, Path(actor_id): Path<ActorId>) -> Result<Json<PersonDetailResponse>> {
    Ok(Json(get(&state, PersonKind::Actor, actor_id).await?))
}

/// Create an actor
#[utoipa::path(
    post,
    path = "/actors",
    tag = "people",
    summary = "Create an actor",
    request_body = PersonCreate,
    responses(
        (status = 201, description = "Actor created", body = PersonResponse),
        (status = 400, description = "Invalid actor"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
    ),
    security(
        ("CookieAuth" = []),
        ("X-Moodie-User" = [])
    )
)]
#[tracing::instrument(skip_all)]
pub async fn create_actor(
    State(state): State<AppState>,
    _: RequiresPermission<action::ManageMovies>,
    Json(body): Json<PersonCreate>,
) -> Result<(StatusCode, Json<PersonResponse>)> {
    Ok((StatusCode::CREATED, Json(create(&state, PersonKind::Actor, body).await?)))
}

/// Update an actor
#[utoipa::path(
    patch,
    path = "/actors/{actor_id}",
    tag = "people",
    summary = "Update an actor",
    request_body = PersonUpdate,
    params(
        ("actor_id" = uuid::Uuid, Path, description = "Actor ID"),
    ),
    responses(
        (status = 200, description = "Actor updated", body = PersonResponse),
        (status = 400, description = "Invalid actor"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Actor not found"),
    ),
    security(
        ("CookieAuth" = []),
        ("X-Moodie-User" = [])
    )
)]
#[tracing::instrument(skip_all)]
pub async fn update_actor(
    State(state): State<AppState>,
    Path(actor_id): Path<ActorId>,
    _: RequiresPermission<action::ManageMovies>,
    Json(body): Json<PersonUpdate>,
) -> Result<Json<PersonResponse>> {
    Ok(Json(update(&state, PersonKind::Actor, actor_id, body).await?))
}

/// Delete an actor
#[utoipa::path(
    delete,
    path = "/actors/{actor_id}",
    tag = "people",
    summary = "Delete an actor",
    params(
        ("actor_id" = uuid::Uuid, Path, description = "Actor ID"),
    ),
    responses(
        (status = 204, description = "Actor deleted"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Actor not found"),
    ),
    security(
        ("CookieAuth" = []),
        ("X-Moodie-User" = [])
    )
)]
#[tracing::instrument(skip_all)]
pub async fn delete_actor(
    State(state): State<AppState>,
    Path(actor_id): Path<ActorId>,
    _: RequiresPermission<action::ManageMovies>,
) -> Result<StatusCode> {
    delete(&state, PersonKind::Actor, actor_id).await
}
