use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};

use crate::{
    AppState,
    api::{
        handlers::{movies::movie_responses, validated},
        models::{
            genres::{GenreCreate, GenreDetailResponse, GenreResponse, GenreUpdate},
            pagination::{MAX_LIMIT, PaginatedResponse, Pagination},
        },
    },
    auth::permissions::{RequiresPermission, action},
    db::{
        handlers::{Genres, Movies, Repository, genres::GenreFilter, movies::MovieFilter},
        models::genres::{GenreCreateDBRequest, GenreUpdateDBRequest},
    },
    errors::{Error, Result},
    types::GenreId,
};

fn genre_not_found(id: GenreId) -> Error {
    Error::NotFound {
        resource: "Genre".to_string(),
        id: id.to_string(),
    }
}

/// List genres
#[utoipa::path(
    get,
    path = "/genres",
    tag = "genres",
    summary = "List genres",
    description = "Ordered by name. Returns up to 100 genres unless `limit` says otherwise.",
    params(Pagination),
    responses(
        (status = 200, description = "Paginated list of genres", body = PaginatedResponse<GenreResponse>),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn list_genres(State(state): State<AppState>, Query(pagination): Query<Pagination>) -> Result<Json<PaginatedResponse<GenreResponse>>> {
    let skip = pagination.skip();
    let limit = pagination.limit_or(MAX_LIMIT);

    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = Genres::new(&mut conn);
    let genres = repo.list(&GenreFilter::new(skip, limit)).await?;
    let total_count = repo.count().await?;

    Ok(Json(PaginatedResponse::new(
        genres.into_iter().map(GenreResponse::from).collect(),
        total_count,
        skip,
        limit,
    )))
}

/// Get a genre
#[utoipa::path(
    get,
    path = "/genres/{genre_id}",
    tag = "genres",
    summary = "Get a genre",
    description = "The genre and its movies, newest release year first.",
    params(
        ("genre_id" = uuid::Uuid, Path, description = "Genre ID"),
    ),
    responses(
        (status = 200, description = "Genre detail", body = GenreDetailResponse),
        (status = 404, description = "Genre not found"),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn get_genre(State(state): State<AppState>, Path(genre_id): Path<GenreId>) -> Result<Json<GenreDetailResponse>> {
    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let genre = Genres::new(&mut conn)
        .get_by_id(genre_id)
        .await?
        .ok_or_else(|| genre_not_found(genre_id))?;

    let filter = MovieFilter {
        genre_id: Some(genre_id),
        ..MovieFilter::new(0, MAX_LIMIT)
    };
    let movies = Movies::new(&mut conn).list(&filter).await?;
    let movies = movie_responses(&mut conn, movies).await?;

    Ok(Json(GenreDetailResponse {
        genre: GenreResponse::from(genre),
        movies,
    }))
}

/// Create a genre
#[utoipa::path(
    post,
    path = "/genres",
    tag = "genres",
    summary = "Create a genre",
    request_body = GenreCreate,
    responses(
        (status = 201, description = "Genre created", body = GenreResponse),
        (status = 400, description = "Invalid genre"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 409, description = "A genre with this name already exists"),
    ),
    security(
        ("CookieAuth" = []),
        ("X-Moodie-User" = [])
    )
)]
#[tracing::instrument(skip_all)]
pub async fn create_genre(
    State(state): State<AppState>,
    _: RequiresPermission<action::ManageMovies>,
    Json(create): Json<GenreCreate>,
) -> Result<(StatusCode, Json<GenreResponse>)> {
    let create = validated(create)?;

    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let genre = Genres::new(&mut conn)
        .create(&GenreCreateDBRequest {
            name: create.name.trim().to_string(),
            description: create.description,
            poster_url: create.poster_url,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(GenreResponse::from(genre))))
}

/// Update a genre
#[utoipa::path(
    patch,
    path = "/genres/{genre_id}",
    tag = "genres",
    summary = "Update a genre",
    request_body = GenreUpdate,
    params(
        ("genre_id" = uuid::Uuid, Path, description = "Genre ID"),
    ),
    responses(
        (status = 200, description = "Genre updated", body = GenreResponse),
        (status = 400, description = "Invalid genre"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Genre not found"),
        (status = 409, description = "A genre with this name already exists"),
    ),
    security(
        ("CookieAuth" = []),
        ("X-Moodie-User" = [])
    )
)]
#[tracing::instrument(skip_all)]
pub async fn update_genre(
    State(state): State<AppState>,
    Path(genre_id): Path<GenreId>,
    _: RequiresPermission<action::ManageMovies>,
    Json(update): Json<GenreUpdate>,
) -> Result<Json<GenreResponse>> {
    let update = validated(update)?;

    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let genre = Genres::new(&mut conn)
        .update(
            genre_id,
            &GenreUpdateDBRequest {
                name: update.name.map(|n| n.trim().to_string()),
                description: update.description,
                poster_url: update.poster_url,
            },
        )
        .await?;

    Ok(Json(GenreResponse::from(genre)))
}

/// Delete a genre
#[utoipa::path(
    delete,
    path = "/genres/{genre_id}",
    tag = "genres",
    summary = "Delete a genre",
    params(
        ("genre_id" = uuid::Uuid, Path, description = "Genre ID"),
    ),
    responses(
        (status = 204, description = "Genre deleted"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Genre not found"),
    ),
    security(
        ("CookieAuth" = []),
        ("X-Moodie-User" = [])
    )
)]
#[tracing::instrument(skip_all)]
pub async fn delete_genre(
    State(state): State<AppState>,
    Path(genre_id): Path<GenreId>,
    _: RequiresPermission<action::ManageMovies>,
) -> Result<StatusCode> {
    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    if !Genres::new(&mut conn).delete(genre_id).await? {
        return Err(genre_not_found(genre_id));
    }
    Ok(StatusCode::NO_CONTENT)
}
