use std::collections::HashSet;

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use chrono::{Months, TimeDelta, Utc};
use sqlx::SqliteConnection;

use crate::{
    AppState,
    api::{
        handlers::{reviews::review_response, validated},
        models::{
            genres::GenreSummary,
            movies::{CollectionQuery, ListMoviesQuery, MovieCreate, MovieDetailResponse, MovieResponse, MovieUpdate, round_rating},
            pagination::{DEFAULT_LIMIT, MAX_LIMIT, PaginatedResponse},
            people::PersonSummary,
        },
    },
    auth::permissions::{Identity, RequiresPermission, action},
    db::{
        handlers::{Genres, Movies, People, Repository, Reviews, Watchlist},
        models::movies::{MovieCreateDBRequest, MovieDBResponse, MovieUpdateDBRequest},
    },
    errors::{Error, Result},
    sanitize::sanitize_input,
    types::{ActorId, DirectorId, GenreId, MovieId},
};

/// Movies released within this many days count as latest.
const LATEST_WINDOW_DAYS: i64 = 730;
/// Classics are at least this old.
const CLASSIC_AGE_MONTHS: u32 = 20 * 12;
const CLASSIC_MIN_RATING: f64 = 8.0;
const RELATED_LIMIT: i64 = 6;

fn dedup<T: Copy + Eq + std::hash::Hash>(ids: impl IntoIterator<Item = T>) -> Vec<T> {
    let mut seen = HashSet::new();
    ids.into_iter().filter(|id| seen.insert(*id)).collect()
}

/// Attach genre, director and actor summaries to stored movies.
pub(crate) async fn movie_responses(conn: &mut SqliteConnection, movies: Vec<MovieDBResponse>) -> Result<Vec<MovieResponse>> {
    let genre_ids = dedup(movies.iter().flat_map(|m| m.genre_ids.iter().copied()));
    let director_ids = dedup(movies.iter().filter_map(|m| m.director_id));
    let actor_ids = dedup(movies.iter().flat_map(|m| m.actor_ids.iter().copied()));

    let genres = Genres::new(&mut *conn).get_bulk(genre_ids).await?;
    let directors = People::directors(&mut *conn).get_bulk(director_ids).await?;
    let actors = People::actors(&mut *conn).get_bulk(actor_ids).await?;

    Ok(movies
        .into_iter()
        .map(|movie| {
            let movie_genres = movie.genre_ids.iter().filter_map(|id| genres.get(id)).map(GenreSummary::from).collect();
            let director = movie.director_id.and_then(|id| directors.get(&id)).map(PersonSummary::from);
            let movie_actors = movie.actor_ids.iter().filter_map(|id| actors.get(id)).map(PersonSummary::from).collect();
            MovieResponse::new(movie, movie_genres, director, movie_actors)
        })
        .collect())
}

pub(crate) async fn movie_response(conn: &mut SqliteConnection, movie: MovieDBResponse) -> Result<MovieResponse> {
    movie_responses(conn, vec![movie]).await?.pop().ok_or_else(|| Error::Internal {
        operation: "build movie response".to_string(),
    })
}

pub(crate) async fn get_movie_or_404(conn: &mut SqliteConnection, movie_id: MovieId) -> Result<MovieDBResponse> {
    Movies::new(conn).get_by_id(movie_id).await?.ok_or_else(|| Error::NotFound {
        resource: "Movie".to_string(),
        id: movie_id.to_string(),
    })
}

const MAX_GENRE_NAME_CHARS: usize = 100;
const MAX_PERSON_NAME_CHARS: usize = 200;

/// Sanitize a name to be created on save. Blank input is skipped; input that is empty once
/// sanitized, or longer than `max_chars`, is rejected.
fn clean_name(raw: &str, field: &str, max_chars: usize) -> Result<Option<String>> {
    if raw.trim().is_empty() {
        return Ok(None);
    }
    let name = sanitize_input(raw);
    if name.is_empty() {
        return Err(Error::BadRequest {
            message: format!("{field}: name is empty once markup is removed"),
        });
    }
    if name.chars().count() > max_chars {
        return Err(Error::BadRequest {
            message: format!("{field}: names are at most {max_chars} characters"),
        });
    }
    Ok(Some(name))
}

fn clean_names(names: &[String], field: &str, max_chars: usize) -> Result<Vec<String>> {
    let mut cleaned = Vec::with_capacity(names.len());
    for raw in names {
        cleaned.extend(clean_name(raw, field, max_chars)?);
    }
    Ok(cleaned)
}

async fn resolve_genres(conn: &mut SqliteConnection, ids: Vec<GenreId>, new_names: &[String]) -> Result<Vec<GenreId>> {
    let names = clean_names(new_names, "new_genres", MAX_GENRE_NAME_CHARS)?;
    let mut resolved = ids;
    let mut repo = Genres::new(conn);
    for name in names {
        resolved.push(repo.get_or_create(&name).await?.id);
    }
    let resolved = dedup(resolved);
    if resolved.is_empty() {
        return Err(Error::BadRequest {
            message: "A movie needs at least one genre".to_string(),
        });
    }
    Ok(resolved)
}

async fn resolve_actors(conn: &mut SqliteConnection, ids: Vec<ActorId>, new_names: &[String]) -> Result<Vec<ActorId>> {
    let names = clean_names(new_names, "new_actors", MAX_PERSON_NAME_CHARS)?;
    let mut resolved = ids;
    let mut repo = People::actors(conn);
    for name in names {
        resolved.push(repo.get_or_create(&name).await?.id);
    }
    Ok(dedup(resolved))
}

/// An explicit id wins over a new name.
async fn resolve_director(conn: &mut SqliteConnection, id: Option<DirectorId>, new_name: Option<&str>) -> Result<Option<DirectorId>> {
    if id.is_some() {
        return Ok(id);
    }
    let Some(raw) = new_name else {
        return Ok(None);
    };
    match clean_name(raw, "new_director", MAX_PERSON_NAME_CHARS)? {
        Some(name) => Ok(Some(People::directors(conn).get_or_create(&name).await?.id)),
        None => Ok(None),
    }
}

fn collection_limit(query: &CollectionQuery) -> i64 {
    query.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT)
}

/// List movies
#[utoipa::path(
    get,
    path = "/movies",
    tag = "movies",
    summary = "List movies",
    description = "Newest release year first, then by title. Malformed numeric filters are ignored.",
    params(ListMoviesQuery),
    responses(
        (status = 200, description = "Paginated list of movies", body = PaginatedResponse<MovieResponse>),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn list_movies(State(state): State<AppState>, Query(query): Query<ListMoviesQuery>) -> Result<Json<PaginatedResponse<MovieResponse>>> {
    let filter = query.to_filter();

    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = Movies::new(&mut conn);
    let movies = repo.list(&filter).await?;
    let total_count = repo.count(&filter).await?;

    let data = movie_responses(&mut conn, movies).await?;
    Ok(Json(PaginatedResponse::new(data, total_count, filter.skip, filter.limit)))
}

/// Get a movie
#[utoipa::path(
    get,
    path = "/movies/{movie_id}",
    tag = "movies",
    summary = "Get a movie",
    description = "Movie detail with review statistics and related movies. Signed-in callers also get their watchlist and review state for the movie.",
    params(
        ("movie_id" = uuid::Uuid, Path, description = "Movie ID"),
    ),
    responses(
        (status = 200, description = "Movie detail", body = MovieDetailResponse),
        (status = 404, description = "Movie not found"),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn get_movie(State(state): State<AppState>, Path(movie_id): Path<MovieId>, identity: Identity) -> Result<Json<MovieDetailResponse>> {
    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let movie = get_movie_or_404(&mut conn, movie_id).await?;
    let title = movie.title.clone();

    let summary = Reviews::new(&mut conn).rating_summary(movie_id).await?;
    let related = Movies::new(&mut conn).related(movie_id, RELATED_LIMIT).await?;

    let (in_watchlist, user_review) = match identity.id {
        Some(user_id) => {
            let entry = Watchlist::new(&mut conn).get_for_user_and_movie(user_id, movie_id).await?;
            let review = match Reviews::new(&mut conn).get_for_movie_and_user(movie_id, user_id).await? {
                Some(review) => Some(review_response(&mut conn, review, Some(title)).await?),
                None => None,
            };
            (Some(entry.is_some()), review)
        }
        None => (None, None),
    };

    let movie = movie_response(&mut conn, movie).await?;
    let related = movie_responses(&mut conn, related).await?;

    Ok(Json(MovieDetailResponse {
        movie,
        average_rating: summary.average,
        review_count: summary.count,
        related,
        in_watchlist,
        user_review,
    }))
}

/// Latest releases
#[utoipa::path(
    get,
    path = "/movies/latest",
    tag = "movies",
    summary = "Latest releases",
    description = "Movies released in the last two years, most recent first.",
    params(CollectionQuery),
    responses(
        (status = 200, description = "Latest movies", body = [MovieResponse]),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn latest_movies(State(state): State<AppState>, Query(query): Query<CollectionQuery>) -> Result<Json<Vec<MovieResponse>>> {
    let since = Utc::now().date_naive() - TimeDelta::days(LATEST_WINDOW_DAYS);

    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let movies = Movies::new(&mut conn).latest(since, collection_limit(&query)).await?;
    Ok(Json(movie_responses(&mut conn, movies).await?))
}

/// Top rated movies
#[utoipa::path(
    get,
    path = "/movies/top-rated",
    tag = "movies",
    summary = "Top rated movies",
    description = "Movies by IMDb rating, highest first.",
    params(CollectionQuery),
    responses(
        (status = 200, description = "Top rated movies", body = [MovieResponse]),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn top_rated_movies(State(state): State<AppState>, Query(query): Query<CollectionQuery>) -> Result<Json<Vec<MovieResponse>>> {
    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let movies = Movies::new(&mut conn).top_rated(collection_limit(&query)).await?;
    Ok(Json(movie_responses(&mut conn, movies).await?))
}

/// Classics
#[utoipa::path(
    get,
    path = "/movies/classics",
    tag = "movies",
    summary = "Classics",
    description = "Movies released more than twenty years ago with an IMDb rating of at least 8.0.",
    params(CollectionQuery),
    responses(
        (status = 200, description = "Classic movies", body = [MovieResponse]),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn classic_movies(State(state): State<AppState>, Query(query): Query<CollectionQuery>) -> Result<Json<Vec<MovieResponse>>> {
    let released_before = Utc::now()
        .date_naive()
        .checked_sub_months(Months::new(CLASSIC_AGE_MONTHS))
        .ok_or_else(|| Error::Internal {
            operation: "compute classics cutoff date".to_string(),
        })?;

    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let movies = Movies::new(&mut conn)
        .classics(released_before, CLASSIC_MIN_RATING, collection_limit(&query))
        .await?;
    Ok(Json(movie_responses(&mut conn, movies).await?))
}

/// Create a movie
#[utoipa::path(
    post,
    path = "/movies",
    tag = "movies",
    summary = "Create a movie",
    description = "Requires the manage-movies action. New genre, director and actor names are created on save, or reused when the name already exists.",
    request_body = MovieCreate,
    responses(
        (status = 201, description = "Movie created", body = MovieResponse),
        (status = 400, description = "Invalid movie data"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 409, description = "A movie with this title and year already exists"),
    ),
    security(
        ("CookieAuth" = []),
        ("X-Moodie-User" = [])
    )
)]
#[tracing::instrument(skip_all)]
pub async fn create_movie(
    State(state): State<AppState>,
    _: RequiresPermission<action::ManageMovies>,
    Json(create): Json<MovieCreate>,
) -> Result<(StatusCode, Json<MovieResponse>)> {
    let create = validated(create)?;
    let title = create.title.trim().to_string();
    if title.is_empty() {
        return Err(Error::BadRequest {
            message: "Title cannot be empty".to_string(),
        });
    }

    let mut tx = state.db.begin().await.map_err(|e| Error::Database(e.into()))?;
    let genre_ids = resolve_genres(&mut tx, create.genre_ids, &create.new_genres).await?;
    let director_id = resolve_director(&mut tx, create.director_id, create.new_director.as_deref()).await?;
    let actor_ids = resolve_actors(&mut tx, create.actor_ids, &create.new_actors).await?;

    let request = MovieCreateDBRequest {
        title,
        release_year: create.release_year,
        release_date: create.release_date,
        plot: create.plot,
        poster_url: create.poster_url,
        backdrop_url: create.backdrop_url,
        trailer_url: create.trailer_url,
        imdb_rating: create.imdb_rating.map(round_rating),
        director_id,
        genre_ids,
        actor_ids,
    };
    let movie = Movies::new(&mut tx).create(&request).await?;
    let response = movie_response(&mut tx, movie).await?;
    tx.commit().await.map_err(|e| Error::Database(e.into()))?;

    Ok((StatusCode::CREATED, Json(response)))
}

/// Update a movie
#[utoipa::path(
    patch,
    path = "/movies/{movie_id}",
    tag = "movies",
    summary = "Update a movie",
    description = "Requires the manage-movies action. The genre list is replaced when `genre_ids` or `new_genres` is present, likewise for actors.",
    request_body = MovieUpdate,
    params(
        ("movie_id" = uuid::Uuid, Path, description = "Movie ID"),
    ),
    responses(
        (status = 200, description = "Movie updated", body = MovieResponse),
        (status = 400, description = "Invalid movie data"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Movie not found"),
        (status = 409, description = "A movie with this title and year already exists"),
    ),
    security(
        ("CookieAuth" = []),
        ("X-Moodie-User" = [])
    )
)]
#[tracing::instrument(skip_all)]
pub async fn update_movie(
    State(state): State<AppState>,
    Path(movie_id): Path<MovieId>,
    _: RequiresPermission<action::ManageMovies>,
    Json(update): Json<MovieUpdate>,
) -> Result<Json<MovieResponse>> {
    let update = validated(update)?;

    let mut tx = state.db.begin().await.map_err(|e| Error::Database(e.into()))?;
    get_movie_or_404(&mut tx, movie_id).await?;

    let genre_ids = if update.genre_ids.is_some() || update.new_genres.is_some() {
        Some(resolve_genres(&mut tx, update.genre_ids.unwrap_or_default(), &update.new_genres.unwrap_or_default()).await?)
    } else {
        None
    };
    let actor_ids = if update.actor_ids.is_some() || update.new_actors.is_some() {
        Some(resolve_actors(&mut tx, update.actor_ids.unwrap_or_default(), &update.new_actors.unwrap_or_default()).await?)
    } else {
        None
    };
    let director_id = resolve_director(&mut tx, update.director_id, update.new_director.as_deref()).await?;

    let request = MovieUpdateDBRequest {
        title: update.title.map(|t| t.trim().to_string()).filter(|t| !t.is_empty()),
        release_year: update.release_year,
        release_date: update.release_date,
        plot: update.plot,
        poster_url: update.poster_url,
        backdrop_url: update.backdrop_url,
        trailer_url: update.trailer_url,
        imdb_rating: update.imdb_rating.map(round_rating),
        director_id,
        genre_ids,
        actor_ids,
    };
    let movie = Movies::new(&mut tx).update(movie_id, &request).await?;
    let response = movie_response(&mut tx, movie).await?;
    tx.commit().await.map_err(|e| Error::Database(e.into()))?;

    Ok(Json(response))
}

/// Delete a movie
#[utoipa::path(
    delete,
    path = "/movies/{movie_id}",
    tag = "movies",
    summary = "Delete a movie",
    description = "Requires the manage-movies action. Reviews, comments and watchlist entries for the movie go with it.",
    params(
        ("movie_id" = uuid::Uuid, Path, description = "Movie ID"),
    ),
    responses(
        (status = 204, description = "Movie deleted"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Movie not found"),
    ),
    security(
        ("CookieAuth" = []),
        ("X-Moodie-User" = [])
    )
)]
#[tracing::instrument(skip_all)]
pub async fn delete_movie(
    State(state): State<AppState>,
    Path(movie_id): Path<MovieId>,
    _: RequiresPermission<action::ManageMovies>,
) -> Result<StatusCode> {
    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    if !Movies::new(&mut conn).delete(movie_id).await? {
        return Err(Error::NotFound {
            resource: "Movie".to_string(),
            id: movie_id.to_string(),
        });
    }
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use crate::api::models::{
        movies::{MovieDetailResponse, MovieResponse},
        pagination::PaginatedResponse,
    };
    use crate::test_utils::{auth_header, create_test_app, create_test_config, create_test_movie, create_test_review, create_test_user};
    use crate::types::Role;
    use axum::http::StatusCode;
    use chrono::{TimeDelta, Utc};
    use serde_json::json;
    use sqlx::SqlitePool;

    #[sqlx::test]
    #[test_log::test]
    async fn test_create_movie_with_new_names(pool: SqlitePool) {
        let (server, _) = create_test_app(pool.clone(), create_test_config()).await;
        let staff = create_test_user(&pool, Role::Staff).await;

        let (name, value) = auth_header(&staff);
        let response = server
            .post("/movies")
            .add_header(name, value)
            .json(&json!({
                "title": "Playtime",
                "release_year": 1967,
                "imdb_rating": 7.86,
                "new_genres": ["Comedy", "comedy "],
                "new_director": "Jacques Tati",
                "new_actors": ["Barbara Dennek"],
            }))
            .await;
        response.assert_status(StatusCode::CREATED);
        let movie: MovieResponse = response.json();
        assert_eq!(movie.imdb_rating, Some(7.9));
        // Genre names are matched ignoring case
        assert_eq!(movie.genres.len(), 1);
        assert_eq!(movie.director.as_ref().map(|d| d.name.as_str()), Some("Jacques Tati"));
        assert_eq!(movie.actors.len(), 1);

        // Same director name reuses the existing director
        let (name, value) = auth_header(&staff);
        let second: MovieResponse = server
            .post("/movies")
            .add_header(name, value)
            .json(&json!({
                "title": "Mon Oncle",
                "release_year": 1958,
                "new_genres": ["Comedy"],
                "new_director": "Jacques Tati",
            }))
            .await
            .json();
        assert_eq!(second.director, movie.director);
        assert_eq!(second.genres, movie.genres);
    }

    #[sqlx::test]
    async fn test_create_movie_rules(pool: SqlitePool) {
        let (server, _) = create_test_app(pool.clone(), create_test_config()).await;
        let staff = create_test_user(&pool, Role::Staff).await;
        let user = create_test_user(&pool, Role::User).await;
        let body = json!({ "title": "Solaris", "release_year": 1972, "new_genres": ["Science Fiction"] });

        let (name, value) = auth_header(&user);
        server.post("/movies").add_header(name, value).json(&body).await.assert_status_forbidden();
        server.post("/movies").json(&body).await.assert_status_forbidden();

        let (name, value) = auth_header(&staff);
        server
            .post("/movies")
            .add_header(name, value)
            .json(&json!({ "title": "Solaris", "release_year": 1972 }))
            .await
            .assert_status(StatusCode::BAD_REQUEST);

        let (name, value) = auth_header(&staff);
        server
            .post("/movies")
            .add_header(name, value)
            .json(&json!({ "title": "Solaris", "release_year": 1850, "new_genres": ["Science Fiction"] }))
            .await
            .assert_status(StatusCode::BAD_REQUEST);

        let (name, value) = auth_header(&staff);
        server.post("/movies").add_header(name, value).json(&body).await.assert_status(StatusCode::CREATED);

        let (name, value) = auth_header(&staff);
        let response = server.post("/movies").add_header(name, value).json(&body).await;
        response.assert_status(StatusCode::CONFLICT);
        let error: serde_json::Value = response.json();
        assert_eq!(error["resource"], "movie");
    }

    #[sqlx::test]
    async fn test_new_names_are_sanitized_and_length_checked(pool: SqlitePool) {
        let (server, _) = create_test_app(pool.clone(), create_test_config()).await;
        let staff = create_test_user(&pool, Role::Staff).await;

        let long_genre = format!("<b>{}</b>", "x".repeat(101));
        let (name, value) = auth_header(&staff);
        server
            .post("/movies")
            .add_header(name, value)
            .json(&json!({ "title": "Koyaanisqatsi", "release_year": 1982, "new_genres": [long_genre] }))
            .await
            .assert_status(StatusCode::BAD_REQUEST);

        let (name, value) = auth_header(&staff);
        server
            .post("/movies")
            .add_header(name, value)
            .json(&json!({
                "title": "Koyaanisqatsi",
                "release_year": 1982,
                "new_genres": ["Documentary"],
                "new_director": "y".repeat(201),
            }))
            .await
            .assert_status(StatusCode::BAD_REQUEST);

        let (name, value) = auth_header(&staff);
        server
            .post("/movies")
            .add_header(name, value)
            .json(&json!({ "title": "Koyaanisqatsi", "release_year": 1982, "new_genres": ["<i></i>"] }))
            .await
            .assert_status(StatusCode::BAD_REQUEST);

        // Nothing was stored by the rejected requests
        let genres: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM genres").fetch_one(&pool).await.unwrap();
        assert_eq!(genres, 0);

        let (name, value) = auth_header(&staff);
        let response = server
            .post("/movies")
            .add_header(name, value)
            .json(&json!({
                "title": "Koyaanisqatsi",
                "release_year": 1982,
                "new_genres": ["<b>Documentary</b>", "  "],
                "new_director": "<script>Godfrey</script> Reggio",
            }))
            .await;
        response.assert_status(StatusCode::CREATED);
        let movie: MovieResponse = response.json();
        assert_eq!(movie.genres.len(), 1);
        assert_eq!(movie.genres[0].name, "Documentary");
        assert_eq!(movie.director.as_ref().map(|d| d.name.as_str()), Some("Godfrey Reggio"));
    }

    #[sqlx::test]
    async fn test_list_movies_with_lenient_filters(pool: SqlitePool) {
        let (server, _) = create_test_app(pool.clone(), create_test_config()).await;
        create_test_movie(&pool, "Alien", 1979).await;
        create_test_movie(&pool, "Aliens", 1986).await;
        create_test_movie(&pool, "Heat", 1995).await;

        let page: PaginatedResponse<MovieResponse> = server.get("/movies?title=alien&year_min=abc&rating_min=99").await.json();
        assert_eq!(page.total_count, 2);
        assert_eq!(page.data[0].title, "Aliens");
        assert_eq!(page.limit, 15);

        let page: PaginatedResponse<MovieResponse> = server.get("/movies?year_min=1980&year_max=1990").await.json();
        assert_eq!(page.total_count, 1);
        assert_eq!(page.data[0].title, "Aliens");
    }

    #[sqlx::test]
    async fn test_movie_detail(pool: SqlitePool) {
        let (server, _) = create_test_app(pool.clone(), create_test_config()).await;
        let movie = create_test_movie(&pool, "Stalker", 1979).await;
        let related = create_test_movie(&pool, "Solaris", 1972).await;
        let alice = create_test_user(&pool, Role::User).await;
        let bob = create_test_user(&pool, Role::User).await;
        create_test_review(&pool, movie.id, alice.id, 9).await;
        create_test_review(&pool, movie.id, bob.id, 6).await;

        let detail: MovieDetailResponse = server.get(&format!("/movies/{}", movie.id)).await.json();
        assert_eq!(detail.movie.title, "Stalker");
        assert_eq!(detail.review_count, 2);
        assert!((detail.average_rating - 7.5).abs() < f64::EPSILON);
        assert_eq!(detail.related.len(), 1);
        assert_eq!(detail.related[0].id, related.id);
        assert!(detail.in_watchlist.is_none());
        assert!(detail.user_review.is_none());

        let (name, value) = auth_header(&alice);
        let detail: MovieDetailResponse = server.get(&format!("/movies/{}", movie.id)).add_header(name, value).await.json();
        assert_eq!(detail.in_watchlist, Some(false));
        assert_eq!(detail.user_review.map(|r| r.rating), Some(9));

        let unreviewed: MovieDetailResponse = server.get(&format!("/movies/{}", related.id)).await.json();
        assert_eq!(unreviewed.review_count, 0);
        assert_eq!(unreviewed.average_rating, 0.0);

        server
            .get(&format!("/movies/{}", uuid::Uuid::new_v4()))
            .await
            .assert_status_not_found();
    }

    #[sqlx::test]
    async fn test_collections(pool: SqlitePool) {
        let (server, _) = create_test_app(pool.clone(), create_test_config()).await;
        let staff = create_test_user(&pool, Role::Staff).await;
        let recent = Utc::now().date_naive() - TimeDelta::days(30);

        for (title, year, date, rating) in [
            ("Recent Release", recent.format("%Y").to_string().parse::<i32>().unwrap(), Some(recent.to_string()), 6.5),
            ("Old Masterpiece", 1957, Some("1957-03-01".to_string()), 8.4),
            ("Old Average", 1960, Some("1960-03-01".to_string()), 6.0),
        ] {
            let (name, value) = auth_header(&staff);
            server
                .post("/movies")
                .add_header(name, value)
                .json(&json!({
                    "title": title,
                    "release_year": year,
                    "release_date": date,
                    "imdb_rating": rating,
                    "new_genres": ["Drama"],
                }))
                .await
                .assert_status(StatusCode::CREATED);
        }

        let latest: Vec<MovieResponse> = server.get("/movies/latest").await.json();
        assert_eq!(latest.len(), 1);
        assert_eq!(latest[0].title, "Recent Release");

        let top: Vec<MovieResponse> = server.get("/movies/top-rated?limit=2").await.json();
        assert_eq!(top.len(), 2);
        assert_eq!(top[0].title, "Old Masterpiece");

        let classics: Vec<MovieResponse> = server.get("/movies/classics").await.json();
        assert_eq!(classics.len(), 1);
        assert_eq!(classics[0].title, "Old Masterpiece");
    }

    #[sqlx::test]
    async fn test_update_and_delete_movie(pool: SqlitePool) {
        let (server, _) = create_test_app(pool.clone(), create_test_config()).await;
        let staff = create_test_user(&pool, Role::Staff).await;
        let movie = create_test_movie(&pool, "Mirror", 1975).await;

        let (name, value) = auth_header(&staff);
        let response = server
            .patch(&format!("/movies/{}", movie.id))
            .add_header(name, value)
            .json(&json!({ "plot": "Memories", "new_genres": ["Art House"] }))
            .await;
        response.assert_status_ok();
        let updated: MovieResponse = response.json();
        assert_eq!(updated.plot, "Memories");
        assert_eq!(updated.genres.len(), 1);
        assert_eq!(updated.genres[0].name, "Art House");

        let (name, value) = auth_header(&staff);
        server
            .patch(&format!("/movies/{}", movie.id))
            .add_header(name, value)
            .json(&json!({ "genre_ids": [] }))
            .await
            .assert_status(StatusCode::BAD_REQUEST);

        let (name, value) = auth_header(&staff);
        server
            .delete(&format!("/movies/{}", movie.id))
            .add_header(name, value)
            .await
            .assert_status(StatusCode::NO_CONTENT);

        let (name, value) = auth_header(&staff);
        server
            .delete(&format!("/movies/{}", movie.id))
            .add_header(name, value)
            .await
            .assert_status_not_found();
    }
}
