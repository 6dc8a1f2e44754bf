use std::collections::HashSet;

use axum::{
    Json,
    extract::{Path, Query, State, rejection::JsonRejection},
    http::StatusCode,
};
use sqlx::SqliteConnection;

use crate::{
    AppState,
    api::{
        handlers::{json_body, movies::get_movie_or_404, validated},
        models::{
            pagination::{PaginatedResponse, Pagination},
            reviews::{ReviewCreate, ReviewResponse, ReviewUpdate},
            users::UserSummary,
        },
    },
    auth::{
        ownership::OwnedResource,
        permissions::{Identity, authorize},
    },
    db::{
        handlers::{Movies, Repository, Reviews, Users, reviews::ReviewFilter},
        models::reviews::{ReviewCreateDBRequest, ReviewDBResponse, ReviewUpdateDBRequest},
    },
    errors::{Error, Result},
    sanitize::sanitize_input,
    types::{Action, ContentKind, MovieId, ReviewId, UserId},
};

/// Attach the movie title and author summary to stored reviews.
pub(crate) async fn review_responses(conn: &mut SqliteConnection, reviews: Vec<ReviewDBResponse>) -> Result<Vec<ReviewResponse>> {
    let movie_ids: Vec<MovieId> = reviews.iter().map(|r| r.movie_id).collect::<HashSet<_>>().into_iter().collect();
    let user_ids: Vec<UserId> = reviews.iter().map(|r| r.user_id).collect::<HashSet<_>>().into_iter().collect();

    let movies = Movies::new(&mut *conn).get_bulk(movie_ids).await?;
    let users = Users::new(&mut *conn).get_bulk(user_ids).await?;

    reviews
        .into_iter()
        .map(|review| {
            let title = movies.get(&review.movie_id).map(|m| m.title.clone()).unwrap_or_default();
            let user = users.get(&review.user_id).map(UserSummary::from).ok_or_else(|| Error::Internal {
                operation: format!("load author of review {}", review.id),
            })?;
            Ok(ReviewResponse::new(review, title, user))
        })
        .collect()
}

/// Like [`review_responses`] for one review; pass the title when the caller already has it.
pub(crate) async fn review_response(conn: &mut SqliteConnection, review: ReviewDBResponse, movie_title: Option<String>) -> Result<ReviewResponse> {
    let title = match movie_title {
        Some(title) => title,
        None => get_movie_or_404(&mut *conn, review.movie_id).await?.title,
    };
    let author = Users::new(&mut *conn).get_by_id(review.user_id).await?.ok_or_else(|| Error::Internal {
        operation: format!("load author of review {}", review.id),
    })?;
    Ok(ReviewResponse::new(review, title, UserSummary::from(&author)))
}

pub(crate) async fn get_review_or_404(conn: &mut SqliteConnection, review_id: ReviewId) -> Result<ReviewDBResponse> {
    Reviews::new(conn).get_by_id(review_id).await?.ok_or_else(|| Error::NotFound {
        resource: "Review".to_string(),
        id: review_id.to_string(),
    })
}

fn required_text(value: &str, field: &str) -> Result<String> {
    let cleaned = sanitize_input(value);
    if cleaned.is_empty() {
        return Err(Error::BadRequest {
            message: format!("Review {field} cannot be empty"),
        });
    }
    Ok(cleaned)
}

async fn list_page(conn: &mut SqliteConnection, filter: ReviewFilter) -> Result<PaginatedResponse<ReviewResponse>> {
    let mut repo = Reviews::new(&mut *conn);
    let reviews = repo.list(&filter).await?;
    let total_count = repo.count(&filter).await?;
    let data = review_responses(conn, reviews).await?;
    Ok(PaginatedResponse::new(data, total_count, filter.skip, filter.limit))
}

/// List reviews of a movie
#[utoipa::path(
    get,
    path = "/movies/{movie_id}/reviews",
    tag = "reviews",
    summary = "List reviews of a movie",
    description = "Newest first.",
    params(
        ("movie_id" = uuid::Uuid, Path, description = "Movie ID"),
        Pagination,
    ),
    responses(
        (status = 200, description = "Paginated list of reviews", body = PaginatedResponse<ReviewResponse>),
        (status = 404, description = "Movie not found"),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn list_movie_reviews(
    State(state): State<AppState>,
    Path(movie_id): Path<MovieId>,
    Query(pagination): Query<Pagination>,
) -> Result<Json<PaginatedResponse<ReviewResponse>>> {
    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    get_movie_or_404(&mut conn, movie_id).await?;

    let filter = ReviewFilter::new(pagination.skip(), pagination.limit()).for_movie(movie_id);
    Ok(Json(list_page(&mut conn, filter).await?))
}

/// List reviews written by a user
#[utoipa::path(
    get,
    path = "/users/{user_id}/reviews",
    tag = "reviews",
    summary = "List reviews by a user",
    description = "Newest first.",
    params(
        ("user_id" = uuid::Uuid, Path, description = "User ID"),
        Pagination,
    ),
    responses(
        (status = 200, description = "Paginated list of reviews", body = PaginatedResponse<ReviewResponse>),
        (status = 404, description = "User not found"),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn list_user_reviews(
    State(state): State<AppState>,
    Path(user_id): Path<UserId>,
    Query(pagination): Query<Pagination>,
) -> Result<Json<PaginatedResponse<ReviewResponse>>> {
    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    if Users::new(&mut conn).get_by_id(user_id).await?.is_none() {
        return Err(Error::NotFound {
            resource: "User".to_string(),
            id: user_id.to_string(),
        });
    }

    let filter = ReviewFilter::new(pagination.skip(), pagination.limit()).by_user(user_id);
    Ok(Json(list_page(&mut conn, filter).await?))
}

/// Get a review
#[utoipa::path(
    get,
    path = "/reviews/{review_id}",
    tag = "reviews",
    summary = "Get a review",
    params(
        ("review_id" = uuid::Uuid, Path, description = "Review ID"),
    ),
    responses(
        (status = 200, description = "Review", body = ReviewResponse),
        (status = 404, description = "Review not found"),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn get_review(State(state): State<AppState>, Path(review_id): Path<ReviewId>) -> Result<Json<ReviewResponse>> {
    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let review = get_review_or_404(&mut conn, review_id).await?;
    Ok(Json(review_response(&mut conn, review, None).await?))
}

/// Review a movie
#[utoipa::path(
    post,
    path = "/movies/{movie_id}/reviews",
    tag = "reviews",
    summary = "Review a movie",
    description = "One review per movie and user. Title and content are stripped of markup.",
    request_body = ReviewCreate,
    params(
        ("movie_id" = uuid::Uuid, Path, description = "Movie ID"),
    ),
    responses(
        (status = 201, description = "Review created", body = ReviewResponse),
        (status = 400, description = "Invalid review"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Movie not found"),
        (status = 409, description = "You have already reviewed this movie"),
    ),
    security(
        ("CookieAuth" = []),
        ("X-Moodie-User" = [])
    )
)]
#[tracing::instrument(skip_all)]
pub async fn create_review(
    State(state): State<AppState>,
    Path(movie_id): Path<MovieId>,
    identity: Identity,
    payload: std::result::Result<Json<ReviewCreate>, JsonRejection>,
) -> Result<(StatusCode, Json<ReviewResponse>)> {
    authorize(&identity, Action::Create(ContentKind::Review), None, "review")?;
    let user_id = identity.id.ok_or(Error::Unauthenticated { message: None })?;
    let create = validated(json_body(payload)?)?;

    let request = ReviewCreateDBRequest {
        movie_id,
        user_id,
        rating: create.rating,
        title: required_text(&create.title, "title")?,
        content: required_text(&create.content, "content")?,
    };

    let mut tx = state.db.begin().await.map_err(|e| Error::Database(e.into()))?;
    let movie = get_movie_or_404(&mut tx, movie_id).await?;
    let review = Reviews::new(&mut tx).create(&request).await?;
    let response = review_response(&mut tx, review, Some(movie.title)).await?;
    tx.commit().await.map_err(|e| Error::Database(e.into()))?;

    Ok((StatusCode::CREATED, Json(response)))
}

/// Edit a review
#[utoipa::path(
    patch,
    path = "/reviews/{review_id}",
    tag = "reviews",
    summary = "Edit a review",
    description = "Authors may edit their own reviews; staff and superusers may edit any.",
    request_body = ReviewUpdate,
    params(
        ("review_id" = uuid::Uuid, Path, description = "Review ID"),
    ),
    responses(
        (status = 200, description = "Review updated", body = ReviewResponse),
        (status = 400, description = "Invalid review"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Review not found"),
    ),
    security(
        ("CookieAuth" = []),
        ("X-Moodie-User" = [])
    )
)]
#[tracing::instrument(skip_all)]
pub async fn update_review(
    State(state): State<AppState>,
    Path(review_id): Path<ReviewId>,
    identity: Identity,
    Json(update): Json<ReviewUpdate>,
) -> Result<Json<ReviewResponse>> {
    let update = validated(update)?;

    let mut tx = state.db.begin().await.map_err(|e| Error::Database(e.into()))?;
    let review = get_review_or_404(&mut tx, review_id).await?;
    authorize(&identity, Action::Edit, Some(&review.content_item()), "review")?;

    let request = ReviewUpdateDBRequest {
        rating: update.rating,
        title: update.title.as_deref().map(|t| required_text(t, "title")).transpose()?,
        content: update.content.as_deref().map(|c| required_text(c, "content")).transpose()?,
    };
    let review = Reviews::new(&mut tx).update(review_id, &request).await?;
    let response = review_response(&mut tx, review, None).await?;
    tx.commit().await.map_err(|e| Error::Database(e.into()))?;

    Ok(Json(response))
}

/// Delete a review
#[utoipa::path(
    delete,
    path = "/reviews/{review_id}",
    tag = "reviews",
    summary = "Delete a review",
    description = "Authors may delete their own reviews; staff and superusers may delete any. Comments on the review go with it.",
    params(
        ("review_id" = uuid::Uuid, Path, description = "Review ID"),
    ),
    responses(
        (status = 204, description = "Review deleted"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Review not found"),
    ),
    security(
        ("CookieAuth" = []),
        ("X-Moodie-User" = [])
    )
)]
#[tracing::instrument(skip_all)]
pub async fn delete_review(State(state): State<AppState>, Path(review_id): Path<ReviewId>, identity: Identity) -> Result<StatusCode> {
    let mut tx = state.db.begin().await.map_err(|e| Error::Database(e.into()))?;
    let review = get_review_or_404(&mut tx, review_id).await?;
    authorize(&identity, Action::Delete, Some(&review.content_item()), "review")?;

    Reviews::new(&mut tx).delete(review_id).await?;
    tx.commit().await.map_err(|e| Error::Database(e.into()))?;

    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use crate::api::models::{pagination::PaginatedResponse, reviews::ReviewResponse};
    use crate::test_utils::{auth_header, create_test_app, create_test_config, create_test_movie, create_test_review, create_test_user};
    use crate::types::Role;
    use axum::http::StatusCode;
    use serde_json::json;
    use sqlx::SqlitePool;

    fn review_body() -> serde_json::Value {
        json!({
            "rating": 8,
            "title": "<h1>Haunting</h1>",
            "content": "The <em>zone</em> stays with you.",
        })
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_create_review_sanitizes_and_rejects_duplicates(pool: SqlitePool) {
        let (server, _) = create_test_app(pool.clone(), create_test_config()).await;
        let user = create_test_user(&pool, Role::User).await;
        let movie = create_test_movie(&pool, "Stalker", 1979).await;

        let (name, value) = auth_header(&user);
        let response = server
            .post(&format!("/movies/{}/reviews", movie.id))
            .add_header(name, value)
            .json(&review_body())
            .await;
        response.assert_status(StatusCode::CREATED);
        let review: ReviewResponse = response.json();
        assert_eq!(review.title, "Haunting");
        assert_eq!(review.content, "The zone stays with you.");
        assert_eq!(review.movie_title, "Stalker");
        assert_eq!(review.user.id, user.id);

        let (name, value) = auth_header(&user);
        let response = server
            .post(&format!("/movies/{}/reviews", movie.id))
            .add_header(name, value)
            .json(&review_body())
            .await;
        response.assert_status(StatusCode::CONFLICT);
        let body: serde_json::Value = response.json();
        assert_eq!(body["message"], "You have already reviewed this movie.");
    }

    #[sqlx::test]
    async fn test_anonymous_cannot_review(pool: SqlitePool) {
        let (server, _) = create_test_app(pool.clone(), create_test_config()).await;
        let movie = create_test_movie(&pool, "Nostalghia", 1983).await;

        server
            .post(&format!("/movies/{}/reviews", movie.id))
            .json(&review_body())
            .await
            .assert_status_forbidden();

        // A broken body is still refused for lack of permission first
        server
            .post(&format!("/movies/{}/reviews", movie.id))
            .content_type("application/json")
            .bytes("{\"rating\": ".into())
            .await
            .assert_status_forbidden();
        server
            .post(&format!("/movies/{}/reviews", movie.id))
            .text("not json")
            .await
            .assert_status_forbidden();
    }

    #[sqlx::test]
    async fn test_malformed_review_body_is_bad_request(pool: SqlitePool) {
        let (server, _) = create_test_app(pool.clone(), create_test_config()).await;
        let user = create_test_user(&pool, Role::User).await;
        let movie = create_test_movie(&pool, "Ivan's Childhood", 1962).await;

        let (name, value) = auth_header(&user);
        server
            .post(&format!("/movies/{}/reviews", movie.id))
            .add_header(name, value)
            .json(&json!({ "rating": "eight" }))
            .await
            .assert_status(StatusCode::BAD_REQUEST);
    }

    #[sqlx::test]
    async fn test_review_validation(pool: SqlitePool) {
        let (server, _) = create_test_app(pool.clone(), create_test_config()).await;
        let user = create_test_user(&pool, Role::User).await;
        let movie = create_test_movie(&pool, "Sacrifice", 1986).await;

        for body in [
            json!({ "rating": 11, "title": "Too good", "content": "Off the scale" }),
            json!({ "rating": 0, "title": "Bad", "content": "Below the scale" }),
            json!({ "rating": 5, "title": "<b></b>", "content": "Title is only markup" }),
        ] {
            let (name, value) = auth_header(&user);
            server
                .post(&format!("/movies/{}/reviews", movie.id))
                .add_header(name, value)
                .json(&body)
                .await
                .assert_status(StatusCode::BAD_REQUEST);
        }

        let (name, value) = auth_header(&user);
        server
            .post(&format!("/movies/{}/reviews", uuid::Uuid::new_v4()))
            .add_header(name, value)
            .json(&review_body())
            .await
            .assert_status_not_found();
    }

    #[sqlx::test]
    async fn test_only_author_or_staff_may_edit_and_delete(pool: SqlitePool) {
        let (server, _) = create_test_app(pool.clone(), create_test_config()).await;
        let author = create_test_user(&pool, Role::User).await;
        let other = create_test_user(&pool, Role::User).await;
        let staff = create_test_user(&pool, Role::Staff).await;
        let movie = create_test_movie(&pool, "Ivan's Childhood", 1962).await;
        let review = create_test_review(&pool, movie.id, author.id, 7).await;

        let (name, value) = auth_header(&other);
        server
            .patch(&format!("/reviews/{}", review.id))
            .add_header(name, value)
            .json(&json!({ "rating": 1 }))
            .await
            .assert_status_forbidden();

        let (name, value) = auth_header(&other);
        server
            .delete(&format!("/reviews/{}", review.id))
            .add_header(name, value)
            .await
            .assert_status_forbidden();

        server.delete(&format!("/reviews/{}", review.id)).await.assert_status_forbidden();

        let (name, value) = auth_header(&author);
        let response = server
            .patch(&format!("/reviews/{}", review.id))
            .add_header(name, value)
            .json(&json!({ "rating": 9 }))
            .await;
        response.assert_status_ok();
        assert_eq!(response.json::<ReviewResponse>().rating, 9);

        let (name, value) = auth_header(&staff);
        server
            .delete(&format!("/reviews/{}", review.id))
            .add_header(name, value)
            .await
            .assert_status(StatusCode::NO_CONTENT);

        server.get(&format!("/reviews/{}", review.id)).await.assert_status_not_found();
    }

    #[sqlx::test]
    async fn test_list_reviews(pool: SqlitePool) {
        let (server, _) = create_test_app(pool.clone(), create_test_config()).await;
        let alice = create_test_user(&pool, Role::User).await;
        let bob = create_test_user(&pool, Role::User).await;
        let first = create_test_movie(&pool, "Ran", 1985).await;
        let second = create_test_movie(&pool, "Kagemusha", 1980).await;
        create_test_review(&pool, first.id, alice.id, 10).await;
        create_test_review(&pool, first.id, bob.id, 8).await;
        create_test_review(&pool, second.id, alice.id, 7).await;

        let page: PaginatedResponse<ReviewResponse> = server.get(&format!("/movies/{}/reviews", first.id)).await.json();
        assert_eq!(page.total_count, 2);
        assert_eq!(page.limit, 10);

        let page: PaginatedResponse<ReviewResponse> = server.get(&format!("/users/{}/reviews?limit=1", alice.id)).await.json();
        assert_eq!(page.total_count, 2);
        assert_eq!(page.data.len(), 1);
        // Newest first
        assert_eq!(page.data[0].movie_title, "Kagemusha");
    }
}
