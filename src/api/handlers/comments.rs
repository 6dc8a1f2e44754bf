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
        handlers::{json_body, reviews::get_review_or_404, validated},
        models::{
            comments::{CommentContent, CommentResponse},
            pagination::{PaginatedResponse, Pagination},
            users::UserSummary,
        },
    },
    auth::{
        ownership::OwnedResource,
        permissions::{Identity, authorize},
    },
    db::{
        handlers::{Comments, Repository, Users, comments::CommentFilter},
        models::comments::{CommentCreateDBRequest, CommentDBResponse, CommentUpdateDBRequest},
    },
    errors::{Error, Result},
    sanitize::sanitize_input,
    types::{Action, CommentId, ContentKind, ReviewId},
};

async fn comment_responses(conn: &mut SqliteConnection, comments: Vec<CommentDBResponse>) -> Result<Vec<CommentResponse>> {
    let user_ids = comments.iter().map(|c| c.user_id).collect::<HashSet<_>>().into_iter().collect();
    let users = Users::new(conn).get_bulk(user_ids).await?;

    comments
        .into_iter()
        .map(|comment| {
            let user = users.get(&comment.user_id).map(UserSummary::from).ok_or_else(|| Error::Internal {
                operation: format!("load author of comment {}", comment.id),
            })?;
            Ok(CommentResponse::new(comment, user))
        })
        .collect()
}

async fn comment_response(conn: &mut SqliteConnection, comment: CommentDBResponse) -> Result<CommentResponse> {
    comment_responses(conn, vec![comment]).await?.pop().ok_or_else(|| Error::Internal {
        operation: "build comment response".to_string(),
    })
}

async fn get_comment_or_404(conn: &mut SqliteConnection, comment_id: CommentId) -> Result<CommentDBResponse> {
    Comments::new(conn).get_by_id(comment_id).await?.ok_or_else(|| Error::NotFound {
        resource: "Comment".to_string(),
        id: comment_id.to_string(),
    })
}

fn cleaned_content(body: CommentContent) -> Result<String> {
    let body = validated(body)?;
    let content = sanitize_input(&body.content);
    if content.is_empty() {
        return Err(Error::BadRequest {
            message: "Comment cannot be empty".to_string(),
        });
    }
    Ok(content)
}

/// List comments on a review
#[utoipa::path(
    get,
    path = "/reviews/{review_id}/comments",
    tag = "comments",
    summary = "List comments on a review",
    description = "Oldest first.",
    params(
        ("review_id" = uuid::Uuid, Path, description = "Review ID"),
        Pagination,
    ),
    responses(
        (status = 200, description = "Paginated list of comments", body = PaginatedResponse<CommentResponse>),
        (status = 404, description = "Review not found"),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn list_comments(
    State(state): State<AppState>,
    Path(review_id): Path<ReviewId>,
    Query(pagination): Query<Pagination>,
) -> Result<Json<PaginatedResponse<CommentResponse>>> {
    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    get_review_or_404(&mut conn, review_id).await?;

    let filter = CommentFilter::for_review(review_id, pagination.skip(), pagination.limit());
    let mut repo = Comments::new(&mut conn);
    let comments = repo.list(&filter).await?;
    let total_count = repo.count(&filter).await?;

    let data = comment_responses(&mut conn, comments).await?;
    Ok(Json(PaginatedResponse::new(data, total_count, filter.skip, filter.limit)))
}

/// Comment on a review
#[utoipa::path(
    post,
    path = "/reviews/{review_id}/comments",
    tag = "comments",
    summary = "Comment on a review",
    description = "Markup is stripped; a comment that is empty afterwards is rejected.",
    request_body = CommentContent,
    params(
        ("review_id" = uuid::Uuid, Path, description = "Review ID"),
    ),
    responses(
        (status = 201, description = "Comment created", body = CommentResponse),
        (status = 400, description = "Empty or too long comment"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Review not found"),
    ),
    security(
        ("CookieAuth" = []),
        ("X-Moodie-User" = [])
    )
)]
#[tracing::instrument(skip_all)]
pub async fn create_comment(
    State(state): State<AppState>,
    Path(review_id): Path<ReviewId>,
    identity: Identity,
    payload: std::result::Result<Json<CommentContent>, JsonRejection>,
) -> Result<(StatusCode, Json<CommentResponse>)> {
    authorize(&identity, Action::Create(ContentKind::Comment), None, "comment")?;
    let user_id = identity.id.ok_or(Error::Unauthenticated { message: None })?;
    let content = cleaned_content(json_body(payload)?)?;

    let mut tx = state.db.begin().await.map_err(|e| Error::Database(e.into()))?;
    get_review_or_404(&mut tx, review_id).await?;
    let comment = Comments::new(&mut tx)
        .create(&CommentCreateDBRequest {
            review_id,
            user_id,
            content,
        })
        .await?;
    let response = comment_response(&mut tx, comment).await?;
    tx.commit().await.map_err(|e| Error::Database(e.into()))?;

    Ok((StatusCode::CREATED, Json(response)))
}

/// Edit a comment
#[utoipa::path(
    patch,
    path = "/comments/{comment_id}",
    tag = "comments",
    summary = "Edit a comment",
    request_body = CommentContent,
    params(
        ("comment_id" = uuid::Uuid, Path, description = "Comment ID"),
    ),
    responses(
        (status = 200, description = "Comment updated", body = CommentResponse),
        (status = 400, description = "Empty or too long comment"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Comment not found"),
    ),
    security(
        ("CookieAuth" = []),
        ("X-Moodie-User" = [])
    )
)]
#[tracing::instrument(skip_all)]
pub async fn update_comment(
    State(state): State<AppState>,
    Path(comment_id): Path<CommentId>,
    identity: Identity,
    Json(body): Json<CommentContent>,
) -> Result<Json<CommentResponse>> {
    let mut tx = state.db.begin().await.map_err(|e| Error::Database(e.into()))?;
    let comment = get_comment_or_404(&mut tx, comment_id).await?;
    authorize(&identity, Action::Edit, Some(&comment.content_item()), "comment")?;

    let content = cleaned_content(body)?;
    let comment = Comments::new(&mut tx).update(comment_id, &CommentUpdateDBRequest { content }).await?;
    let response = comment_response(&mut tx, comment).await?;
    tx.commit().await.map_err(|e| Error::Database(e.into()))?;

    Ok(Json(response))
}

/// Delete a comment
#[utoipa::path(
    delete,
    path = "/comments/{comment_id}",
    tag = "comments",
    summary = "Delete a comment",
    params(
        ("comment_id" = uuid::Uuid, Path, description = "Comment ID"),
    ),
    responses(
        (status = 204, description = "Comment deleted"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Comment not found"),
    ),
    security(
        ("CookieAuth" = []),
        ("X-Moodie-User" = [])
    )
)]
#[tracing::instrument(skip_all)]
pub async fn delete_comment(State(state): State<AppState>, Path(comment_id): Path<CommentId>, identity: Identity) -> Result<StatusCode> {
    let mut tx = state.db.begin().await.map_err(|e| Error::Database(e.into()))?;
    let comment = get_comment_or_404(&mut tx, comment_id).await?;
    authorize(&identity, Action::Delete, Some(&comment.content_item()), "comment")?;

    Comments::new(&mut tx).delete(comment_id).await?;
    tx.commit().await.map_err(|e| Error::Database(e.into()))?;

    Ok(StatusCode::NO_CONTENT)
}
