use axum::{
    Json,
    extract::{Query, State},
};
use sqlx::SqliteConnection;
use uuid::Uuid;

use crate::{
    AppState,
    api::models::permissions::{PermissionCheckQuery, PermissionCheckResponse},
    auth::{
        ownership::OwnedResource,
        permissions::{ContentItem, Identity, PermissionError, evaluate, log_decision},
    },
    db::handlers::{Comments, Repository, Reviews, Watchlist},
    errors::{Error, Result},
    types::{Action, ContentKind},
};

async fn load_content_item(conn: &mut SqliteConnection, kind: ContentKind, id: Uuid) -> Result<Option<ContentItem>> {
    let item = match kind {
        ContentKind::Review => Reviews::new(conn).get_by_id(id).await?.map(|r| r.content_item()),
        ContentKind::Comment => Comments::new(conn).get_by_id(id).await?.map(|c| c.content_item()),
        ContentKind::WatchlistEntry => Watchlist::new(conn).get_by_id(id).await?.map(|w| w.content_item()),
    };
    Ok(item)
}

/// Ask whether the caller may perform an action
#[utoipa::path(
    get,
    path = "/permissions/check",
    tag = "permissions",
    summary = "Check a permission",
    description = "Evaluates the caller against an action and, for edit and delete, the content item it targets. Unknown action names and targets that do not exist are reported as not allowed.",
    params(PermissionCheckQuery),
    responses(
        (status = 200, description = "The decision", body = PermissionCheckResponse),
        (status = 400, description = "Content kind without id, or an ownership-gated action without a target"),
    ),
    security(
        (),
        ("CookieAuth" = []),
        ("X-Moodie-User" = [])
    )
)]
#[tracing::instrument(skip_all)]
pub async fn check_permission(
    State(state): State<AppState>,
    Query(query): Query<PermissionCheckQuery>,
    identity: Identity,
) -> Result<Json<PermissionCheckResponse>> {
    let action = match query.action.parse::<Action>() {
        Ok(action) => action,
        Err(e) => {
            tracing::info!(action = %query.action, role = %identity.role, reason = %e, "permission denied");
            return Ok(Json(PermissionCheckResponse {
                action: query.action,
                allowed: false,
            }));
        }
    };

    let target = match (query.content_kind, query.content_id) {
        (Some(kind), Some(id)) => {
            let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
            match load_content_item(&mut conn, kind, id).await? {
                Some(item) => Some(item),
                // Answered like any other denial so ids of private content stay unconfirmed
                None => {
                    tracing::info!(action = %action, role = %identity.role, target = %id, reason = "no such target", "permission denied");
                    return Ok(Json(PermissionCheckResponse {
                        action: action.to_string(),
                        allowed: false,
                    }));
                }
            }
        }
        (None, None) => None,
        _ => {
            return Err(Error::BadRequest {
                message: "content_kind and content_id must be given together".to_string(),
            });
        }
    };

    let decision = evaluate(&identity, action, target.as_ref()).map_err(|e| match e {
        PermissionError::MissingTarget { .. } => Error::BadRequest { message: e.to_string() },
    })?;
    log_decision(&identity, target.as_ref(), &decision);

    Ok(Json(PermissionCheckResponse {
        action: action.to_string(),
        allowed: decision.allow,
    }))
}
