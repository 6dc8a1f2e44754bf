use axum::{
    Json,
    extract::{Query, State},
};

use crate::{
    AppState,
    api::{
        handlers::reviews::review_responses,
        models::{
            dashboard::{DashboardCounts, DashboardResponse},
            pagination::PaginatedResponse,
            reviews::{ListReviewsQuery, ReviewResponse},
            users::UserResponse,
        },
    },
    auth::permissions::{RequiresPermission, action},
    db::handlers::{
        Comments, Genres, Movies, People, Repository, Reviews, Users, comments::CommentFilter, movies::MovieFilter, people::PersonFilter,
        reviews::ReviewFilter, users::UserFilter,
    },
    errors::{Error, Result},
    types::Role,
};

const RECENT_LIMIT: i64 = 5;

/// Moderation dashboard
#[utoipa::path(
    get,
    path = "/admin/dashboard",
    tag = "admin",
    summary = "Moderation dashboard",
    description = "Site-wide counts plus the five most recent reviews and sign-ups. Requires the moderate action.",
    responses(
        (status = 200, description = "Dashboard", body = DashboardResponse),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
    ),
    security(
        ("CookieAuth" = []),
        ("X-Moodie-User" = [])
    )
)]
#[tracing::instrument(skip_all)]
pub async fn dashboard(State(state): State<AppState>, _: RequiresPermission<action::Moderate>) -> Result<Json<DashboardResponse>> {
    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;

    let everyone = UserFilter::default();
    let counts = DashboardCounts {
        movies: Movies::new(&mut conn).count(&MovieFilter::default()).await?,
        genres: Genres::new(&mut conn).count().await?,
        directors: People::directors(&mut conn).count(&PersonFilter::default()).await?,
        actors: People::actors(&mut conn).count(&PersonFilter::default()).await?,
        reviews: Reviews::new(&mut conn).count(&ReviewFilter::default()).await?,
        comments: Comments::new(&mut conn).count(&CommentFilter::default()).await?,
        users: Users::new(&mut conn).count(&everyone).await?,
        staff: Users::new(&mut conn).count(&everyone.clone().with_role(Role::Staff)).await?,
        superusers: Users::new(&mut conn).count(&everyone.clone().with_role(Role::Superuser)).await?,
    };

    let recent_reviews = Reviews::new(&mut conn).list(&ReviewFilter::new(0, RECENT_LIMIT)).await?;
    let recent_reviews = review_responses(&mut conn, recent_reviews).await?;
    let recent_users = Users::new(&mut conn)
        .recent(RECENT_LIMIT)
        .await?
        .into_iter()
        .map(UserResponse::from)
        .collect();

    Ok(Json(DashboardResponse {
        counts,
        recent_reviews,
        recent_users,
    }))
}

/// All reviews, for moderation
#[utoipa::path(
    get,
    path = "/admin/reviews",
    tag = "admin",
    summary = "List all reviews",
    description = "Newest first, optionally narrowed to one movie or one author. Requires the moderate action.",
    params(ListReviewsQuery),
    responses(
        (status = 200, description = "Paginated list of reviews", body = PaginatedResponse<ReviewResponse>),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
    ),
    security(
        ("CookieAuth" = []),
        ("X-Moodie-User" = [])
    )
)]
#[tracing::instrument(skip_all)]
pub async fn list_reviews(
    State(state): State<AppState>,
    Query(query): Query<ListReviewsQuery>,
    _: RequiresPermission<action::Moderate>,
) -> Result<Json<PaginatedResponse<ReviewResponse>>> {
    let mut filter = ReviewFilter::new(query.pagination.skip(), query.pagination.limit());
    if let Some(movie_id) = query.movie_id {
        filter = filter.for_movie(movie_id);
    }
    if let Some(user_id) = query.user_id {
        filter = filter.by_user(user_id);
    }

    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = Reviews::new(&mut conn);
    let reviews = repo.list(&filter).await?;
    let total_count = repo.count(&filter).await?;

    let data = review_responses(&mut conn, reviews).await?;
    Ok(Json(PaginatedResponse::new(data, total_count, filter.skip, filter.limit)))
}
