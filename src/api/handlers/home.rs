use axum::{Json, extract::State};
use chrono::NaiveDate;

use crate::{
    AppState,
    api::{
        handlers::movies::movie_responses,
        models::{dashboard::HomeResponse, movies::MIN_RELEASE_YEAR},
    },
    db::handlers::{Genres, Movies, Reviews, movies::MovieFilter, reviews::ReviewFilter},
    errors::{Error, Result},
};

const HOME_SECTION_SIZE: i64 = 6;

/// Home page
#[utoipa::path(
    get,
    path = "/home",
    tag = "home",
    summary = "Home page",
    description = "The six most recent releases, the six highest rated movies and catalogue totals.",
    responses(
        (status = 200, description = "Home page content", body = HomeResponse),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn home(State(state): State<AppState>) -> Result<Json<HomeResponse>> {
    // Every stored movie was released after this, so the home page's latest has no window
    let first_release = NaiveDate::from_ymd_opt(MIN_RELEASE_YEAR, 1, 1).ok_or_else(|| Error::Internal {
        operation: "build earliest release date".to_string(),
    })?;

    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;

    let mut movies = Movies::new(&mut conn);
    let latest = movies.latest(first_release, HOME_SECTION_SIZE).await?;
    let top_rated = movies.top_rated(HOME_SECTION_SIZE).await?;
    let total_movies = movies.count(&MovieFilter::default()).await?;

    let total_genres = Genres::new(&mut conn).count().await?;
    let total_reviews = Reviews::new(&mut conn).count(&ReviewFilter::default()).await?;

    Ok(Json(HomeResponse {
        latest: movie_responses(&mut conn, latest).await?,
        top_rated: movie_responses(&mut conn, top_rated).await?,
        total_movies,
        total_genres,
        total_reviews,
    }))
}

#[cfg(test)]
mod tests {
    use crate::api::models::dashboard::HomeResponse;
    use crate::test_utils::{create_test_app, create_test_config, create_test_movie, create_test_review, create_test_user};
    use crate::types::Role;
    use sqlx::SqlitePool;

    #[sqlx::test]
    #[test_log::test]
    async fn test_home_sections(pool: SqlitePool) {
        let (server, _) = create_test_app(pool.clone(), create_test_config()).await;
        let user = create_test_user(&pool, Role::User).await;
        for year in 1990..1998 {
            create_test_movie(&pool, &format!("Film {year}"), year).await;
        }
        let newest = create_test_movie(&pool, "Newest", 2001).await;
        create_test_review(&pool, newest.id, user.id, 8).await;

        let home: HomeResponse = server.get("/home").await.json();
        assert_eq!(home.latest.len(), 6);
        assert_eq!(home.latest[0].title, "Newest");
        assert_eq!(home.total_movies, 9);
        assert_eq!(home.total_genres, 1);
        assert_eq!(home.total_reviews, 1);
    }

    #[sqlx::test]
    async fn test_empty_home(pool: SqlitePool) {
        let (server, _) = create_test_app(pool, create_test_config()).await;

        let home: HomeResponse = server.get("/home").await.json();
        assert!(home.latest.is_empty());
        assert!(home.top_rated.is_empty());
        assert_eq!(home.total_movies, 0);
    }
}
