//! OpenAPI documentation for the moodie API.
//!
//! Served as JSON at `/api-docs/openapi.json` and rendered with Scalar at `/docs`.

use utoipa::{
    Modify, OpenApi,
    openapi::security::{ApiKey, ApiKeyValue, SecurityScheme},
};

use crate::api;

/// Registers the two ways a caller can identify itself.
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.security_schemes.insert(
                "CookieAuth".to_string(),
                SecurityScheme::ApiKey(ApiKey::Cookie(ApiKeyValue::with_description(
                    "moodie_session",
                    "Session token set by `/authentication/login` and `/authentication/register`.",
                ))),
            );
            components.security_schemes.insert(
                "X-Moodie-User".to_string(),
                SecurityScheme::ApiKey(ApiKey::Header(ApiKeyValue::with_description(
                    "x-moodie-user",
                    "Email of a user authenticated by a trusted proxy. Only honoured when proxy header auth is enabled.",
                ))),
            );
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    info(
        title = "moodie",
        description = "Movies, reviews and watchlists. Browsing is open to everyone; writing needs an account, \
                       and moderation and catalogue management need a staff or superuser role."
    ),
    modifiers(&SecurityAddon),
    paths(
        api::handlers::auth::get_registration_info,
        api::handlers::auth::register,
        api::handlers::auth::get_login_info,
        api::handlers::auth::login,
        api::handlers::auth::logout,
        api::handlers::auth::change_password,
        api::handlers::users::list_users,
        api::handlers::users::get_user,
        api::handlers::users::update_user,
        api::handlers::users::update_user_role,
        api::handlers::users::delete_user,
        api::handlers::profiles::get_profile,
        api::handlers::profiles::update_profile,
        api::handlers::movies::list_movies,
        api::handlers::movies::get_movie,
        api::handlers::movies::latest_movies,
        api::handlers::movies::top_rated_movies,
        api::handlers::movies::classic_movies,
        api::handlers::movies::create_movie,
        api::handlers::movies::update_movie,
        api::handlers::movies::delete_movie,
        api::handlers::genres::list_genres,
        api::handlers::genres::get_genre,
        api::handlers::genres::create_genre,
        api::handlers::genres::update_genre,
        api::handlers::genres::delete_genre,
        api::handlers::people::list_directors,
        api::handlers::people::get_director,
        api::handlers::people::create_director,
        api::handlers::people::update_director,
        api::handlers::people::delete_director,
        api::handlers::people::list_actors,
        api::handlers::people::get_actor,
        api::handlers::people::create_actor,
        api::handlers::people::update_actor,
        api::handlers::people::delete_actor,
        api::handlers::reviews::list_movie_reviews,
        api::handlers::reviews::list_user_reviews,
        api::handlers::reviews::get_review,
        api::handlers::reviews::create_review,
        api::handlers::reviews::update_review,
        api::handlers::reviews::delete_review,
        api::handlers::comments::list_comments,
        api::handlers::comments::create_comment,
        api::handlers::comments::update_comment,
        api::handlers::comments::delete_comment,
        api::handlers::watchlist::get_watchlist,
        api::handlers::watchlist::add_to_watchlist,
        api::handlers::watchlist::remove_movie_from_watchlist,
        api::handlers::watchlist::delete_watchlist_entry,
        api::handlers::home::home,
        api::handlers::admin::dashboard,
        api::handlers::admin::list_reviews,
        api::handlers::permissions::check_permission,
    ),
    components(
        schemas(
            crate::types::Role,
            crate::types::ContentKind,
            api::models::auth::RegistrationInfo,
            api::models::auth::LoginInfo,
            api::models::auth::RegisterRequest,
            api::models::auth::LoginRequest,
            api::models::auth::AuthResponse,
            api::models::auth::AuthSuccessResponse,
            api::models::auth::ChangePasswordRequest,
            api::models::users::UserUpdate,
            api::models::users::RoleUpdate,
            api::models::users::UserResponse,
            api::models::users::UserSummary,
            api::models::profiles::ProfileUpdate,
            api::models::profiles::ProfileResponse,
            api::models::genres::GenreCreate,
            api::models::genres::GenreUpdate,
            api::models::genres::GenreResponse,
            api::models::genres::GenreDetailResponse,
            api::models::genres::GenreSummary,
            api::models::people::PersonCreate,
            api::models::people::PersonUpdate,
            api::models::people::PersonResponse,
            api::models::people::PersonDetailResponse,
            api::models::people::PersonSummary,
            api::models::movies::MovieCreate,
            api::models::movies::MovieUpdate,
            api::models::movies::MovieResponse,
            api::models::movies::MovieDetailResponse,
            api::models::reviews::ReviewCreate,
            api::models::reviews::ReviewUpdate,
            api::models::reviews::ReviewResponse,
            api::models::comments::CommentContent,
            api::models::comments::CommentResponse,
            api::models::watchlist::WatchlistEntryResponse,
            api::models::watchlist::WatchlistAddResponse,
            api::models::dashboard::HomeResponse,
            api::models::dashboard::DashboardCounts,
            api::models::dashboard::DashboardResponse,
            api::models::permissions::PermissionCheckResponse,
        )
    ),
    tags(
        (name = "authentication", description = "Registration, login and sessions"),
        (name = "users", description = "User accounts and roles"),
        (name = "profiles", description = "Public user profiles"),
        (name = "movies", description = "The movie catalogue"),
        (name = "genres", description = "Genres"),
        (name = "people", description = "Directors and actors"),
        (name = "reviews", description = "Movie reviews"),
        (name = "comments", description = "Comments on reviews"),
        (name = "watchlist", description = "Per-user watchlists"),
        (name = "home", description = "Landing page content"),
        (name = "admin", description = "Moderation"),
        (name = "permissions", description = "Permission queries"),
    )
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_secured_operation_uses_a_known_scheme() {
        let doc = ApiDoc::openapi();
        let schemes = &doc.components.as_ref().expect("components").security_schemes;
        assert!(schemes.contains_key("CookieAuth"));
        assert!(schemes.contains_key("X-Moodie-User"));

        let json = serde_json::to_value(&doc).expect("serialize openapi");
        let paths = json["paths"].as_object().expect("paths");
        assert!(paths.contains_key("/movies/{movie_id}"));
        assert!(paths.contains_key("/permissions/check"));
        assert!(!paths.keys().any(|p| p.starts_with("/admin/api")));
    }
}
