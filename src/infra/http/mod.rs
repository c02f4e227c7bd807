mod auth;
mod feeds;
mod guard;
mod middleware;
mod posts;

pub use middleware::AuthSession;

use std::sync::Arc;

use axum::{
    Extension, Router,
    extract::{Path, State},
    http::{
        StatusCode,
        header::{CACHE_CONTROL, CONTENT_TYPE},
    },
    middleware as axum_middleware,
    response::{IntoResponse, Redirect, Response},
    routing::get,
};
use serde::Deserialize;
use sqlx::Error as SqlxError;

use crate::{
    application::{
        auth::AuthService,
        error::{ErrorReport, HttpError},
        feed::FeedService,
        follows::FollowService,
        posts::PostService,
        profiles::ProfileService,
    },
    cache::{CacheState, page_cache_layer},
    infra::{db::PostgresRepositories, uploads::UploadStorage},
    presentation::views::{PageChrome, render_not_found_response},
};

use guard::require_path_identity;
use middleware::{load_viewer, log_responses, set_request_context};

pub const SESSION_COOKIE: &str = "yatube_session";

#[derive(Clone)]
pub struct HttpState {
    pub feed: Arc<FeedService>,
    pub profiles: Arc<ProfileService>,
    pub posts: Arc<PostService>,
    pub follows: Arc<FollowService>,
    pub auth: Arc<AuthService>,
    /// Present when backed by Postgres; integration tests run on fakes.
    pub db: Option<Arc<PostgresRepositories>>,
    pub uploads: Arc<UploadStorage>,
    pub cache: Option<CacheState>,
}

pub fn build_router(state: HttpState) -> Router {
    // The global feed is the only response-cached route.
    let cached_routes = Router::new().route("/", get(feeds::index));
    let cached_routes = if let Some(cache_state) = state.cache.clone() {
        cached_routes.layer(axum_middleware::from_fn_with_state(
            cache_state,
            page_cache_layer,
        ))
    } else {
        cached_routes
    };

    let edit_routes = Router::new()
        .route(
            "/{username}/{post_id}/edit/",
            get(posts::edit_form).post(posts::submit_edit),
        )
        .layer(axum_middleware::from_fn(require_path_identity));

    cached_routes
        .merge(edit_routes)
        .route("/group/{slug}/", get(feeds::group_feed))
        .route("/follow/", get(feeds::follow_feed))
        .route("/new/", get(posts::new_form).post(posts::submit_new))
        .route(
            "/auth/signup/",
            get(auth::signup_form).post(auth::submit_signup),
        )
        .route(
            "/auth/login/",
            get(auth::login_form).post(auth::submit_login),
        )
        .route("/auth/logout/", get(auth::logout))
        .route("/media/{*path}", get(serve_media))
        .route("/_health/db", get(db_health))
        .route("/{username}/", get(feeds::profile))
        .route("/{username}/follow", get(feeds::follow_author))
        .route("/{username}/unfollow", get(feeds::unfollow_author))
        .route("/{username}/{post_id}/", get(posts::post_or_group))
        .route(
            "/{username}/{post_id}/comment/",
            get(posts::comment_get_redirect).post(posts::submit_comment),
        )
        .fallback(not_found)
        .with_state(state.clone())
        .layer(axum_middleware::from_fn(log_responses))
        .layer(axum_middleware::from_fn_with_state(state, load_viewer))
        .layer(axum_middleware::from_fn(set_request_context))
}

/// Raw `?page=` query. Kept as a string so garbage values fall back to the
/// first page instead of failing extraction.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(crate) struct PageQuery {
    pub page: Option<String>,
}

pub(crate) fn chrome_for(session: &AuthSession) -> PageChrome {
    PageChrome::for_viewer(session.viewer_username())
}

pub(crate) fn login_redirect(next: &str) -> Response {
    Redirect::to(&format!("/auth/login/?next={next}")).into_response()
}

async fn not_found(Extension(session): Extension<AuthSession>) -> Response {
    render_not_found_response(chrome_for(&session))
}

async fn serve_media(State(state): State<HttpState>, Path(path): Path<String>) -> Response {
    const SOURCE: &str = "infra::http::serve_media";

    match state.uploads.read(&path).await {
        Ok(Some((bytes, content_type))) => (
            StatusCode::OK,
            [
                (CONTENT_TYPE, content_type),
                (CACHE_CONTROL, "public, max-age=31536000, immutable".to_string()),
            ],
            bytes,
        )
            .into_response(),
        Ok(None) => HttpError::new(
            SOURCE,
            StatusCode::NOT_FOUND,
            "Media not found",
            format!("no stored file at `{path}`"),
        )
        .into_response(),
        Err(err) => HttpError::from_error(
            SOURCE,
            StatusCode::INTERNAL_SERVER_ERROR,
            "Failed to read media",
            &err,
        )
        .into_response(),
    }
}

async fn db_health(State(state): State<HttpState>) -> Response {
    match &state.db {
        Some(db) => db_health_response(db.health_check().await),
        None => StatusCode::NO_CONTENT.into_response(),
    }
}

fn db_health_response(result: Result<(), SqlxError>) -> Response {
    match result {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(err) => {
            let mut response = StatusCode::SERVICE_UNAVAILABLE.into_response();
            ErrorReport::from_error(
                "infra::http::db_health",
                StatusCode::SERVICE_UNAVAILABLE,
                &err,
            )
            .attach(&mut response);
            response
        }
    }
}
