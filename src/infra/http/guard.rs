use axum::{
    RequestPartsExt,
    body::Body,
    extract::Path,
    http::Request,
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use tracing::debug;

use super::middleware::AuthSession;

/// Gate on the edit route. Compares the username in the path against the
/// signed-in viewer and bounces mismatches (and anonymous requests) to the
/// post detail page.
///
/// Note the comparison is against the path segment, not the post's stored
/// author, so an author whose post is reachable under someone else's
/// username would not be let through. The address and the account have to
/// agree.
pub async fn require_path_identity(request: Request<Body>, next: Next) -> Response {
    let (mut parts, body) = request.into_parts();

    let Ok(Path((username, post_id))) = parts.extract::<Path<(String, String)>>().await else {
        return Redirect::to("/").into_response();
    };

    let viewer_matches = parts
        .extensions
        .get::<AuthSession>()
        .and_then(|session| session.viewer.as_ref())
        .is_some_and(|viewer| viewer.username == username);

    if !viewer_matches {
        debug!(
            target = "yatube::http::guard",
            path_username = %username,
            post_id = %post_id,
            "edit request denied, redirecting to post detail"
        );
        return Redirect::to(&format!("/{username}/{post_id}/")).into_response();
    }

    next.run(Request::from_parts(parts, body)).await
}
