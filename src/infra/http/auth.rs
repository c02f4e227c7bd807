//! Signup, login, and logout handlers.

use axum::{
    Extension, Form,
    extract::{Query, State},
    http::{StatusCode, header::SET_COOKIE},
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde::Deserialize;
use uuid::Uuid;

use crate::{
    application::auth::{AuthError, SignupInput},
    presentation::views::{LoginTemplate, SignupTemplate, render_template_response},
};

use super::{AuthSession, HttpState, SESSION_COOKIE, chrome_for, feeds::repo_error_response};

const SOURCE: &str = "infra::http::auth";

fn session_cookie(token: Uuid) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, token.to_string()))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .build()
}

fn removal_cookie() -> Cookie<'static> {
    let mut cookie = Cookie::build((SESSION_COOKIE, "")).path("/").build();
    cookie.make_removal();
    cookie
}

fn redirect_with_cookie(target: &str, cookie: Cookie<'static>) -> Response {
    let mut response = Redirect::to(target).into_response();
    if let Ok(value) = cookie.to_string().parse() {
        response.headers_mut().append(SET_COOKIE, value);
    }
    response
}

/// Only same-site paths are honored as post-login targets.
fn sanitize_next(next: Option<&str>) -> String {
    match next {
        Some(path) if path.starts_with('/') && !path.starts_with("//") => path.to_string(),
        _ => "/".to_string(),
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(crate) struct NextQuery {
    next: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct SignupForm {
    username: String,
    password1: String,
    password2: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct LoginForm {
    username: String,
    password: String,
    #[serde(default)]
    next: Option<String>,
}

pub(crate) async fn signup_form(Extension(session): Extension<AuthSession>) -> Response {
    render_template_response(
        SignupTemplate {
            chrome: chrome_for(&session),
            username: String::new(),
            errors: Vec::new(),
        },
        StatusCode::OK,
    )
}

pub(crate) async fn submit_signup(
    State(state): State<HttpState>,
    Extension(session): Extension<AuthSession>,
    Form(form): Form<SignupForm>,
) -> Response {
    let input = SignupInput {
        username: form.username.clone(),
        password1: form.password1,
        password2: form.password2,
    };

    match state.auth.signup(input).await {
        Ok(_) => Redirect::to("/auth/login/").into_response(),
        Err(AuthError::InvalidSignup(errors)) => render_template_response(
            SignupTemplate {
                chrome: chrome_for(&session),
                username: form.username,
                errors,
            },
            StatusCode::OK,
        ),
        Err(AuthError::UsernameTaken { username }) => render_template_response(
            SignupTemplate {
                chrome: chrome_for(&session),
                username: username.clone(),
                errors: vec![format!("username `{username}` is already taken")],
            },
            StatusCode::OK,
        ),
        Err(AuthError::Repo(err)) => repo_error_response(SOURCE, err),
        Err(AuthError::BadCredentials) => Redirect::to("/auth/login/").into_response(),
    }
}

pub(crate) async fn login_form(
    Extension(session): Extension<AuthSession>,
    Query(query): Query<NextQuery>,
) -> Response {
    render_template_response(
        LoginTemplate {
            chrome: chrome_for(&session),
            next: sanitize_next(query.next.as_deref()),
            error: None,
        },
        StatusCode::OK,
    )
}

pub(crate) async fn submit_login(
    State(state): State<HttpState>,
    Extension(session): Extension<AuthSession>,
    Form(form): Form<LoginForm>,
) -> Response {
    let next = sanitize_next(form.next.as_deref());

    match state.auth.login(&form.username, &form.password).await {
        Ok((_, token)) => redirect_with_cookie(&next, session_cookie(token)),
        Err(AuthError::BadCredentials) => render_template_response(
            LoginTemplate {
                chrome: chrome_for(&session),
                next,
                error: Some("Invalid username or password".to_string()),
            },
            StatusCode::OK,
        ),
        Err(AuthError::Repo(err)) => repo_error_response(SOURCE, err),
        Err(err) => render_template_response(
            LoginTemplate {
                chrome: chrome_for(&session),
                next,
                error: Some(err.to_string()),
            },
            StatusCode::OK,
        ),
    }
}

pub(crate) async fn logout(State(state): State<HttpState>, jar: CookieJar) -> Response {
    if let Some(token) = jar
        .get(SESSION_COOKIE)
        .and_then(|cookie| Uuid::parse_str(cookie.value()).ok())
    {
        if let Err(err) = state.auth.logout(token).await {
            tracing::warn!(
                target = "yatube::http::auth",
                error = %err,
                "failed to delete session on logout"
            );
        }
    }
    redirect_with_cookie("/", removal_cookie())
}

#[cfg(test)]
mod tests {
    use super::sanitize_next;

    #[test]
    fn next_must_be_a_local_path() {
        assert_eq!(sanitize_next(Some("/follow/")), "/follow/");
        assert_eq!(sanitize_next(Some("//evil.example")), "/");
        assert_eq!(sanitize_next(Some("https://evil.example")), "/");
        assert_eq!(sanitize_next(None), "/");
    }
}
