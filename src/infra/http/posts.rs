//! Post creation, editing, detail, and comment handlers.

use axum::{
    Extension,
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;

use crate::{
    application::{
        error::HttpError,
        pagination::parse_page_param,
        posts::{ImageUpload, PostError, PostInput},
    },
    presentation::views::{
        CommentView, GroupView, PostCardView, PostFormTemplate, PostFormView, PostTemplate,
        render_not_found_response, render_template_response,
    },
};

use super::{
    AuthSession, HttpState, PageQuery, chrome_for,
    feeds::{author_group_feed, repo_error_response},
    login_redirect,
};

const SOURCE: &str = "infra::http::posts";

async fn read_post_input(mut multipart: Multipart) -> Result<PostInput, HttpError> {
    let mut input = PostInput::default();

    while let Some(field) = multipart.next_field().await.map_err(|err| {
        HttpError::from_error(
            SOURCE,
            StatusCode::BAD_REQUEST,
            "Malformed form submission",
            &err,
        )
    })? {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("text") => {
                input.text = field.text().await.map_err(|err| {
                    HttpError::from_error(
                        SOURCE,
                        StatusCode::BAD_REQUEST,
                        "Malformed form submission",
                        &err,
                    )
                })?;
            }
            Some("group") => {
                let value = field.text().await.map_err(|err| {
                    HttpError::from_error(
                        SOURCE,
                        StatusCode::BAD_REQUEST,
                        "Malformed form submission",
                        &err,
                    )
                })?;
                input.group_slug = (!value.is_empty()).then_some(value);
            }
            Some("image") => {
                let filename = field.file_name().map(str::to_string);
                let content_type = field.content_type().map(str::to_string);
                let bytes = field.bytes().await.map_err(|err| {
                    HttpError::from_error(
                        SOURCE,
                        StatusCode::BAD_REQUEST,
                        "Malformed form submission",
                        &err,
                    )
                })?;
                // Browsers submit an empty part when no file was chosen.
                if let Some(filename) = filename.filter(|name| !name.is_empty()) {
                    if !bytes.is_empty() {
                        input.image = Some(ImageUpload {
                            filename,
                            content_type: content_type.unwrap_or_default(),
                            bytes,
                        });
                    }
                }
            }
            _ => {}
        }
    }

    Ok(input)
}

async fn form_view(
    state: &HttpState,
    heading: &str,
    submit_label: &str,
    action: String,
    input: &PostInput,
    errors: Vec<String>,
) -> Result<PostFormView, Response> {
    let groups = match state.posts.group_choices().await {
        Ok(groups) => groups.iter().map(GroupView::from).collect(),
        Err(PostError::Repo(err)) => return Err(repo_error_response(SOURCE, err)),
        Err(err) => {
            return Err(HttpError::from_error(
                SOURCE,
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to load groups",
                &err,
            )
            .into_response());
        }
    };

    Ok(PostFormView {
        heading: heading.to_string(),
        submit_label: submit_label.to_string(),
        action,
        text: input.text.clone(),
        group_slug: input.group_slug.clone().unwrap_or_default(),
        groups,
        errors,
    })
}

pub(crate) async fn new_form(
    State(state): State<HttpState>,
    Extension(session): Extension<AuthSession>,
) -> Response {
    if session.viewer.is_none() {
        return login_redirect("/new/");
    }

    match form_view(
        &state,
        "New post",
        "Publish",
        "/new/".to_string(),
        &PostInput::default(),
        Vec::new(),
    )
    .await
    {
        Ok(form) => render_template_response(
            PostFormTemplate {
                chrome: chrome_for(&session),
                form,
            },
            StatusCode::OK,
        ),
        Err(response) => response,
    }
}

pub(crate) async fn submit_new(
    State(state): State<HttpState>,
    Extension(session): Extension<AuthSession>,
    multipart: Multipart,
) -> Response {
    let Some(viewer) = session.viewer.clone() else {
        return login_redirect("/new/");
    };

    let input = match read_post_input(multipart).await {
        Ok(input) => input,
        Err(err) => return err.into_response(),
    };

    match state.posts.create_post(&viewer, input.clone()).await {
        Ok(_) => Redirect::to("/").into_response(),
        Err(PostError::Invalid(errors)) => {
            match form_view(&state, "New post", "Publish", "/new/".to_string(), &input, errors)
                .await
            {
                Ok(form) => render_template_response(
                    PostFormTemplate {
                        chrome: chrome_for(&session),
                        form,
                    },
                    StatusCode::OK,
                ),
                Err(response) => response,
            }
        }
        Err(PostError::Repo(err)) => repo_error_response(SOURCE, err),
        Err(err) => HttpError::from_error(
            SOURCE,
            StatusCode::INTERNAL_SERVER_ERROR,
            "Failed to create post",
            &err,
        )
        .into_response(),
    }
}

/// `/<username>/<segment>/` serves two pages: a numeric segment is a post
/// detail, anything else is treated as a group slug filtering the author's
/// posts.
pub(crate) async fn post_or_group(
    State(state): State<HttpState>,
    Extension(session): Extension<AuthSession>,
    Path((username, segment)): Path<(String, String)>,
    Query(query): Query<PageQuery>,
) -> Response {
    match segment.parse::<i64>() {
        Ok(post_id) => post_detail(state, session, username, post_id, Vec::new()).await,
        Err(_) => {
            let requested = parse_page_param(query.page.as_deref());
            author_group_feed(state, session, username, segment, requested).await
        }
    }
}

async fn post_detail(
    state: HttpState,
    session: AuthSession,
    username: String,
    post_id: i64,
    comment_errors: Vec<String>,
) -> Response {
    match state.posts.detail(&username, post_id).await {
        Ok((post, comments)) => render_template_response(
            PostTemplate {
                chrome: chrome_for(&session),
                post: PostCardView::from(&post),
                comments: comments.iter().map(CommentView::from).collect(),
                comment_errors,
            },
            StatusCode::OK,
        ),
        Err(PostError::NotFound) => render_not_found_response(chrome_for(&session)),
        Err(PostError::Repo(err)) => repo_error_response(SOURCE, err),
        Err(err) => HttpError::from_error(
            SOURCE,
            StatusCode::INTERNAL_SERVER_ERROR,
            "Failed to load post",
            &err,
        )
        .into_response(),
    }
}

pub(crate) async fn edit_form(
    State(state): State<HttpState>,
    Extension(session): Extension<AuthSession>,
    Path((username, post_id)): Path<(String, String)>,
) -> Response {
    let Ok(post_id) = post_id.parse::<i64>() else {
        return render_not_found_response(chrome_for(&session));
    };

    let post = match state.posts.edit_source(post_id).await {
        Ok(found) => found,
        Err(PostError::NotFound) => return render_not_found_response(chrome_for(&session)),
        Err(PostError::Repo(err)) => return repo_error_response(SOURCE, err),
        Err(err) => {
            return HttpError::from_error(
                SOURCE,
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to load post",
                &err,
            )
            .into_response();
        }
    };

    let input = PostInput {
        text: post.text.clone(),
        group_slug: post.group_slug.clone(),
        image: None,
    };

    match form_view(
        &state,
        "Edit post",
        "Save",
        format!("/{username}/{post_id}/edit/"),
        &input,
        Vec::new(),
    )
    .await
    {
        Ok(form) => render_template_response(
            PostFormTemplate {
                chrome: chrome_for(&session),
                form,
            },
            StatusCode::OK,
        ),
        Err(response) => response,
    }
}

pub(crate) async fn submit_edit(
    State(state): State<HttpState>,
    Extension(session): Extension<AuthSession>,
    Path((username, post_id)): Path<(String, String)>,
    multipart: Multipart,
) -> Response {
    // The path-identity gate runs before this handler; an anonymous request
    // never reaches it.
    let Some(viewer) = session.viewer.clone() else {
        return Redirect::to(&format!("/{username}/{post_id}/")).into_response();
    };

    let Ok(post_id) = post_id.parse::<i64>() else {
        return render_not_found_response(chrome_for(&session));
    };

    let input = match read_post_input(multipart).await {
        Ok(input) => input,
        Err(err) => return err.into_response(),
    };

    match state.posts.edit_post(post_id, &viewer, input.clone()).await {
        Ok(post) => {
            Redirect::to(&format!("/{}/{}/", post.author_username, post.id)).into_response()
        }
        Err(PostError::NotFound) => render_not_found_response(chrome_for(&session)),
        Err(PostError::Invalid(errors)) => {
            match form_view(
                &state,
                "Edit post",
                "Save",
                format!("/{username}/{post_id}/edit/"),
                &input,
                errors,
            )
            .await
            {
                Ok(form) => render_template_response(
                    PostFormTemplate {
                        chrome: chrome_for(&session),
                        form,
                    },
                    StatusCode::OK,
                ),
                Err(response) => response,
            }
        }
        Err(PostError::Repo(err)) => repo_error_response(SOURCE, err),
        Err(err) => HttpError::from_error(
            SOURCE,
            StatusCode::INTERNAL_SERVER_ERROR,
            "Failed to save post",
            &err,
        )
        .into_response(),
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct CommentForm {
    text: String,
}

pub(crate) async fn comment_get_redirect(
    Path((username, post_id)): Path<(String, String)>,
) -> Response {
    Redirect::to(&format!("/{username}/{post_id}/")).into_response()
}

pub(crate) async fn submit_comment(
    State(state): State<HttpState>,
    Extension(session): Extension<AuthSession>,
    Path((username, post_id)): Path<(String, String)>,
    axum::Form(form): axum::Form<CommentForm>,
) -> Response {
    let Some(viewer) = session.viewer.clone() else {
        return login_redirect(&format!("/{username}/{post_id}/comment/"));
    };

    let Ok(post_id) = post_id.parse::<i64>() else {
        return render_not_found_response(chrome_for(&session));
    };

    match state
        .posts
        .add_comment(&username, post_id, &viewer, &form.text)
        .await
    {
        Ok(_) => Redirect::to(&format!("/{username}/{post_id}/")).into_response(),
        Err(PostError::NotFound) => render_not_found_response(chrome_for(&session)),
        Err(PostError::Invalid(errors)) => {
            post_detail(state, session, username, post_id, errors).await
        }
        Err(PostError::Repo(err)) => repo_error_response(SOURCE, err),
        Err(err) => HttpError::from_error(
            SOURCE,
            StatusCode::INTERNAL_SERVER_ERROR,
            "Failed to add comment",
            &err,
        )
        .into_response(),
    }
}
