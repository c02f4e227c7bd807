//! Feed and profile page handlers.

use axum::{
    Extension,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};

use crate::{
    application::{
        error::HttpError,
        feed::FeedError,
        follows::FollowError,
        pagination::parse_page_param,
        profiles::ProfileError,
        repos::RepoError,
    },
    domain::format_human_date,
    presentation::views::{
        FollowTemplate, GroupTemplate, GroupView, IndexTemplate, PageChrome, PaginationView,
        ProfileHeaderView, ProfileTemplate, post_cards, render_not_found_response,
        render_template_response,
    },
};

use super::{AuthSession, HttpState, PageQuery, chrome_for, login_redirect};

pub(crate) fn repo_error_response(source: &'static str, err: RepoError) -> Response {
    HttpError::from_error(
        source,
        StatusCode::INTERNAL_SERVER_ERROR,
        "Service failure",
        &err,
    )
    .into_response()
}

fn feed_error_response(err: FeedError, chrome: PageChrome) -> Response {
    match err {
        FeedError::UnknownGroup { .. } | FeedError::UnknownAuthor { .. } => {
            render_not_found_response(chrome)
        }
        FeedError::Repo(err) => repo_error_response("infra::http::feeds", err),
    }
}

pub(crate) async fn index(
    State(state): State<HttpState>,
    Extension(session): Extension<AuthSession>,
    Query(query): Query<PageQuery>,
) -> Response {
    let requested = parse_page_param(query.page.as_deref());
    match state.feed.global(requested).await {
        Ok(page) => render_template_response(
            IndexTemplate {
                chrome: chrome_for(&session),
                posts: post_cards(&page.items),
                pagination: PaginationView::from_meta(&page.meta, "/"),
            },
            StatusCode::OK,
        ),
        Err(err) => feed_error_response(err, chrome_for(&session)),
    }
}

pub(crate) async fn group_feed(
    State(state): State<HttpState>,
    Extension(session): Extension<AuthSession>,
    Path(slug): Path<String>,
    Query(query): Query<PageQuery>,
) -> Response {
    let requested = parse_page_param(query.page.as_deref());
    match state.feed.group(&slug, requested).await {
        Ok((group, page)) => render_template_response(
            GroupTemplate {
                chrome: chrome_for(&session),
                group: GroupView::from(&group),
                posts: post_cards(&page.items),
                pagination: PaginationView::from_meta(&page.meta, &format!("/group/{slug}/")),
            },
            StatusCode::OK,
        ),
        Err(err) => feed_error_response(err, chrome_for(&session)),
    }
}

pub(crate) async fn follow_feed(
    State(state): State<HttpState>,
    Extension(session): Extension<AuthSession>,
    Query(query): Query<PageQuery>,
) -> Response {
    let Some(viewer) = session.viewer.clone() else {
        return login_redirect("/follow/");
    };

    let requested = parse_page_param(query.page.as_deref());
    match state.feed.following(viewer.id, requested).await {
        Ok(page) => render_template_response(
            FollowTemplate {
                chrome: chrome_for(&session),
                posts: post_cards(&page.items),
                pagination: PaginationView::from_meta(&page.meta, "/follow/"),
            },
            StatusCode::OK,
        ),
        Err(err) => feed_error_response(err, chrome_for(&session)),
    }
}

pub(crate) async fn profile(
    State(state): State<HttpState>,
    Extension(session): Extension<AuthSession>,
    Path(username): Path<String>,
    Query(query): Query<PageQuery>,
) -> Response {
    let context = match state.profiles.context(&username, session.viewer.as_ref()).await {
        Ok(context) => context,
        Err(ProfileError::UnknownAuthor { .. }) => {
            return render_not_found_response(chrome_for(&session));
        }
        Err(ProfileError::Repo(err)) => {
            return repo_error_response("infra::http::feeds::profile", err);
        }
    };

    let requested = parse_page_param(query.page.as_deref());
    let page = match state.feed.author(&username, requested).await {
        Ok((_, page)) => page,
        Err(err) => return feed_error_response(err, chrome_for(&session)),
    };

    render_template_response(
        ProfileTemplate {
            chrome: chrome_for(&session),
            profile: ProfileHeaderView {
                username: context.author.username.clone(),
                joined_human: format_human_date(context.author.joined_at.date()),
                post_count: context.stats.post_count,
                follower_count: context.stats.follower_count,
                following_count: context.stats.following_count,
                groups: context.groups.iter().map(GroupView::from).collect(),
                viewer_follows: context.viewer_follows,
                viewer_is_author: context.viewer_is_author,
            },
            group_filter: None,
            posts: post_cards(&page.items),
            pagination: PaginationView::from_meta(&page.meta, &format!("/{username}/")),
        },
        StatusCode::OK,
    )
}

/// An author's posts narrowed to one group, shown on the profile layout.
pub(crate) async fn author_group_feed(
    state: HttpState,
    session: AuthSession,
    username: String,
    slug: String,
    requested: Option<u64>,
) -> Response {
    let context = match state.profiles.context(&username, session.viewer.as_ref()).await {
        Ok(context) => context,
        Err(ProfileError::UnknownAuthor { .. }) => {
            return render_not_found_response(chrome_for(&session));
        }
        Err(ProfileError::Repo(err)) => {
            return repo_error_response("infra::http::feeds::author_group", err);
        }
    };

    match state.feed.author_group(&username, &slug, requested).await {
        Ok((_, group, page)) => render_template_response(
            ProfileTemplate {
                chrome: chrome_for(&session),
                profile: ProfileHeaderView {
                    username: context.author.username.clone(),
                    joined_human: format_human_date(context.author.joined_at.date()),
                    post_count: context.stats.post_count,
                    follower_count: context.stats.follower_count,
                    following_count: context.stats.following_count,
                    groups: context.groups.iter().map(GroupView::from).collect(),
                    viewer_follows: context.viewer_follows,
                    viewer_is_author: context.viewer_is_author,
                },
                group_filter: Some(GroupView::from(&group)),
                posts: post_cards(&page.items),
                pagination: PaginationView::from_meta(
                    &page.meta,
                    &format!("/{username}/{slug}/"),
                ),
            },
            StatusCode::OK,
        ),
        Err(err) => feed_error_response(err, chrome_for(&session)),
    }
}

pub(crate) async fn follow_author(
    State(state): State<HttpState>,
    Extension(session): Extension<AuthSession>,
    Path(username): Path<String>,
) -> Response {
    let Some(viewer) = session.viewer.clone() else {
        return login_redirect(&format!("/{username}/follow"));
    };

    match state.follows.follow(&viewer, &username).await {
        Ok(()) => Redirect::to(&format!("/{username}/")).into_response(),
        Err(FollowError::UnknownAuthor { .. }) => render_not_found_response(chrome_for(&session)),
        Err(FollowError::Repo(err)) => {
            repo_error_response("infra::http::feeds::follow_author", err)
        }
    }
}

pub(crate) async fn unfollow_author(
    State(state): State<HttpState>,
    Extension(session): Extension<AuthSession>,
    Path(username): Path<String>,
) -> Response {
    let Some(viewer) = session.viewer.clone() else {
        return login_redirect(&format!("/{username}/unfollow"));
    };

    match state.follows.unfollow(&viewer, &username).await {
        Ok(()) => Redirect::to(&format!("/{username}/")).into_response(),
        Err(FollowError::UnknownAuthor { .. }) => render_not_found_response(chrome_for(&session)),
        Err(FollowError::Repo(err)) => {
            repo_error_response("infra::http::feeds::unfollow_author", err)
        }
    }
}
