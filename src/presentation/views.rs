use askama::{Error as AskamaError, Template};
use axum::{
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};
use thiserror::Error;

use crate::application::error::{ErrorReport, HttpError};
use crate::application::pagination::PageMeta;
use crate::domain::entities::{CommentRecord, GroupRecord, PostRecord};
use crate::domain::format_human_date;

#[derive(Debug, Error)]
#[error("{public_message}")]
pub struct TemplateRenderError {
    pub(crate) source: &'static str,
    pub(crate) public_message: &'static str,
    #[source]
    pub(crate) error: AskamaError,
}

impl TemplateRenderError {
    pub fn new(source: &'static str, public_message: &'static str, error: AskamaError) -> Self {
        Self {
            source,
            public_message,
            error,
        }
    }
}

impl From<TemplateRenderError> for HttpError {
    fn from(err: TemplateRenderError) -> Self {
        let TemplateRenderError {
            source,
            public_message,
            error,
        } = err;

        HttpError::from_error(
            source,
            StatusCode::INTERNAL_SERVER_ERROR,
            public_message,
            &error,
        )
    }
}

pub fn render_template<T: Template>(template: T) -> Result<Html<String>, HttpError> {
    template.render().map(Html).map_err(|err| {
        TemplateRenderError::new(
            "presentation::views::render_template",
            "Template rendering failed",
            err,
        )
        .into()
    })
}

pub fn render_template_response<T: Template>(template: T, status: StatusCode) -> Response {
    match render_template(template) {
        Ok(html) => (status, html).into_response(),
        Err(err) => err.into_response(),
    }
}

pub fn render_not_found_response(chrome: PageChrome) -> Response {
    let mut response = render_template_response(
        ErrorTemplate {
            chrome,
            title: "Page not found".to_string(),
            message: "The page you requested does not exist.".to_string(),
        },
        StatusCode::NOT_FOUND,
    );
    ErrorReport::from_message(
        "presentation::views::render_not_found_response",
        StatusCode::NOT_FOUND,
        "Resource not found",
    )
    .attach(&mut response);
    response
}

/// Layout chrome shared by every page: who is signed in, if anyone.
#[derive(Debug, Clone, Default)]
pub struct PageChrome {
    pub viewer_username: Option<String>,
}

impl PageChrome {
    pub fn for_viewer(viewer_username: Option<String>) -> Self {
        Self { viewer_username }
    }
}

#[derive(Debug, Clone)]
pub struct PostCardView {
    pub id: i64,
    pub author_username: String,
    pub group_slug: Option<String>,
    pub group_title: Option<String>,
    pub text: String,
    pub image: Option<String>,
    pub published_human: String,
    pub comment_count: i64,
}

impl From<&PostRecord> for PostCardView {
    fn from(record: &PostRecord) -> Self {
        Self {
            id: record.id,
            author_username: record.author_username.clone(),
            group_slug: record.group_slug.clone(),
            group_title: record.group_title.clone(),
            text: record.text.clone(),
            image: record.image.clone(),
            published_human: format_human_date(record.published_at.date()),
            comment_count: record.comment_count,
        }
    }
}

pub fn post_cards(records: &[PostRecord]) -> Vec<PostCardView> {
    records.iter().map(PostCardView::from).collect()
}

#[derive(Debug, Clone)]
pub struct PaginationView {
    pub current: u64,
    pub num_pages: u64,
    pub has_previous: bool,
    pub has_next: bool,
    pub previous: u64,
    pub next: u64,
    pub base_path: String,
}

impl PaginationView {
    pub fn from_meta(meta: &PageMeta, base_path: impl Into<String>) -> Self {
        Self {
            current: meta.number,
            num_pages: meta.num_pages,
            has_previous: meta.has_previous,
            has_next: meta.has_next,
            previous: meta.previous(),
            next: meta.next(),
            base_path: base_path.into(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct GroupView {
    pub slug: String,
    pub title: String,
    pub description: String,
}

impl From<&GroupRecord> for GroupView {
    fn from(record: &GroupRecord) -> Self {
        Self {
            slug: record.slug.clone(),
            title: record.title.clone(),
            description: record.description.clone(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ProfileHeaderView {
    pub username: String,
    pub joined_human: String,
    pub post_count: u64,
    pub follower_count: u64,
    pub following_count: u64,
    pub groups: Vec<GroupView>,
    pub viewer_follows: bool,
    pub viewer_is_author: bool,
}

#[derive(Debug, Clone)]
pub struct CommentView {
    pub author_username: String,
    pub text: String,
    pub created_human: String,
}

impl From<&CommentRecord> for CommentView {
    fn from(record: &CommentRecord) -> Self {
        Self {
            author_username: record.author_username.clone(),
            text: record.text.clone(),
            created_human: format_human_date(record.created_at.date()),
        }
    }
}

/// State of the post form after a submission attempt, so rejected input is
/// re-rendered instead of lost.
#[derive(Debug, Clone)]
pub struct PostFormView {
    pub heading: String,
    pub submit_label: String,
    pub action: String,
    pub text: String,
    pub group_slug: String,
    pub groups: Vec<GroupView>,
    pub errors: Vec<String>,
}

#[derive(Template)]
#[template(path = "index.html")]
pub struct IndexTemplate {
    pub chrome: PageChrome,
    pub posts: Vec<PostCardView>,
    pub pagination: PaginationView,
}

#[derive(Template)]
#[template(path = "group.html")]
pub struct GroupTemplate {
    pub chrome: PageChrome,
    pub group: GroupView,
    pub posts: Vec<PostCardView>,
    pub pagination: PaginationView,
}

#[derive(Template)]
#[template(path = "profile.html")]
pub struct ProfileTemplate {
    pub chrome: PageChrome,
    pub profile: ProfileHeaderView,
    pub group_filter: Option<GroupView>,
    pub posts: Vec<PostCardView>,
    pub pagination: PaginationView,
}

#[derive(Template)]
#[template(path = "post.html")]
pub struct PostTemplate {
    pub chrome: PageChrome,
    pub post: PostCardView,
    pub comments: Vec<CommentView>,
    pub comment_errors: Vec<String>,
}

#[derive(Template)]
#[template(path = "post_form.html")]
pub struct PostFormTemplate {
    pub chrome: PageChrome,
    pub form: PostFormView,
}

#[derive(Template)]
#[template(path = "follow.html")]
pub struct FollowTemplate {
    pub chrome: PageChrome,
    pub posts: Vec<PostCardView>,
    pub pagination: PaginationView,
}

#[derive(Template)]
#[template(path = "login.html")]
pub struct LoginTemplate {
    pub chrome: PageChrome,
    pub next: String,
    pub error: Option<String>,
}

#[derive(Template)]
#[template(path = "signup.html")]
pub struct SignupTemplate {
    pub chrome: PageChrome,
    pub username: String,
    pub errors: Vec<String>,
}

#[derive(Template)]
#[template(path = "error.html")]
pub struct ErrorTemplate {
    pub chrome: PageChrome,
    pub title: String,
    pub message: String,
}
