//! Repository traits describing persistence adapters.

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::application::pagination::PageSlice;
use crate::domain::entities::{CommentRecord, GroupRecord, PostRecord, UserRecord};

#[derive(Debug, Error)]
pub enum RepoError {
    #[error("persistence error: {0}")]
    Persistence(String),
    #[error("duplicate record violates unique constraint `{constraint}`")]
    Duplicate { constraint: String },
    #[error("resource not found")]
    NotFound,
}

impl RepoError {
    pub fn from_persistence(err: impl std::fmt::Display) -> Self {
        Self::Persistence(err.to_string())
    }
}

/// Which slice of the post table a feed read covers.
#[derive(Debug, Clone, Copy)]
pub enum PostListScope {
    Global,
    Group { group_id: i64 },
    Author { author_id: i64 },
    FollowedBy { viewer_id: i64 },
}

#[derive(Debug, Clone)]
pub struct NewPostParams {
    pub author_id: i64,
    pub text: String,
    pub group_id: Option<i64>,
    pub image: Option<String>,
}

/// Every submitted edit re-stamps `author_id` to the submitting viewer; the
/// publication timestamp is never touched.
#[derive(Debug, Clone)]
pub struct UpdatePostParams {
    pub id: i64,
    pub author_id: i64,
    pub text: String,
    pub group_id: Option<i64>,
    pub image: Option<String>,
}

#[async_trait]
pub trait UsersRepo: Send + Sync {
    async fn create_user(
        &self,
        username: &str,
        password_hash: &str,
    ) -> Result<UserRecord, RepoError>;

    async fn find_by_username(&self, username: &str) -> Result<Option<UserRecord>, RepoError>;

    async fn find_by_id(&self, id: i64) -> Result<Option<UserRecord>, RepoError>;
}

#[async_trait]
pub trait SessionsRepo: Send + Sync {
    async fn create_session(&self, user_id: i64, token: Uuid) -> Result<(), RepoError>;

    async fn find_user_by_token(&self, token: Uuid) -> Result<Option<UserRecord>, RepoError>;

    async fn delete_session(&self, token: Uuid) -> Result<(), RepoError>;
}

#[async_trait]
pub trait GroupsRepo: Send + Sync {
    async fn find_by_slug(&self, slug: &str) -> Result<Option<GroupRecord>, RepoError>;

    async fn list_all(&self) -> Result<Vec<GroupRecord>, RepoError>;

    /// Groups the author has at least one post in, for the profile header.
    async fn list_for_author(&self, author_id: i64) -> Result<Vec<GroupRecord>, RepoError>;
}

#[async_trait]
pub trait PostsRepo: Send + Sync {
    /// Posts within `scope`, newest first, annotated with comment counts.
    async fn list_posts(
        &self,
        scope: PostListScope,
        slice: PageSlice,
    ) -> Result<Vec<PostRecord>, RepoError>;

    async fn count_posts(&self, scope: PostListScope) -> Result<u64, RepoError>;

    /// The author's full post list, newest first. Used by the author-group
    /// feed, which filters by group in memory instead of issuing a joined
    /// query.
    async fn list_author_posts(&self, author_id: i64) -> Result<Vec<PostRecord>, RepoError>;

    async fn find_post(&self, id: i64) -> Result<Option<PostRecord>, RepoError>;
}

#[async_trait]
pub trait PostsWriteRepo: Send + Sync {
    async fn create_post(&self, params: NewPostParams) -> Result<PostRecord, RepoError>;

    async fn update_post(&self, params: UpdatePostParams) -> Result<PostRecord, RepoError>;
}

#[async_trait]
pub trait CommentsRepo: Send + Sync {
    /// Comments on a post, newest first.
    async fn list_for_post(&self, post_id: i64) -> Result<Vec<CommentRecord>, RepoError>;

    async fn create_comment(
        &self,
        post_id: i64,
        author_id: i64,
        text: &str,
    ) -> Result<CommentRecord, RepoError>;
}

#[async_trait]
pub trait FollowsRepo: Send + Sync {
    /// Insert the (follower, author) edge. Returns `false` when the edge was
    /// already present; duplicates are absorbed by the store, never an error.
    async fn insert_edge(&self, follower_id: i64, author_id: i64) -> Result<bool, RepoError>;

    /// Delete the edge. Returns `false` when there was nothing to delete.
    async fn delete_edge(&self, follower_id: i64, author_id: i64) -> Result<bool, RepoError>;

    async fn edge_exists(&self, follower_id: i64, author_id: i64) -> Result<bool, RepoError>;

    async fn follower_count(&self, author_id: i64) -> Result<u64, RepoError>;

    async fn following_count(&self, user_id: i64) -> Result<u64, RepoError>;
}
