//! Feed assembly over the post repositories.

use std::sync::Arc;

use thiserror::Error;

use crate::application::pagination::{Page, Paginator, paginate_vec};
use crate::application::repos::{
    GroupsRepo, PostListScope, PostsRepo, RepoError, UsersRepo,
};
use crate::domain::entities::{GroupRecord, PostRecord, UserRecord};

#[derive(Debug, Error)]
pub enum FeedError {
    #[error("unknown group `{slug}`")]
    UnknownGroup { slug: String },
    #[error("unknown author `{username}`")]
    UnknownAuthor { username: String },
    #[error(transparent)]
    Repo(#[from] RepoError),
}

/// Builds paginated feed pages. Every feed is ordered newest first and every
/// page request outside the valid range is clamped rather than rejected.
#[derive(Clone)]
pub struct FeedService {
    posts: Arc<dyn PostsRepo>,
    groups: Arc<dyn GroupsRepo>,
    users: Arc<dyn UsersRepo>,
    page_size: u32,
}

impl FeedService {
    pub fn new(
        posts: Arc<dyn PostsRepo>,
        groups: Arc<dyn GroupsRepo>,
        users: Arc<dyn UsersRepo>,
        page_size: u32,
    ) -> Self {
        Self {
            posts,
            groups,
            users,
            page_size,
        }
    }

    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    async fn scoped_page(
        &self,
        scope: PostListScope,
        requested: Option<u64>,
    ) -> Result<Page<PostRecord>, FeedError> {
        let total = self.posts.count_posts(scope).await?;
        let paginator = Paginator::new(total, self.page_size);
        let page = paginator.clamp_page(requested);
        let items = self.posts.list_posts(scope, paginator.slice(page)).await?;
        Ok(Page {
            items,
            meta: paginator.meta(page),
        })
    }

    /// The global feed: every post from every author.
    pub async fn global(&self, requested: Option<u64>) -> Result<Page<PostRecord>, FeedError> {
        self.scoped_page(PostListScope::Global, requested).await
    }

    /// Posts attached to one group, resolved by slug.
    pub async fn group(
        &self,
        slug: &str,
        requested: Option<u64>,
    ) -> Result<(GroupRecord, Page<PostRecord>), FeedError> {
        let group = self
            .groups
            .find_by_slug(slug)
            .await?
            .ok_or_else(|| FeedError::UnknownGroup {
                slug: slug.to_string(),
            })?;
        let page = self
            .scoped_page(PostListScope::Group { group_id: group.id }, requested)
            .await?;
        Ok((group, page))
    }

    /// All posts by one author.
    pub async fn author(
        &self,
        username: &str,
        requested: Option<u64>,
    ) -> Result<(UserRecord, Page<PostRecord>), FeedError> {
        let author = self.resolve_author(username).await?;
        let page = self
            .scoped_page(PostListScope::Author { author_id: author.id }, requested)
            .await?;
        Ok((author, page))
    }

    /// One author's posts narrowed to one group. The author's full post list
    /// is loaded and filtered in memory before pagination, so the page count
    /// reflects the filtered set.
    pub async fn author_group(
        &self,
        username: &str,
        slug: &str,
        requested: Option<u64>,
    ) -> Result<(UserRecord, GroupRecord, Page<PostRecord>), FeedError> {
        let author = self.resolve_author(username).await?;
        let group = self
            .groups
            .find_by_slug(slug)
            .await?
            .ok_or_else(|| FeedError::UnknownGroup {
                slug: slug.to_string(),
            })?;
        let posts = self.posts.list_author_posts(author.id).await?;
        let filtered: Vec<PostRecord> = posts
            .into_iter()
            .filter(|post| post.group_id == Some(group.id))
            .collect();
        let page = paginate_vec(filtered, self.page_size, requested);
        Ok((author, group, page))
    }

    /// Posts by the authors the viewer follows.
    pub async fn following(
        &self,
        viewer_id: i64,
        requested: Option<u64>,
    ) -> Result<Page<PostRecord>, FeedError> {
        self.scoped_page(PostListScope::FollowedBy { viewer_id }, requested)
            .await
    }

    async fn resolve_author(&self, username: &str) -> Result<UserRecord, FeedError> {
        self.users
            .find_by_username(username)
            .await?
            .ok_or_else(|| FeedError::UnknownAuthor {
                username: username.to_string(),
            })
    }
}
