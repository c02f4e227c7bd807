//! Profile header assembly.

use std::sync::Arc;

use thiserror::Error;

use crate::application::repos::{
    FollowsRepo, GroupsRepo, PostListScope, PostsRepo, RepoError, UsersRepo,
};
use crate::domain::entities::{GroupRecord, ProfileStats, UserRecord};

#[derive(Debug, Error)]
pub enum ProfileError {
    #[error("unknown author `{username}`")]
    UnknownAuthor { username: String },
    #[error(transparent)]
    Repo(#[from] RepoError),
}

/// Everything the profile page shows besides the post list itself.
#[derive(Debug, Clone)]
pub struct ProfileContext {
    pub author: UserRecord,
    pub stats: ProfileStats,
    pub groups: Vec<GroupRecord>,
    pub viewer_follows: bool,
    pub viewer_is_author: bool,
}

#[derive(Clone)]
pub struct ProfileService {
    users: Arc<dyn UsersRepo>,
    posts: Arc<dyn PostsRepo>,
    groups: Arc<dyn GroupsRepo>,
    follows: Arc<dyn FollowsRepo>,
}

impl ProfileService {
    pub fn new(
        users: Arc<dyn UsersRepo>,
        posts: Arc<dyn PostsRepo>,
        groups: Arc<dyn GroupsRepo>,
        follows: Arc<dyn FollowsRepo>,
    ) -> Self {
        Self {
            users,
            posts,
            groups,
            follows,
        }
    }

    pub async fn context(
        &self,
        username: &str,
        viewer: Option<&UserRecord>,
    ) -> Result<ProfileContext, ProfileError> {
        let author = self
            .users
            .find_by_username(username)
            .await?
            .ok_or_else(|| ProfileError::UnknownAuthor {
                username: username.to_string(),
            })?;

        let post_count = self
            .posts
            .count_posts(PostListScope::Author { author_id: author.id })
            .await?;
        let follower_count = self.follows.follower_count(author.id).await?;
        let following_count = self.follows.following_count(author.id).await?;
        let groups = self.groups.list_for_author(author.id).await?;

        let viewer_is_author = viewer.is_some_and(|v| v.id == author.id);
        let viewer_follows = match viewer {
            Some(v) if v.id != author.id => self.follows.edge_exists(v.id, author.id).await?,
            _ => false,
        };

        Ok(ProfileContext {
            author,
            stats: ProfileStats {
                post_count,
                follower_count,
                following_count,
            },
            groups,
            viewer_follows,
            viewer_is_author,
        })
    }
}
