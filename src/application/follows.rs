//! Follow-graph mutations.

use std::sync::Arc;

use thiserror::Error;

use crate::application::repos::{FollowsRepo, RepoError, UsersRepo};
use crate::domain::entities::UserRecord;

#[derive(Debug, Error)]
pub enum FollowError {
    #[error("unknown author `{username}`")]
    UnknownAuthor { username: String },
    #[error(transparent)]
    Repo(#[from] RepoError),
}

/// Follow and unfollow are idempotent: a duplicate follow, an unfollow of a
/// non-existent edge, and a self-follow all succeed without changing the
/// graph.
#[derive(Clone)]
pub struct FollowService {
    users: Arc<dyn UsersRepo>,
    follows: Arc<dyn FollowsRepo>,
}

impl FollowService {
    pub fn new(users: Arc<dyn UsersRepo>, follows: Arc<dyn FollowsRepo>) -> Self {
        Self { users, follows }
    }

    pub async fn follow(&self, viewer: &UserRecord, username: &str) -> Result<(), FollowError> {
        let author = self.resolve(username).await?;
        if author.id == viewer.id {
            return Ok(());
        }
        self.follows.insert_edge(viewer.id, author.id).await?;
        Ok(())
    }

    pub async fn unfollow(&self, viewer: &UserRecord, username: &str) -> Result<(), FollowError> {
        let author = self.resolve(username).await?;
        self.follows.delete_edge(viewer.id, author.id).await?;
        Ok(())
    }

    pub async fn is_following(
        &self,
        viewer: &UserRecord,
        author: &UserRecord,
    ) -> Result<bool, FollowError> {
        Ok(self.follows.edge_exists(viewer.id, author.id).await?)
    }

    async fn resolve(&self, username: &str) -> Result<UserRecord, FollowError> {
        self.users
            .find_by_username(username)
            .await?
            .ok_or_else(|| FollowError::UnknownAuthor {
                username: username.to_string(),
            })
    }
}
