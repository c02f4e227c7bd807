//! Post creation, editing, detail assembly, and comments.

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;

use crate::application::repos::{
    CommentsRepo, GroupsRepo, NewPostParams, PostsRepo, PostsWriteRepo, RepoError,
    UpdatePostParams,
};
use crate::domain::entities::{CommentRecord, GroupRecord, PostRecord, UserRecord};

#[derive(Debug, Error)]
pub enum PostError {
    #[error("post not found")]
    NotFound,
    #[error("submission rejected: {}", .0.join("; "))]
    Invalid(Vec<String>),
    #[error("upload storage failed: {0}")]
    Storage(String),
    #[error(transparent)]
    Repo(#[from] RepoError),
}

/// Where accepted image uploads land. The filesystem adapter lives in the
/// infra layer; tests substitute an in-memory store.
#[async_trait]
pub trait UploadStore: Send + Sync {
    /// Persist the bytes and return the relative media path to record on the
    /// post.
    async fn store(&self, filename: &str, bytes: Bytes) -> Result<String, String>;
}

/// A submitted post form before validation. `image` carries the multipart
/// file part when one was attached.
#[derive(Debug, Clone, Default)]
pub struct PostInput {
    pub text: String,
    pub group_slug: Option<String>,
    pub image: Option<ImageUpload>,
}

#[derive(Debug, Clone)]
pub struct ImageUpload {
    pub filename: String,
    pub content_type: String,
    pub bytes: Bytes,
}

impl ImageUpload {
    /// Both the declared content type and the filename extension must look
    /// like an image; either failing rejects the whole submission.
    fn validate(&self) -> Result<(), String> {
        if !self.content_type.starts_with("image/") {
            return Err(format!(
                "attached file has content type `{}`, expected an image",
                self.content_type
            ));
        }
        let guessed = mime_guess::from_path(&self.filename).first();
        match guessed {
            Some(mime) if mime.type_() == mime_guess::mime::IMAGE => Ok(()),
            _ => Err(format!(
                "attached file `{}` does not have an image extension",
                self.filename
            )),
        }
    }
}

#[derive(Clone)]
pub struct PostService {
    posts: Arc<dyn PostsRepo>,
    posts_write: Arc<dyn PostsWriteRepo>,
    groups: Arc<dyn GroupsRepo>,
    comments: Arc<dyn CommentsRepo>,
    uploads: Arc<dyn UploadStore>,
}

impl PostService {
    pub fn new(
        posts: Arc<dyn PostsRepo>,
        posts_write: Arc<dyn PostsWriteRepo>,
        groups: Arc<dyn GroupsRepo>,
        comments: Arc<dyn CommentsRepo>,
        uploads: Arc<dyn UploadStore>,
    ) -> Self {
        Self {
            posts,
            posts_write,
            groups,
            comments,
            uploads,
        }
    }

    pub async fn group_choices(&self) -> Result<Vec<GroupRecord>, PostError> {
        Ok(self.groups.list_all().await?)
    }

    /// Validate a submission and resolve its group slug. Nothing is persisted
    /// (no row, no file) unless every field passes.
    async fn check_input(&self, input: &PostInput) -> Result<Option<i64>, PostError> {
        let mut problems = Vec::new();

        if input.text.trim().is_empty() {
            problems.push("post text must not be empty".to_string());
        }

        let group_id = match input.group_slug.as_deref().filter(|s| !s.is_empty()) {
            Some(slug) => match self.groups.find_by_slug(slug).await? {
                Some(group) => Some(group.id),
                None => {
                    problems.push(format!("unknown group `{slug}`"));
                    None
                }
            },
            None => None,
        };

        if let Some(image) = &input.image {
            if let Err(problem) = image.validate() {
                problems.push(problem);
            }
        }

        if problems.is_empty() {
            Ok(group_id)
        } else {
            Err(PostError::Invalid(problems))
        }
    }

    async fn store_image(&self, image: Option<ImageUpload>) -> Result<Option<String>, PostError> {
        match image {
            Some(upload) => {
                let path = self
                    .uploads
                    .store(&upload.filename, upload.bytes)
                    .await
                    .map_err(PostError::Storage)?;
                Ok(Some(path))
            }
            None => Ok(None),
        }
    }

    pub async fn create_post(
        &self,
        author: &UserRecord,
        input: PostInput,
    ) -> Result<PostRecord, PostError> {
        let group_id = self.check_input(&input).await?;
        let image = self.store_image(input.image).await?;
        let record = self
            .posts_write
            .create_post(NewPostParams {
                author_id: author.id,
                text: input.text,
                group_id,
                image,
            })
            .await?;
        Ok(record)
    }

    /// Apply an edit. The stored author is re-stamped to the submitting
    /// editor and the publication timestamp stays as it was.
    pub async fn edit_post(
        &self,
        post_id: i64,
        editor: &UserRecord,
        input: PostInput,
    ) -> Result<PostRecord, PostError> {
        let existing = self
            .posts
            .find_post(post_id)
            .await?
            .ok_or(PostError::NotFound)?;

        let group_id = self.check_input(&input).await?;
        let image = match self.store_image(input.image).await? {
            Some(path) => Some(path),
            None => existing.image,
        };

        let record = self
            .posts_write
            .update_post(UpdatePostParams {
                id: post_id,
                author_id: editor.id,
                text: input.text,
                group_id,
                image,
            })
            .await?;
        Ok(record)
    }

    /// Load a post for the edit form. The edit gate has already matched the
    /// viewer against the URL, so the lookup is by id alone; like the submit
    /// path, the username segment is not checked against the stored author.
    pub async fn edit_source(&self, post_id: i64) -> Result<PostRecord, PostError> {
        self.posts
            .find_post(post_id)
            .await?
            .ok_or(PostError::NotFound)
    }

    /// Load a post addressed as `/<username>/<post_id>/`. The username in the
    /// path must match the post's author or the post does not exist at that
    /// address.
    pub async fn detail(
        &self,
        username: &str,
        post_id: i64,
    ) -> Result<(PostRecord, Vec<CommentRecord>), PostError> {
        let post = self
            .posts
            .find_post(post_id)
            .await?
            .filter(|post| post.author_username == username)
            .ok_or(PostError::NotFound)?;
        let comments = self.comments.list_for_post(post.id).await?;
        Ok((post, comments))
    }

    pub async fn add_comment(
        &self,
        username: &str,
        post_id: i64,
        author: &UserRecord,
        text: &str,
    ) -> Result<CommentRecord, PostError> {
        let (post, _) = self.detail(username, post_id).await?;
        if text.trim().is_empty() {
            return Err(PostError::Invalid(vec![
                "comment text must not be empty".to_string(),
            ]));
        }
        Ok(self
            .comments
            .create_comment(post.id, author.id, text)
            .await?)
    }
}
