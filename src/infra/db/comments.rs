use async_trait::async_trait;
use sqlx::query_as;
use time::OffsetDateTime;

use crate::application::repos::{CommentsRepo, RepoError};
use crate::domain::entities::CommentRecord;

use super::{PostgresRepositories, map_sqlx_error};

#[derive(sqlx::FromRow)]
struct CommentRow {
    id: i64,
    post_id: i64,
    author_id: i64,
    author_username: String,
    text: String,
    created_at: OffsetDateTime,
}

impl From<CommentRow> for CommentRecord {
    fn from(row: CommentRow) -> Self {
        Self {
            id: row.id,
            post_id: row.post_id,
            author_id: row.author_id,
            author_username: row.author_username,
            text: row.text,
            created_at: row.created_at,
        }
    }
}

const SELECT_COMMENT: &str = "SELECT c.id, c.post_id, c.author_id, \
     u.username AS author_username, c.text, c.created_at \
     FROM comments c JOIN users u ON u.id = c.author_id";

#[async_trait]
impl CommentsRepo for PostgresRepositories {
    async fn list_for_post(&self, post_id: i64) -> Result<Vec<CommentRecord>, RepoError> {
        let rows = query_as::<_, CommentRow>(&format!(
            "{SELECT_COMMENT} WHERE c.post_id = $1 ORDER BY c.created_at DESC, c.id DESC"
        ))
        .bind(post_id)
        .fetch_all(self.pool())
        .await
        .map_err(map_sqlx_error)?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn create_comment(
        &self,
        post_id: i64,
        author_id: i64,
        text: &str,
    ) -> Result<CommentRecord, RepoError> {
        let id = sqlx::query_scalar::<_, i64>(
            "INSERT INTO comments (post_id, author_id, text) VALUES ($1, $2, $3) RETURNING id",
        )
        .bind(post_id)
        .bind(author_id)
        .bind(text)
        .fetch_one(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        let row = query_as::<_, CommentRow>(&format!("{SELECT_COMMENT} WHERE c.id = $1"))
            .bind(id)
            .fetch_one(self.pool())
            .await
            .map_err(map_sqlx_error)?;
        Ok(row.into())
    }
}
