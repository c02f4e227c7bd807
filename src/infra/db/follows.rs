use async_trait::async_trait;
use sqlx::{query, query_scalar};

use crate::application::repos::{FollowsRepo, RepoError};

use super::{PostgresRepositories, map_sqlx_error};

#[async_trait]
impl FollowsRepo for PostgresRepositories {
    async fn insert_edge(&self, follower_id: i64, author_id: i64) -> Result<bool, RepoError> {
        // The unique constraint absorbs concurrent duplicate inserts.
        let result = query(
            "INSERT INTO follows (follower_id, author_id) VALUES ($1, $2) \
             ON CONFLICT (follower_id, author_id) DO NOTHING",
        )
        .bind(follower_id)
        .bind(author_id)
        .execute(self.pool())
        .await
        .map_err(map_sqlx_error)?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_edge(&self, follower_id: i64, author_id: i64) -> Result<bool, RepoError> {
        let result = query("DELETE FROM follows WHERE follower_id = $1 AND author_id = $2")
            .bind(follower_id)
            .bind(author_id)
            .execute(self.pool())
            .await
            .map_err(map_sqlx_error)?;
        Ok(result.rows_affected() > 0)
    }

    async fn edge_exists(&self, follower_id: i64, author_id: i64) -> Result<bool, RepoError> {
        let exists = query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM follows WHERE follower_id = $1 AND author_id = $2)",
        )
        .bind(follower_id)
        .bind(author_id)
        .fetch_one(self.pool())
        .await
        .map_err(map_sqlx_error)?;
        Ok(exists)
    }

    async fn follower_count(&self, author_id: i64) -> Result<u64, RepoError> {
        let count = query_scalar::<_, i64>("SELECT COUNT(*) FROM follows WHERE author_id = $1")
            .bind(author_id)
            .fetch_one(self.pool())
            .await
            .map_err(map_sqlx_error)?;
        Self::convert_count(count)
    }

    async fn following_count(&self, user_id: i64) -> Result<u64, RepoError> {
        let count = query_scalar::<_, i64>("SELECT COUNT(*) FROM follows WHERE follower_id = $1")
            .bind(user_id)
            .fetch_one(self.pool())
            .await
            .map_err(map_sqlx_error)?;
        Self::convert_count(count)
    }
}
