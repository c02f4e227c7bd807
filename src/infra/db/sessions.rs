use async_trait::async_trait;
use sqlx::{query, query_as};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::application::repos::{RepoError, SessionsRepo};
use crate::domain::entities::UserRecord;

use super::{PostgresRepositories, map_sqlx_error};

#[derive(sqlx::FromRow)]
struct SessionUserRow {
    id: i64,
    username: String,
    password_hash: String,
    joined_at: OffsetDateTime,
}

#[async_trait]
impl SessionsRepo for PostgresRepositories {
    async fn create_session(&self, user_id: i64, token: Uuid) -> Result<(), RepoError> {
        query("INSERT INTO sessions (token, user_id) VALUES ($1, $2)")
            .bind(token)
            .bind(user_id)
            .execute(self.pool())
            .await
            .map_err(map_sqlx_error)?;
        Ok(())
    }

    async fn find_user_by_token(&self, token: Uuid) -> Result<Option<UserRecord>, RepoError> {
        let row = query_as::<_, SessionUserRow>(
            "SELECT u.id, u.username, u.password_hash, u.joined_at \
             FROM sessions s JOIN users u ON u.id = s.user_id \
             WHERE s.token = $1",
        )
        .bind(token)
        .fetch_optional(self.pool())
        .await
        .map_err(map_sqlx_error)?;
        Ok(row.map(|row| UserRecord {
            id: row.id,
            username: row.username,
            password_hash: row.password_hash,
            joined_at: row.joined_at,
        }))
    }

    async fn delete_session(&self, token: Uuid) -> Result<(), RepoError> {
        query("DELETE FROM sessions WHERE token = $1")
            .bind(token)
            .execute(self.pool())
            .await
            .map_err(map_sqlx_error)?;
        Ok(())
    }
}
