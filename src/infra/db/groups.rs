use async_trait::async_trait;
use sqlx::query_as;

use crate::application::repos::{GroupsRepo, RepoError};
use crate::domain::entities::GroupRecord;

use super::{PostgresRepositories, map_sqlx_error};

#[derive(sqlx::FromRow)]
struct GroupRow {
    id: i64,
    slug: String,
    title: String,
    description: String,
}

impl From<GroupRow> for GroupRecord {
    fn from(row: GroupRow) -> Self {
        Self {
            id: row.id,
            slug: row.slug,
            title: row.title,
            description: row.description,
        }
    }
}

#[async_trait]
impl GroupsRepo for PostgresRepositories {
    async fn find_by_slug(&self, slug: &str) -> Result<Option<GroupRecord>, RepoError> {
        let row = query_as::<_, GroupRow>(
            "SELECT id, slug, title, description FROM post_groups WHERE slug = $1",
        )
        .bind(slug)
        .fetch_optional(self.pool())
        .await
        .map_err(map_sqlx_error)?;
        Ok(row.map(Into::into))
    }

    async fn list_all(&self) -> Result<Vec<GroupRecord>, RepoError> {
        let rows = query_as::<_, GroupRow>(
            "SELECT id, slug, title, description FROM post_groups ORDER BY title",
        )
        .fetch_all(self.pool())
        .await
        .map_err(map_sqlx_error)?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn list_for_author(&self, author_id: i64) -> Result<Vec<GroupRecord>, RepoError> {
        let rows = query_as::<_, GroupRow>(
            "SELECT DISTINCT g.id, g.slug, g.title, g.description \
             FROM post_groups g JOIN posts p ON p.group_id = g.id \
             WHERE p.author_id = $1 ORDER BY g.title",
        )
        .bind(author_id)
        .fetch_all(self.pool())
        .await
        .map_err(map_sqlx_error)?;
        Ok(rows.into_iter().map(Into::into).collect())
    }
}
