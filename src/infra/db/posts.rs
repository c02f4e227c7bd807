use async_trait::async_trait;
use sqlx::{Postgres, QueryBuilder, query_as};
use time::OffsetDateTime;

use crate::application::pagination::PageSlice;
use crate::application::repos::{
    NewPostParams, PostListScope, PostsRepo, PostsWriteRepo, RepoError, UpdatePostParams,
};
use crate::domain::entities::PostRecord;

use super::{PostgresRepositories, map_sqlx_error};

#[derive(sqlx::FromRow)]
struct PostRow {
    id: i64,
    author_id: i64,
    author_username: String,
    group_id: Option<i64>,
    group_slug: Option<String>,
    group_title: Option<String>,
    text: String,
    image: Option<String>,
    published_at: OffsetDateTime,
    comment_count: i64,
}

impl From<PostRow> for PostRecord {
    fn from(row: PostRow) -> Self {
        Self {
            id: row.id,
            author_id: row.author_id,
            author_username: row.author_username,
            group_id: row.group_id,
            group_slug: row.group_slug,
            group_title: row.group_title,
            text: row.text,
            image: row.image,
            published_at: row.published_at,
            comment_count: row.comment_count,
        }
    }
}

const SELECT_POST: &str = "SELECT p.id, p.author_id, u.username AS author_username, \
     p.group_id, g.slug AS group_slug, g.title AS group_title, \
     p.text, p.image, p.published_at, \
     (SELECT COUNT(*) FROM comments c WHERE c.post_id = p.id) AS comment_count \
     FROM posts p \
     JOIN users u ON u.id = p.author_id \
     LEFT JOIN post_groups g ON g.id = p.group_id";

fn apply_scope_conditions(qb: &mut QueryBuilder<'_, Postgres>, scope: PostListScope) {
    match scope {
        PostListScope::Global => {}
        PostListScope::Group { group_id } => {
            qb.push(" AND p.group_id = ");
            qb.push_bind(group_id);
        }
        PostListScope::Author { author_id } => {
            qb.push(" AND p.author_id = ");
            qb.push_bind(author_id);
        }
        PostListScope::FollowedBy { viewer_id } => {
            qb.push(
                " AND p.author_id IN (SELECT author_id FROM follows WHERE follower_id = ",
            );
            qb.push_bind(viewer_id);
            qb.push(")");
        }
    }
}

#[async_trait]
impl PostsRepo for PostgresRepositories {
    async fn list_posts(
        &self,
        scope: PostListScope,
        slice: PageSlice,
    ) -> Result<Vec<PostRecord>, RepoError> {
        let mut qb = QueryBuilder::new(SELECT_POST);
        qb.push(" WHERE 1=1 ");
        apply_scope_conditions(&mut qb, scope);
        qb.push(" ORDER BY p.published_at DESC, p.id DESC ");
        qb.push(" LIMIT ");
        qb.push_bind(i64::from(slice.limit));
        qb.push(" OFFSET ");
        qb.push_bind(slice.offset as i64);

        let rows = qb
            .build_query_as::<PostRow>()
            .fetch_all(self.pool())
            .await
            .map_err(map_sqlx_error)?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn count_posts(&self, scope: PostListScope) -> Result<u64, RepoError> {
        let mut qb = QueryBuilder::new("SELECT COUNT(*) FROM posts p WHERE 1=1 ");
        apply_scope_conditions(&mut qb, scope);

        let count = qb
            .build_query_scalar::<i64>()
            .fetch_one(self.pool())
            .await
            .map_err(map_sqlx_error)?;
        Self::convert_count(count)
    }

    async fn list_author_posts(&self, author_id: i64) -> Result<Vec<PostRecord>, RepoError> {
        let rows = query_as::<_, PostRow>(&format!(
            "{SELECT_POST} WHERE p.author_id = $1 ORDER BY p.published_at DESC, p.id DESC"
        ))
        .bind(author_id)
        .fetch_all(self.pool())
        .await
        .map_err(map_sqlx_error)?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn find_post(&self, id: i64) -> Result<Option<PostRecord>, RepoError> {
        let row = query_as::<_, PostRow>(&format!("{SELECT_POST} WHERE p.id = $1"))
            .bind(id)
            .fetch_optional(self.pool())
            .await
            .map_err(map_sqlx_error)?;
        Ok(row.map(Into::into))
    }
}

#[async_trait]
impl PostsWriteRepo for PostgresRepositories {
    async fn create_post(&self, params: NewPostParams) -> Result<PostRecord, RepoError> {
        let id = sqlx::query_scalar::<_, i64>(
            "INSERT INTO posts (author_id, text, group_id, image) \
             VALUES ($1, $2, $3, $4) RETURNING id",
        )
        .bind(params.author_id)
        .bind(&params.text)
        .bind(params.group_id)
        .bind(&params.image)
        .fetch_one(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        self.find_post(id).await?.ok_or(RepoError::NotFound)
    }

    async fn update_post(&self, params: UpdatePostParams) -> Result<PostRecord, RepoError> {
        let updated = sqlx::query(
            "UPDATE posts SET author_id = $2, text = $3, group_id = $4, image = $5 \
             WHERE id = $1",
        )
        .bind(params.id)
        .bind(params.author_id)
        .bind(&params.text)
        .bind(params.group_id)
        .bind(&params.image)
        .execute(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        if updated.rows_affected() == 0 {
            return Err(RepoError::NotFound);
        }
        self.find_post(params.id).await?.ok_or(RepoError::NotFound)
    }
}
