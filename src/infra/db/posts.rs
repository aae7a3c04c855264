use async_trait::async_trait;
use sqlx::QueryBuilder;
use uuid::Uuid;

use crate::application::repos::{PostQueryFilter, PostsRepo, RepoError, SitemapEntryRecord};
use crate::domain::entities::PostRecord;
use crate::domain::posts::PublishedPath;

use super::PostgresRepositories;
use super::types::{PostRow, SitemapRow};
use crate::infra::db::map_sqlx_error;

const POST_COLUMNS: &str =
    "p.id, p.slug, p.title, p.author, p.body, p.status, p.published_at, p.created_at, p.updated_at";

#[async_trait]
impl PostsRepo for PostgresRepositories {
    async fn list_published(
        &self,
        filter: &PostQueryFilter,
        limit: u32,
        offset: u64,
    ) -> Result<Vec<PostRecord>, RepoError> {
        let mut qb = QueryBuilder::new(format!("SELECT {POST_COLUMNS} FROM posts p WHERE 1=1 "));
        Self::apply_public_conditions(&mut qb);
        Self::apply_tag_filter(&mut qb, filter);

        qb.push(" ORDER BY p.published_at DESC, p.id DESC LIMIT ");
        qb.push_bind(i64::from(limit.clamp(1, 100)));
        qb.push(" OFFSET ");
        qb.push_bind(i64::try_from(offset).unwrap_or(i64::MAX));

        let rows = qb
            .build_query_as::<PostRow>()
            .fetch_all(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(rows.into_iter().map(PostRecord::from).collect())
    }

    async fn count_published(&self, filter: &PostQueryFilter) -> Result<u64, RepoError> {
        let mut qb = QueryBuilder::new("SELECT COUNT(*) FROM posts p WHERE 1=1 ");
        Self::apply_public_conditions(&mut qb);
        Self::apply_tag_filter(&mut qb, filter);

        let count: i64 = qb
            .build_query_scalar()
            .fetch_one(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Self::convert_count(count)
    }

    async fn find_published_by_path(
        &self,
        path: &PublishedPath,
    ) -> Result<Option<PostRecord>, RepoError> {
        // A path naming an impossible calendar date cannot match any post.
        let Some((day_start, day_end)) = path.day_bounds() else {
            return Ok(None);
        };

        let mut qb = QueryBuilder::new(format!("SELECT {POST_COLUMNS} FROM posts p WHERE 1=1 "));
        Self::apply_public_conditions(&mut qb);
        qb.push(" AND p.slug = ");
        qb.push_bind(&path.slug);
        qb.push(" AND p.published_at >= ");
        qb.push_bind(day_start);
        qb.push(" AND p.published_at < ");
        qb.push_bind(day_end);
        qb.push(" LIMIT 1");

        let row = qb
            .build_query_as::<PostRow>()
            .fetch_optional(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(row.map(PostRecord::from))
    }

    async fn find_published_by_id(&self, id: Uuid) -> Result<Option<PostRecord>, RepoError> {
        let mut qb = QueryBuilder::new(format!("SELECT {POST_COLUMNS} FROM posts p WHERE 1=1 "));
        Self::apply_public_conditions(&mut qb);
        qb.push(" AND p.id = ");
        qb.push_bind(id);

        let row = qb
            .build_query_as::<PostRow>()
            .fetch_optional(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(row.map(PostRecord::from))
    }

    async fn list_related(&self, post_id: Uuid, limit: u32) -> Result<Vec<PostRecord>, RepoError> {
        let mut qb = QueryBuilder::new(format!(
            "SELECT {POST_COLUMNS}, COUNT(pt.tag_id) AS shared_tags \
             FROM posts p \
             INNER JOIN post_tags pt ON pt.post_id = p.id \
             WHERE pt.tag_id IN (SELECT tag_id FROM post_tags WHERE post_id = "
        ));
        qb.push_bind(post_id);
        qb.push(") AND p.id <> ");
        qb.push_bind(post_id);
        Self::apply_public_conditions(&mut qb);

        qb.push(" GROUP BY p.id ORDER BY shared_tags DESC, p.published_at DESC LIMIT ");
        qb.push_bind(i64::from(limit.clamp(1, 32)));

        let rows = qb
            .build_query_as::<PostRow>()
            .fetch_all(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(rows.into_iter().map(PostRecord::from).collect())
    }

    async fn list_sitemap_entries(&self) -> Result<Vec<SitemapEntryRecord>, RepoError> {
        let mut qb =
            QueryBuilder::new("SELECT p.slug, p.published_at FROM posts p WHERE 1=1 ");
        Self::apply_public_conditions(&mut qb);
        qb.push(" ORDER BY p.published_at DESC, p.id DESC ");

        let rows = qb
            .build_query_as::<SitemapRow>()
            .fetch_all(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(rows
            .into_iter()
            .map(|row| SitemapEntryRecord {
                slug: row.slug,
                published_at: row.published_at,
            })
            .collect())
    }
}
