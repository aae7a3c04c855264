use async_trait::async_trait;
use sqlx::QueryBuilder;
use uuid::Uuid;

use crate::application::repos::{RepoError, TagsRepo};
use crate::domain::entities::TagRecord;

use super::PostgresRepositories;
use super::types::TagRow;
use crate::infra::db::map_sqlx_error;

#[async_trait]
impl TagsRepo for PostgresRepositories {
    async fn find_by_slug(&self, slug: &str) -> Result<Option<TagRecord>, RepoError> {
        let mut qb = QueryBuilder::new("SELECT id, slug, name FROM tags WHERE slug = ");
        qb.push_bind(slug);

        let row = qb
            .build_query_as::<TagRow>()
            .fetch_optional(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(row.map(TagRecord::from))
    }

    async fn list_for_post(&self, post_id: Uuid) -> Result<Vec<TagRecord>, RepoError> {
        let mut qb = QueryBuilder::new(
            "SELECT t.id, t.slug, t.name FROM tags t \
             INNER JOIN post_tags pt ON pt.tag_id = t.id \
             WHERE pt.post_id = ",
        );
        qb.push_bind(post_id);
        qb.push(" ORDER BY LOWER(t.name), t.slug ");

        let rows = qb
            .build_query_as::<TagRow>()
            .fetch_all(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(rows.into_iter().map(TagRecord::from).collect())
    }
}
