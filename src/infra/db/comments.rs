use async_trait::async_trait;
use sqlx::QueryBuilder;
use uuid::Uuid;

use crate::application::repos::{CommentsRepo, NewCommentParams, RepoError};
use crate::domain::entities::CommentRecord;

use super::PostgresRepositories;
use super::types::CommentRow;
use crate::infra::db::map_sqlx_error;

const COMMENT_COLUMNS: &str = "id, post_id, author_name, email, body, active, created_at";

#[async_trait]
impl CommentsRepo for PostgresRepositories {
    async fn list_active_for_post(&self, post_id: Uuid) -> Result<Vec<CommentRecord>, RepoError> {
        let mut qb = QueryBuilder::new(format!(
            "SELECT {COMMENT_COLUMNS} FROM comments WHERE active AND post_id = "
        ));
        qb.push_bind(post_id);
        qb.push(" ORDER BY created_at ASC, id ASC ");

        let rows = qb
            .build_query_as::<CommentRow>()
            .fetch_all(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(rows.into_iter().map(CommentRecord::from).collect())
    }

    async fn insert_comment(&self, params: NewCommentParams) -> Result<CommentRecord, RepoError> {
        let mut qb =
            QueryBuilder::new("INSERT INTO comments (post_id, author_name, email, body) VALUES (");
        let mut values = qb.separated(", ");
        values.push_bind(params.post_id);
        values.push_bind(params.author_name);
        values.push_bind(params.email);
        values.push_bind(params.body);
        qb.push(format!(") RETURNING {COMMENT_COLUMNS}"));

        let row = qb
            .build_query_as::<CommentRow>()
            .fetch_one(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(CommentRecord::from(row))
    }
}
