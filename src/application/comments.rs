//! Comment submission.

use std::sync::Arc;

use tracing::info;

use crate::application::repos::{CommentsRepo, NewCommentParams, RepoError};
use crate::domain::entities::{CommentRecord, PostRecord};

/// Validated comment input, produced by the HTTP form layer.
#[derive(Debug, Clone)]
pub struct CommentDraft {
    pub name: String,
    pub email: String,
    pub body: String,
}

#[derive(Clone)]
pub struct CommentService {
    comments: Arc<dyn CommentsRepo>,
}

impl CommentService {
    pub fn new(comments: Arc<dyn CommentsRepo>) -> Self {
        Self { comments }
    }

    /// Persist one new active comment linked to `post`.
    pub async fn submit(
        &self,
        post: &PostRecord,
        draft: CommentDraft,
    ) -> Result<CommentRecord, RepoError> {
        let record = self
            .comments
            .insert_comment(NewCommentParams {
                post_id: post.id,
                author_name: draft.name,
                email: draft.email,
                body: draft.body,
            })
            .await?;

        metrics::counter!("brezza_comments_submitted_total").increment(1);
        info!(
            target = "brezza::comments",
            post = %post.slug,
            comment_id = %record.id,
            "comment submitted"
        );

        Ok(record)
    }
}
