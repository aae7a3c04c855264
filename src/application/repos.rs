//! Repository traits describing persistence adapters.

use async_trait::async_trait;
use thiserror::Error;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::domain::entities::{CommentRecord, PostRecord, TagRecord};
use crate::domain::posts::PublishedPath;

#[derive(Debug, Error)]
pub enum RepoError {
    #[error("persistence error: {0}")]
    Persistence(String),
    #[error("duplicate record violates unique constraint `{constraint}`")]
    Duplicate { constraint: String },
    #[error("resource not found")]
    NotFound,
    #[error("invalid input: {message}")]
    InvalidInput { message: String },
    #[error("integrity error: {message}")]
    Integrity { message: String },
    #[error("database timeout")]
    Timeout,
}

impl RepoError {
    pub fn from_persistence(err: impl std::fmt::Display) -> Self {
        Self::Persistence(err.to_string())
    }
}

#[derive(Debug, Clone, Default)]
pub struct PostQueryFilter {
    pub tag: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewCommentParams {
    pub post_id: Uuid,
    pub author_name: String,
    pub email: String,
    pub body: String,
}

/// Minimal projection of a published post for sitemap generation.
#[derive(Debug, Clone, PartialEq)]
pub struct SitemapEntryRecord {
    pub slug: String,
    pub published_at: OffsetDateTime,
}

#[async_trait]
pub trait PostsRepo: Send + Sync {
    /// Published posts, newest first, optionally filtered by tag slug.
    async fn list_published(
        &self,
        filter: &PostQueryFilter,
        limit: u32,
        offset: u64,
    ) -> Result<Vec<PostRecord>, RepoError>;

    async fn count_published(&self, filter: &PostQueryFilter) -> Result<u64, RepoError>;

    /// Published post whose slug and publish date match the canonical path.
    async fn find_published_by_path(
        &self,
        path: &PublishedPath,
    ) -> Result<Option<PostRecord>, RepoError>;

    async fn find_published_by_id(&self, id: Uuid) -> Result<Option<PostRecord>, RepoError>;

    /// Published posts sharing at least one tag with `post_id`, ranked by
    /// shared-tag count descending then publish timestamp descending. The
    /// post itself is never included.
    async fn list_related(&self, post_id: Uuid, limit: u32) -> Result<Vec<PostRecord>, RepoError>;

    async fn list_sitemap_entries(&self) -> Result<Vec<SitemapEntryRecord>, RepoError>;
}

#[async_trait]
pub trait CommentsRepo: Send + Sync {
    /// Active comments for a post, oldest first.
    async fn list_active_for_post(&self, post_id: Uuid) -> Result<Vec<CommentRecord>, RepoError>;

    async fn insert_comment(&self, params: NewCommentParams) -> Result<CommentRecord, RepoError>;
}

#[async_trait]
pub trait TagsRepo: Send + Sync {
    async fn find_by_slug(&self, slug: &str) -> Result<Option<TagRecord>, RepoError>;

    async fn list_for_post(&self, post_id: Uuid) -> Result<Vec<TagRecord>, RepoError>;
}

#[async_trait]
pub trait HealthRepo: Send + Sync {
    async fn ping(&self) -> Result<(), RepoError>;
}
