//! Public listing and post-detail assembly.

use std::sync::Arc;

use serde_json::json;
use thiserror::Error;
use time::format_description::well_known::Rfc3339;

use crate::application::pagination::{PageInfo, Paginator};
use crate::application::repos::{
    CommentsRepo, PostQueryFilter, PostsRepo, RepoError, TagsRepo,
};
use crate::domain::entities::{CommentRecord, PostRecord, TagRecord};
use crate::domain::posts::{self, PublishedPath};
use crate::presentation::views::{
    CommentFormView, CommentView, PageContext, PaginationView, PostCard, PostDetailContext,
    TagBadge,
};

const EXCERPT_CHARS: usize = 200;

#[derive(Clone)]
pub enum FeedFilter {
    All,
    Tag(TagRecord),
}

impl FeedFilter {
    pub fn tag(&self) -> Option<&TagRecord> {
        match self {
            FeedFilter::Tag(tag) => Some(tag),
            FeedFilter::All => None,
        }
    }

    pub fn base_path(&self) -> String {
        match self {
            FeedFilter::All => "/".to_string(),
            FeedFilter::Tag(tag) => format!("/tag/{}", tag.slug),
        }
    }

    fn to_query_filter(&self) -> PostQueryFilter {
        PostQueryFilter {
            tag: self.tag().map(|tag| tag.slug.clone()),
        }
    }
}

#[derive(Debug, Error)]
pub enum FeedError {
    #[error("unknown tag")]
    UnknownTag,
    #[error(transparent)]
    Repo(#[from] RepoError),
}

#[derive(Clone)]
pub struct FeedService {
    posts: Arc<dyn PostsRepo>,
    comments: Arc<dyn CommentsRepo>,
    tags: Arc<dyn TagsRepo>,
    page_size: u32,
    related_limit: u32,
}

impl FeedService {
    pub fn new(
        posts: Arc<dyn PostsRepo>,
        comments: Arc<dyn CommentsRepo>,
        tags: Arc<dyn TagsRepo>,
        page_size: u32,
        related_limit: u32,
    ) -> Self {
        Self {
            posts,
            comments,
            tags,
            page_size,
            related_limit,
        }
    }

    /// Resolve an optional tag slug into a listing filter.
    pub async fn resolve_filter(&self, tag_slug: Option<&str>) -> Result<FeedFilter, FeedError> {
        match tag_slug {
            None => Ok(FeedFilter::All),
            Some(slug) => match self.tags.find_by_slug(slug).await? {
                Some(tag) => Ok(FeedFilter::Tag(tag)),
                None => Err(FeedError::UnknownTag),
            },
        }
    }

    /// One page of the published-post listing plus pagination metadata.
    ///
    /// `page` is the raw query value; resolution never fails (see
    /// [`Paginator::resolve`]).
    pub async fn page_context(
        &self,
        filter: &FeedFilter,
        page: Option<&str>,
    ) -> Result<PageContext, FeedError> {
        let query_filter = filter.to_query_filter();
        let total = self.posts.count_published(&query_filter).await?;

        let paginator = Paginator::new(self.page_size, total);
        let number = paginator.resolve(page);

        let records = self
            .posts
            .list_published(&query_filter, paginator.page_size(), paginator.offset(number))
            .await?;

        let mut cards = Vec::with_capacity(records.len());
        for record in &records {
            let tags = self.tags.list_for_post(record.id).await?;
            cards.push(record_to_card(record, &tags));
        }

        let has_results = !cards.is_empty();
        Ok(PageContext {
            posts: cards,
            total_count: total,
            has_results,
            active_tag: filter.tag().map(tag_badge),
            pagination: build_pagination_view(paginator.describe(number), &filter.base_path()),
            posts_ld_json: None,
        })
    }

    /// The raw published post at a canonical path, for write flows that need
    /// the record rather than a view context.
    pub async fn find_post(&self, path: &PublishedPath) -> Result<Option<PostRecord>, FeedError> {
        Ok(self.posts.find_published_by_path(path).await?)
    }

    /// Detail context for the post at the given canonical path, or `None`
    /// when no published post matches slug and publish date exactly.
    pub async fn post_detail(
        &self,
        path: &PublishedPath,
    ) -> Result<Option<PostDetailContext>, FeedError> {
        let Some(post) = self.posts.find_published_by_path(path).await? else {
            return Ok(None);
        };

        let tags = self.tags.list_for_post(post.id).await?;
        let comments = self.comments.list_active_for_post(post.id).await?;

        let related_records = self.posts.list_related(post.id, self.related_limit).await?;
        let mut related = Vec::with_capacity(related_records.len());
        for record in &related_records {
            let record_tags = self.tags.list_for_post(record.id).await?;
            related.push(record_to_card(record, &record_tags));
        }

        Ok(Some(build_detail_context(post, &tags, &comments, related)))
    }
}

pub(crate) fn record_to_card(record: &PostRecord, tags: &[TagRecord]) -> PostCard {
    let published_at = record.published_at.unwrap_or(record.created_at);

    PostCard {
        title: record.title.clone(),
        author: record.author.clone(),
        path: posts::canonical_path(&record.slug, published_at),
        excerpt: posts::excerpt(&record.body, EXCERPT_CHARS),
        published: posts::format_human_date(published_at),
        iso_date: published_at.format(&Rfc3339).unwrap_or_default(),
        badges: tags.iter().map(tag_badge).collect(),
    }
}

pub fn comment_view(comment: &CommentRecord) -> CommentView {
    CommentView {
        author_name: comment.author_name.clone(),
        body: comment.body.clone(),
        created: posts::format_human_date(comment.created_at),
        iso_date: comment.created_at.format(&Rfc3339).unwrap_or_default(),
    }
}

/// Schema.org `Blog` structured data for a listing page.
pub fn build_posts_ld_json(
    cards: &[PostCard],
    base_path: &str,
    public_site_url: &str,
    blog_name: &str,
) -> Option<String> {
    if cards.is_empty() {
        return None;
    }

    let site_url = public_site_url.trim_end_matches('/');
    let blog_url = if base_path == "/" {
        site_url.to_string()
    } else {
        format!("{site_url}{base_path}")
    };

    let blog_posts = cards
        .iter()
        .map(|card| {
            json!({
                "@type": "BlogPosting",
                "headline": card.title,
                "author": card.author,
                "description": card.excerpt,
                "datePublished": card.iso_date,
                "url": format!("{site_url}{}", card.path),
            })
        })
        .collect::<Vec<_>>();

    serde_json::to_string(&json!({
        "@context": "https://schema.org",
        "@type": "Blog",
        "name": blog_name,
        "url": blog_url,
        "blogPost": blog_posts,
    }))
    .ok()
}

fn tag_badge(tag: &TagRecord) -> TagBadge {
    TagBadge {
        slug: tag.slug.clone(),
        label: format!("#{}", tag.name),
        path: format!("/tag/{}", tag.slug),
    }
}

fn build_pagination_view(info: PageInfo, base_path: &str) -> PaginationView {
    let previous_path = if info.has_previous() {
        format!("{base_path}?page={}", info.previous())
    } else {
        String::new()
    };
    let next_path = if info.has_next() {
        format!("{base_path}?page={}", info.next())
    } else {
        String::new()
    };

    PaginationView {
        number: info.number,
        num_pages: info.num_pages,
        has_previous: info.has_previous(),
        has_next: info.has_next(),
        previous_path,
        next_path,
    }
}

fn build_detail_context(
    post: PostRecord,
    tags: &[TagRecord],
    comments: &[CommentRecord],
    related: Vec<PostCard>,
) -> PostDetailContext {
    let published_at = post.published_at.unwrap_or(post.created_at);
    let comment_views: Vec<CommentView> = comments.iter().map(comment_view).collect();

    PostDetailContext {
        title: post.title.clone(),
        author: post.author.clone(),
        published: posts::format_human_date(published_at),
        iso_date: published_at.format(&Rfc3339).unwrap_or_default(),
        path: posts::canonical_path(&post.slug, published_at),
        share_path: format!("/share/{}", post.id),
        badges: tags.iter().map(tag_badge).collect(),
        paragraphs: posts::paragraphs(&post.body),
        comment_count: comment_views.len(),
        comments: comment_views,
        new_comment: None,
        form: CommentFormView::default(),
        related,
    }
}
