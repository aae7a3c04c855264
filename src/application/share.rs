//! Share-a-post-by-email service.

use std::sync::Arc;

use thiserror::Error;
use tracing::info;
use uuid::Uuid;

use crate::application::mailer::{MailError, Mailer, OutgoingEmail};
use crate::application::repos::{PostsRepo, RepoError};
use crate::domain::entities::PostRecord;
use crate::domain::posts;

/// Validated share-form input, produced by the HTTP form layer.
#[derive(Debug, Clone)]
pub struct ShareDraft {
    pub name: String,
    pub email: String,
    pub to: String,
    pub comments: String,
}

#[derive(Debug, Error)]
pub enum ShareError {
    #[error(transparent)]
    Repo(#[from] RepoError),
    #[error(transparent)]
    Mail(#[from] MailError),
}

#[derive(Clone)]
pub struct ShareService {
    posts: Arc<dyn PostsRepo>,
    mailer: Arc<dyn Mailer>,
    public_site_url: String,
}

impl ShareService {
    pub fn new(posts: Arc<dyn PostsRepo>, mailer: Arc<dyn Mailer>, public_site_url: String) -> Self {
        Self {
            posts,
            mailer,
            public_site_url,
        }
    }

    /// The published post a share request refers to, if any.
    pub async fn load_post(&self, id: Uuid) -> Result<Option<PostRecord>, RepoError> {
        self.posts.find_published_by_id(id).await
    }

    /// Compose the recommendation message for `post` and dispatch it to
    /// `draft.to`.
    pub async fn share(&self, post: &PostRecord, draft: &ShareDraft) -> Result<(), ShareError> {
        let post_url = absolute_post_url(&self.public_site_url, post);
        let email = OutgoingEmail {
            to: draft.to.clone(),
            subject: share_subject(&draft.name, &draft.email, &post.title),
            body: share_body(&post.title, &post_url, &draft.name, &draft.comments),
        };

        self.mailer.send(email).await?;

        metrics::counter!("brezza_share_emails_sent_total").increment(1);
        info!(
            target = "brezza::share",
            post = %post.slug,
            "share email dispatched"
        );

        Ok(())
    }
}

pub(crate) fn share_subject(name: &str, email: &str, title: &str) -> String {
    format!("{name} ({email}) recommends you reading \"{title}\"")
}

pub(crate) fn share_body(title: &str, url: &str, name: &str, comments: &str) -> String {
    format!("Read \"{title}\" at {url}\n\n{name}'s comments: {comments}")
}

/// Absolute canonical URL of a post under the configured public site URL.
pub fn absolute_post_url(public_site_url: &str, post: &PostRecord) -> String {
    let base = public_site_url.trim_end_matches('/');
    let published_at = post.published_at.unwrap_or(post.created_at);
    format!("{base}{}", posts::canonical_path(&post.slug, published_at))
}
