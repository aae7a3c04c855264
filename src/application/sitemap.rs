//! Sitemap service for sitemap.xml and robots.txt generation.
//!
//! This service encapsulates the business logic for generating the sitemap,
//! keeping the HTTP layer focused on request/response handling.

use std::sync::Arc;

use thiserror::Error;
use time::format_description::well_known::Rfc3339;

use crate::application::repos::{PostsRepo, RepoError, SitemapEntryRecord};
use crate::domain::posts;

const CHANGE_FREQUENCY: &str = "weekly";
const PRIORITY: &str = "0.9";

#[derive(Clone)]
pub struct SitemapService {
    posts: Arc<dyn PostsRepo>,
    public_site_url: String,
}

#[derive(Debug, Error)]
pub enum SitemapError {
    #[error("failed to list posts: {0}")]
    Posts(String),
}

impl From<RepoError> for SitemapError {
    fn from(err: RepoError) -> Self {
        SitemapError::Posts(err.to_string())
    }
}

impl SitemapService {
    pub fn new(posts: Arc<dyn PostsRepo>, public_site_url: String) -> Self {
        Self {
            posts,
            public_site_url,
        }
    }

    /// Generate sitemap.xml content listing every published post exactly
    /// once, with `lastmod` equal to its publish timestamp.
    pub async fn sitemap_xml(&self) -> Result<String, SitemapError> {
        let base = normalize_public_site_url(&self.public_site_url);
        let entries = self.posts.list_sitemap_entries().await?;

        let mut xml = String::from(
            "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<urlset xmlns=\"http://www.sitemaps.org/schemas/sitemap/0.9\">\n",
        );
        for entry in entries {
            xml.push_str(&sitemap_entry(&base, &entry));
        }
        xml.push_str("</urlset>\n");
        Ok(xml)
    }

    /// Generate robots.txt content advertising the sitemap URL.
    pub async fn robots_txt(&self) -> Result<String, SitemapError> {
        let base = normalize_public_site_url(&self.public_site_url);
        let sitemap_url = format!("{base}sitemap.xml");
        Ok(format!("User-agent: *\nAllow: /\nSitemap: {sitemap_url}\n"))
    }
}

fn normalize_public_site_url(url: &str) -> String {
    let trimmed = url.trim_end_matches('/');
    format!("{trimmed}/")
}

fn sitemap_entry(base: &str, entry: &SitemapEntryRecord) -> String {
    let path = posts::canonical_path(&entry.slug, entry.published_at);
    let loc = format!("{}{}", base.trim_end_matches('/'), path);
    let lastmod = entry
        .published_at
        .format(&Rfc3339)
        .unwrap_or_default();
    format!(
        "  <url><loc>{loc}</loc><lastmod>{lastmod}</lastmod><changefreq>{CHANGE_FREQUENCY}</changefreq><priority>{PRIORITY}</priority></url>\n"
    )
}
