//! Brezza is a small self-hosted blog engine: published posts with tag
//! filters and page-number pagination, a detail page with comments and
//! tag-overlap related posts, share-by-email, and a sitemap.

pub mod application;
pub mod config;
pub mod domain;
pub mod infra;
pub mod presentation;
