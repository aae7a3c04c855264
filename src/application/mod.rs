//! Application services layer scaffolding.

pub mod comments;
pub mod error;
pub mod feed;
pub mod mailer;
pub mod pagination;
pub mod repos;
pub mod share;
pub mod sitemap;
