//! Post date handling and canonical path derivation.
//!
//! A published post is reachable at exactly one canonical path,
//! `/{year}/{month}/{day}/{slug}`, where the date components come from the
//! UTC calendar date of the publish timestamp.

use time::{
    Date, Month, OffsetDateTime, UtcOffset, format_description::FormatItem,
    macros::format_description,
};

pub const HUMAN_DATE_FORMAT: &[FormatItem<'static>] =
    format_description!("[month repr:long] [day padding:none], [year]");

/// Date+slug coordinates of a published post, as they appear in the URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishedPath {
    pub year: i32,
    pub month: u8,
    pub day: u8,
    pub slug: String,
}

impl PublishedPath {
    pub fn new(year: i32, month: u8, day: u8, slug: impl Into<String>) -> Self {
        Self {
            year,
            month,
            day,
            slug: slug.into(),
        }
    }

    /// The UTC day covered by this path, as a half-open timestamp interval.
    ///
    /// Returns `None` when the components do not name a real calendar date,
    /// which callers treat the same as an unknown post.
    pub fn day_bounds(&self) -> Option<(OffsetDateTime, OffsetDateTime)> {
        let month = Month::try_from(self.month).ok()?;
        let date = Date::from_calendar_date(self.year, month, self.day).ok()?;
        let start = date.midnight().assume_utc();
        let end = date.next_day()?.midnight().assume_utc();
        Some((start, end))
    }
}

/// Canonical public path for a post published at `published_at`.
pub fn canonical_path(slug: &str, published_at: OffsetDateTime) -> String {
    let date = published_at.to_offset(UtcOffset::UTC).date();
    format!(
        "/{:04}/{:02}/{:02}/{}",
        date.year(),
        u8::from(date.month()),
        date.day(),
        slug
    )
}

pub fn format_human_date(value: OffsetDateTime) -> String {
    value
        .to_offset(UtcOffset::UTC)
        .date()
        .format(HUMAN_DATE_FORMAT)
        .expect("valid calendar date")
}

/// Leading excerpt of a post body for listing cards, cut on a word boundary.
pub fn excerpt(body: &str, max_chars: usize) -> String {
    let trimmed = body.trim();
    if trimmed.chars().count() <= max_chars {
        return trimmed.to_string();
    }

    let head: String = trimmed.chars().take(max_chars).collect();
    let cut = head.rfind(char::is_whitespace).unwrap_or(head.len());
    let mut out = head[..cut].trim_end().to_string();
    out.push('\u{2026}');
    out
}

/// Split a plain-text body into display paragraphs on blank lines.
pub fn paragraphs(body: &str) -> Vec<String> {
    body.split("\n\n")
        .map(str::trim)
        .filter(|block| !block.is_empty())
        .map(|block| block.replace("\r\n", "\n"))
        .collect()
}

#[cfg(test)]
mod tests {
    use time::macros::datetime;

    use super::*;

    #[test]
    fn canonical_path_uses_utc_date_components() {
        let published = datetime!(2024-03-07 23:45 UTC);
        assert_eq!(
            canonical_path("hello-world", published),
            "/2024/03/07/hello-world"
        );
    }

    #[test]
    fn day_bounds_cover_one_utc_day() {
        let path = PublishedPath::new(2024, 3, 7, "hello-world");
        let (start, end) = path.day_bounds().expect("valid date");
        assert_eq!(start, datetime!(2024-03-07 00:00 UTC));
        assert_eq!(end, datetime!(2024-03-08 00:00 UTC));
    }

    #[test]
    fn day_bounds_reject_impossible_dates() {
        assert!(PublishedPath::new(2024, 2, 30, "x").day_bounds().is_none());
        assert!(PublishedPath::new(2024, 13, 1, "x").day_bounds().is_none());
    }

    #[test]
    fn excerpt_cuts_on_word_boundary() {
        let body = "one two three four five";
        let cut = excerpt(body, 12);
        assert_eq!(cut, "one two\u{2026}");
    }

    #[test]
    fn excerpt_returns_short_bodies_unchanged() {
        assert_eq!(excerpt("  short body  ", 100), "short body");
    }

    #[test]
    fn paragraphs_split_on_blank_lines() {
        let body = "first block\ncontinues\n\nsecond block\n\n\n";
        assert_eq!(
            paragraphs(body),
            vec!["first block\ncontinues".to_string(), "second block".to_string()]
        );
    }
}
