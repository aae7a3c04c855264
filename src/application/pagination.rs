//! Page-number pagination for public listings.
//!
//! Listings never fail on a bad `page` value: anything that is not a number
//! resolves to the first page, and numeric values outside the valid range
//! resolve to the last page.

/// Resolves requested page numbers against a known result total.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Paginator {
    page_size: u32,
    total: u64,
}

impl Paginator {
    pub fn new(page_size: u32, total: u64) -> Self {
        Self {
            page_size: page_size.max(1),
            total,
        }
    }

    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    /// Number of pages; an empty listing still has one (empty) page.
    pub fn num_pages(&self) -> u32 {
        let size = u64::from(self.page_size);
        let pages = self.total.div_ceil(size).max(1);
        u32::try_from(pages).unwrap_or(u32::MAX)
    }

    /// Resolve a raw `page` query value to a valid page number.
    ///
    /// Missing or non-numeric input resolves to page 1. Numeric input outside
    /// `[1, num_pages]` resolves to the last page, including values too large
    /// to represent.
    pub fn resolve(&self, raw: Option<&str>) -> u32 {
        let Some(raw) = raw.map(str::trim).filter(|value| !value.is_empty()) else {
            return 1;
        };

        match raw.parse::<i64>() {
            Ok(page) if page >= 1 && (page as u64) <= u64::from(self.num_pages()) => page as u32,
            Ok(_) => self.num_pages(),
            Err(_) if raw.chars().all(|c| c.is_ascii_digit()) => self.num_pages(),
            Err(_) => 1,
        }
    }

    pub fn offset(&self, page: u32) -> u64 {
        u64::from(page.saturating_sub(1)) * u64::from(self.page_size)
    }

    pub fn describe(&self, page: u32) -> PageInfo {
        PageInfo {
            number: page,
            num_pages: self.num_pages(),
            total: self.total,
        }
    }
}

/// Pagination metadata attached to a resolved page of results.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageInfo {
    pub number: u32,
    pub num_pages: u32,
    pub total: u64,
}

impl PageInfo {
    pub fn has_previous(&self) -> bool {
        self.number > 1
    }

    pub fn has_next(&self) -> bool {
        self.number < self.num_pages
    }

    pub fn previous(&self) -> u32 {
        self.number.saturating_sub(1).max(1)
    }

    pub fn next(&self) -> u32 {
        (self.number + 1).min(self.num_pages)
    }
}
