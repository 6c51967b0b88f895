//! Page windows and pagination metadata.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Page used when the request carries none.
pub const DEFAULT_PAGE: u64 = 1;

/// Page size used when the request carries none.
pub const DEFAULT_LIMIT: u64 = 10;

/// Literal `limit` token that disables the page size.
pub const LIMIT_ALL: &str = "all";

/// Page size of a window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Limit {
    /// At most this many documents (always >= 1).
    Count(u64),
    /// Every matching document.
    All,
}

/// A resolved result window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageWindow {
    /// 1-based page number.
    pub page: u64,
    /// Page size.
    pub limit: Limit,
}

impl Default for PageWindow {
    fn default() -> Self {
        Self {
            page: DEFAULT_PAGE,
            limit: Limit::Count(DEFAULT_LIMIT),
        }
    }
}

impl PageWindow {
    /// Create a counted window. `page` and `limit` are raised to 1.
    pub fn new(page: u64, limit: u64) -> Self {
        Self {
            page: page.max(1),
            limit: Limit::Count(limit.max(1)),
        }
    }

    /// Create a window that returns everything.
    pub fn all() -> Self {
        Self {
            page: DEFAULT_PAGE,
            limit: Limit::All,
        }
    }

    /// Resolve raw `page` and `limit` parameters.
    ///
    /// Missing values take the defaults, integers below 1 are raised to 1,
    /// and anything that is not an integer (or `all` for the limit) is an
    /// error.
    pub fn resolve(page: Option<&str>, limit: Option<&str>) -> Result<PageWindow> {
        let page = match page.map(str::trim).filter(|p| !p.is_empty()) {
            Some(raw) => parse_positive(raw, "page")?,
            None => DEFAULT_PAGE,
        };

        let limit = match limit.map(str::trim).filter(|l| !l.is_empty()) {
            Some(raw) if raw.eq_ignore_ascii_case(LIMIT_ALL) => Limit::All,
            Some(raw) => Limit::Count(parse_positive(raw, "limit")?),
            None => Limit::Count(DEFAULT_LIMIT),
        };

        Ok(PageWindow { page, limit })
    }

    /// Number of documents to skip, `None` when the limit is disabled.
    pub fn skip(&self) -> Option<u64> {
        match self.limit {
            Limit::Count(n) => Some(self.page.saturating_sub(1).saturating_mul(n)),
            Limit::All => None,
        }
    }

    /// Page size, `None` when the limit is disabled.
    pub fn take(&self) -> Option<u64> {
        match self.limit {
            Limit::Count(n) => Some(n),
            Limit::All => None,
        }
    }
}

fn parse_positive(raw: &str, param: &str) -> Result<u64> {
    let value: i64 = raw
        .parse()
        .map_err(|_| Error::invalid(format!("{param} must be an integer, got '{raw}'")))?;
    Ok(value.max(1) as u64)
}

/// Pagination metadata returned next to a result page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaginationMeta {
    /// 1-based page number.
    pub page: u64,
    /// Page size.
    pub limit: u64,
    /// Number of documents matching the filter.
    pub total: u64,
    /// Number of pages at this page size.
    pub total_pages: u64,
}

impl PaginationMeta {
    /// Compute metadata for `total` matches under `window`.
    ///
    /// An unbounded window reports the whole result as page 1 whose size
    /// is the total (at least 1), whatever page was requested.
    pub fn new(window: &PageWindow, total: u64) -> Self {
        let (page, limit) = match window.limit {
            Limit::Count(n) => (window.page.max(1), n.max(1)),
            Limit::All => (1, total.max(1)),
        };

        Self {
            page,
            limit,
            total,
            total_pages: total.div_ceil(limit),
        }
    }
}
