//! Page/limit pagination.
//!
//! Parameters usually arrive as raw query-string values, so construction
//! accepts optional strings and applies the defaults (`limit = 20`,
//! `page = 1`) for absent or empty input.

use serde::Serialize;
use thiserror::Error;

pub const DEFAULT_LIMIT: u64 = 20;
pub const DEFAULT_PAGE: u64 = 1;

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum PaginationError {
    #[error("invalid page")]
    InvalidPage,

    #[error("invalid limit")]
    InvalidLimit,
}

/// Validated page request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Paginator {
    page: u64,
    limit: u64,
}

/// Pagination metadata returned alongside a page of items.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PaginationInfo {
    pub total_pages: u64,
    pub total_number_of_items: u64,
    pub current_page: u64,
    pub previous_page: Option<u64>,
    pub next_page: Option<u64>,
}

/// Offset/limit window for a query plus its metadata.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageWindow {
    pub offset: u64,
    pub limit: u64,
    pub info: PaginationInfo,
}

impl Paginator {
    pub fn new(limit: Option<&str>, page: Option<&str>) -> Result<Self, PaginationError> {
        let page = parse_positive(page, DEFAULT_PAGE).ok_or(PaginationError::InvalidPage)?;
        let limit = parse_positive(limit, DEFAULT_LIMIT).ok_or(PaginationError::InvalidLimit)?;
        Ok(Self { page, limit })
    }

    pub fn from_numbers(limit: u64, page: u64) -> Result<Self, PaginationError> {
        if page < 1 {
            return Err(PaginationError::InvalidPage);
        }
        if limit < 1 {
            return Err(PaginationError::InvalidLimit);
        }
        Ok(Self { page, limit })
    }

    pub fn page(&self) -> u64 {
        self.page
    }

    pub fn limit(&self) -> u64 {
        self.limit
    }

    /// Compute the window for a collection of `total` items.
    ///
    /// A page past the last one is rejected, except when the collection is
    /// empty (page 1 of nothing is a valid, empty page).
    pub fn paginate(&self, total: u64) -> Result<PageWindow, PaginationError> {
        let total_pages = total.div_ceil(self.limit);
        if total_pages > 0 && self.page > total_pages {
            return Err(PaginationError::InvalidPage);
        }

        let offset = (self.page - 1).saturating_mul(self.limit);
        let info = PaginationInfo {
            total_pages,
            total_number_of_items: total,
            current_page: self.page,
            previous_page: (self.page > 1).then(|| self.page - 1),
            next_page: (self.page < total_pages).then(|| self.page + 1),
        };

        Ok(PageWindow {
            offset,
            limit: self.limit,
            info,
        })
    }

    /// Metadata only, for callers that window the query themselves.
    pub fn info(&self, total: u64) -> Result<PaginationInfo, PaginationError> {
        self.paginate(total).map(|window| window.info)
    }

    /// Paginate an in-memory slice.
    pub fn slice<'a, T>(&self, items: &'a [T]) -> Result<(&'a [T], PaginationInfo), PaginationError> {
        let window = self.paginate(items.len() as u64)?;
        let start = usize::try_from(window.offset).unwrap_or(usize::MAX).min(items.len());
        let end = start
            .saturating_add(usize::try_from(window.limit).unwrap_or(usize::MAX))
            .min(items.len());
        Ok((&items[start..end], window.info))
    }
}

impl Default for Paginator {
    fn default() -> Self {
        Self {
            page: DEFAULT_PAGE,
            limit: DEFAULT_LIMIT,
        }
    }
}

fn parse_positive(raw: Option<&str>, default: u64) -> Option<u64> {
    match raw.map(str::trim) {
        None | Some("") => Some(default),
        Some(value) => value.parse::<u64>().ok().filter(|n| *n >= 1),
    }
}
