//! Page/limit to offset/limit conversion and the metadata returned with
//! every list response.

use std::fmt;
use std::str::FromStr;

use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PaginationError {
    #[error("invalid default page limit '{0}': expected a positive integer")]
    InvalidDefaultLimit(String),
}

/// Page size used whenever a request omits the limit or sends a
/// non-positive one. Always greater than zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DefaultLimit(u32);

impl DefaultLimit {
    pub fn new(limit: i64) -> Result<Self, PaginationError> {
        u32::try_from(limit)
            .ok()
            .filter(|limit| *limit > 0)
            .map(DefaultLimit)
            .ok_or_else(|| PaginationError::InvalidDefaultLimit(limit.to_string()))
    }

    pub fn get(self) -> u32 {
        self.0
    }
}

impl FromStr for DefaultLimit {
    type Err = PaginationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parsed: i64 = s
            .trim()
            .parse()
            .map_err(|_| PaginationError::InvalidDefaultLimit(s.to_string()))?;
        DefaultLimit::new(parsed).map_err(|_| PaginationError::InvalidDefaultLimit(s.to_string()))
    }
}

impl fmt::Display for DefaultLimit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Result window and navigation metadata for one list request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PageMeta {
    pub page: u32,
    pub limit: u32,
    pub offset: u64,
    pub total_pages: u64,
    pub total_count: u64,
}

impl PageMeta {
    /// Computes the window for `requested_page`/`requested_limit` over
    /// `total_count` rows. Non-positive inputs fall back to page 1 and the
    /// default limit. Pages past the end are kept as requested and simply
    /// select no rows.
    pub fn new(
        requested_page: i64,
        requested_limit: i64,
        total_count: u64,
        default_limit: DefaultLimit,
    ) -> Self {
        let limit = if requested_limit <= 0 {
            default_limit.get()
        } else {
            u32::try_from(requested_limit).unwrap_or(u32::MAX)
        };
        let page = if requested_page <= 0 {
            1
        } else {
            u32::try_from(requested_page).unwrap_or(u32::MAX)
        };

        let offset = u64::from(page - 1) * u64::from(limit);
        let total_pages = total_count.div_ceil(u64::from(limit));

        Self {
            page,
            limit,
            offset,
            total_pages,
            total_count,
        }
    }
}
