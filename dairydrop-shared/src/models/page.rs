/// Offset pagination shared by catalog and review listings

use serde::Serialize;

/// Hard ceiling on page size for any listing
pub const MAX_PAGE_SIZE: u32 = 100;

/// A validated page request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    /// 1-based page number
    pub page: u32,

    /// Items per page, between 1 and [`MAX_PAGE_SIZE`]
    pub limit: u32,
}

impl PageRequest {
    /// Builds a page request, falling back to page 1 and `default_limit` for
    /// missing or zero values and clamping the limit to [`MAX_PAGE_SIZE`]
    pub fn new(page: Option<u32>, limit: Option<u32>, default_limit: u32) -> Self {
        let page = page.filter(|p| *p > 0).unwrap_or(1);
        let limit = limit
            .filter(|l| *l > 0)
            .unwrap_or(default_limit)
            .min(MAX_PAGE_SIZE);

        Self { page, limit }
    }

    /// Row offset for SQL `OFFSET`
    pub fn offset(&self) -> i64 {
        (i64::from(self.page) - 1) * i64::from(self.limit)
    }

    /// Limit as an SQL bind value
    pub fn sql_limit(&self) -> i64 {
        i64::from(self.limit)
    }

    /// Number of pages needed for `total` rows
    pub fn pages(&self, total: i64) -> i64 {
        if total <= 0 {
            0
        } else {
            (total + i64::from(self.limit) - 1) / i64::from(self.limit)
        }
    }

    /// Pagination summary for a response body
    pub fn summary(&self, total: i64) -> Pagination {
        Pagination {
            page: self.page,
            limit: self.limit,
            total,
            pages: self.pages(total),
        }
    }
}

/// Pagination block returned alongside a page of results
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Pagination {
    pub page: u32,
    pub limit: u32,
    pub total: i64,
    pub pages: i64,
}
