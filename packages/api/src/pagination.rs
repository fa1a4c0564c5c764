// ABOUTME: Pagination utilities for list endpoints
// ABOUTME: Standardized query parameters and response wrappers

use serde::{Deserialize, Serialize};

pub const DEFAULT_PAGE_SIZE: i64 = 20;
pub const MAX_PAGE_SIZE: i64 = 100;

/// Query parameters for paginated list endpoints (1-indexed pages).
#[derive(Debug, Clone, Deserialize)]
pub struct PaginationParams {
    #[serde(default = "default_page")]
    pub page: i64,
    #[serde(default = "default_page_size")]
    pub page_size: i64,
}

fn default_page() -> i64 {
    1
}

fn default_page_size() -> i64 {
    DEFAULT_PAGE_SIZE
}

impl PaginationParams {
    /// Normalized (limit, offset) pair for SQL queries.
    pub fn limit_offset(&self) -> (i64, i64) {
        let page = self.page.max(1);
        let limit = self.page_size.clamp(1, MAX_PAGE_SIZE);
        (limit, (page - 1) * limit)
    }
}

impl Default for PaginationParams {
    fn default() -> Self {
        Self {
            page: 1,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

/// A page of results plus the totals the frontend needs for paging controls.
#[derive(Debug, Clone, Serialize)]
pub struct Paginated<T> {
    pub items: Vec<T>,
    pub total: i64,
    pub page: i64,
    pub page_size: i64,
    pub total_pages: i64,
}

impl<T> Paginated<T> {
    pub fn new(items: Vec<T>, total: i64, params: &PaginationParams) -> Self {
        let (page_size, _) = params.limit_offset();
        Self {
            items,
            total,
            page: params.page.max(1),
            page_size,
            total_pages: (total + page_size - 1) / page_size,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_limit_offset_normalization() {
        let params = PaginationParams {
            page: 3,
            page_size: 10,
        };
        assert_eq!(params.limit_offset(), (10, 20));

        // Out-of-range values are clamped rather than rejected
        let params = PaginationParams {
            page: 0,
            page_size: 1_000,
        };
        assert_eq!(params.limit_offset(), (MAX_PAGE_SIZE, 0));

        let params = PaginationParams {
            page: -5,
            page_size: 0,
        };
        assert_eq!(params.limit_offset(), (1, 0));
    }

    #[test]
    fn test_paginated_total_pages() {
        let params = PaginationParams {
            page: 1,
            page_size: 20,
        };
        let page = Paginated::new(vec![1, 2, 3], 41, &params);
        assert_eq!(page.total_pages, 3);
        assert_eq!(page.total, 41);

        let empty: Paginated<i32> = Paginated::new(vec![], 0, &params);
        assert_eq!(empty.total_pages, 0);
    }
}
