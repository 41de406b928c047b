//! Offset-based pagination utilities.

use serde::{Deserialize, Serialize};

/// Default page size when the client does not send one.
pub const DEFAULT_PER_PAGE: i64 = 20;

/// Largest page size a client may request.
pub const MAX_PER_PAGE: i64 = 100;

/// Normalized page request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: i64,
    pub per_page: i64,
}

impl PageRequest {
    /// Clamp raw query values into a valid page request.
    ///
    /// Pages start at 1; `per_page` is kept within `1..=MAX_PER_PAGE`.
    pub fn new(page: Option<i64>, per_page: Option<i64>) -> Self {
        Self {
            page: page.unwrap_or(1).max(1),
            per_page: per_page.unwrap_or(DEFAULT_PER_PAGE).clamp(1, MAX_PER_PAGE),
        }
    }

    pub fn limit(&self) -> i64 {
        self.per_page
    }

    pub fn offset(&self) -> i64 {
        (self.page - 1) * self.per_page
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self::new(None, None)
    }
}

/// Pagination info returned with list responses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub page: i64,
    pub per_page: i64,
    pub total: i64,
    pub total_pages: i64,
}

impl Pagination {
    pub fn new(request: PageRequest, total: i64) -> Self {
        let total = total.max(0);
        Self {
            page: request.page,
            per_page: request.per_page,
            total,
            total_pages: (total + request.per_page - 1) / request.per_page,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_request_defaults() {
        let req = PageRequest::new(None, None);
        assert_eq!(req.page, 1);
        assert_eq!(req.per_page, DEFAULT_PER_PAGE);
        assert_eq!(req.offset(), 0);
    }

    #[test]
    fn test_page_request_clamps() {
        let req = PageRequest::new(Some(0), Some(1000));
        assert_eq!(req.page, 1);
        assert_eq!(req.per_page, MAX_PER_PAGE);

        let req = PageRequest::new(Some(-3), Some(0));
        assert_eq!(req.page, 1);
        assert_eq!(req.per_page, 1);
    }

    #[test]
    fn test_offset() {
        let req = PageRequest::new(Some(3), Some(25));
        assert_eq!(req.limit(), 25);
        assert_eq!(req.offset(), 50);
    }

    #[test]
    fn test_total_pages() {
        let req = PageRequest::new(Some(1), Some(20));
        assert_eq!(Pagination::new(req, 0).total_pages, 0);
        assert_eq!(Pagination::new(req, 20).total_pages, 1);
        assert_eq!(Pagination::new(req, 21).total_pages, 2);
    }

    #[test]
    fn test_pagination_serializes_camel_case() {
        let json = serde_json::to_value(Pagination::new(PageRequest::default(), 5)).unwrap();
        assert_eq!(json["perPage"], 20);
        assert_eq!(json["totalPages"], 1);
    }
}
