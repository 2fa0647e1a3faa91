//! Pagination over a fully materialized, ordered result list
//!
//! Pages past the end yield an empty slice; the requested page is reported
//! back unchanged so callers can tell the request was out of range.

use std::ops::Range;

use serde::Serialize;

/// Page used when the request has none (or an invalid one)
pub const DEFAULT_PAGE: usize = 1;

/// Page size used when the request has none (or an invalid one)
pub const DEFAULT_PAGE_SIZE: usize = 25;

/// Pagination metadata, recomputed per query
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Pagination {
    pub total: usize,
    /// Current page number (1-indexed)
    pub page: usize,
    pub limit: usize,
    pub total_pages: usize,
    pub has_next_page: bool,
    pub has_previous_page: bool,
    /// 1-indexed number of the first item on this page (0 when the page is empty)
    pub first_item: usize,
    /// 1-indexed number of the last item on this page (0 when the page is empty)
    pub last_item: usize,
}

impl Pagination {
    /// Index range of this page within the full list
    pub fn range(&self) -> Range<usize> {
        let start = (self.page - 1).saturating_mul(self.limit).min(self.total);
        let end = start.saturating_add(self.limit).min(self.total);
        start..end
    }
}

/// Calculate page metadata; `page` and `limit` below 1 are treated as 1
///
/// # Examples
/// ```
/// use tps_search::pagination::calculate_pagination;
///
/// let p = calculate_pagination(40, 2, 25);
/// assert_eq!(p.total_pages, 2);
/// assert_eq!(p.range(), 25..40);
/// assert!(!p.has_next_page);
/// ```
pub fn calculate_pagination(total: usize, page: usize, limit: usize) -> Pagination {
    let page = page.max(1);
    let limit = limit.max(1);
    let total_pages = total.div_ceil(limit);

    let mut pagination = Pagination {
        total,
        page,
        limit,
        total_pages,
        has_next_page: page < total_pages,
        has_previous_page: page > 1,
        first_item: 0,
        last_item: 0,
    };

    let range = pagination.range();
    if !range.is_empty() {
        pagination.first_item = range.start + 1;
        pagination.last_item = range.end;
    }
    pagination
}

/// Slice one page out of `items`
pub fn paginate<T>(items: &[T], page: usize, limit: usize) -> (&[T], Pagination) {
    let pagination = calculate_pagination(items.len(), page, limit);
    (&items[pagination.range()], pagination)
}
