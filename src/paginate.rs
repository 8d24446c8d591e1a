use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::debug;

use crate::error::Result;
use crate::filter::Predicate;
use crate::models::DefectItem;
use crate::sort::SortSpec;
use crate::store::DefectStore;

pub const DEFAULT_PER_PAGE: u32 = 20;
pub const MAX_PER_PAGE: u32 = 100;

/// A page request after clamping; always within bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u32,
    pub per_page: u32,
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page: 1,
            per_page: DEFAULT_PER_PAGE,
        }
    }
}

impl PageRequest {
    /// `page` below 1 becomes 1; `per_page` is clamped to `1..=MAX_PER_PAGE`.
    pub fn new(page: Option<i64>, per_page: Option<i64>) -> Self {
        let page = page.unwrap_or(1).clamp(1, i64::from(u32::MAX)) as u32;
        let per_page = per_page
            .unwrap_or(i64::from(DEFAULT_PER_PAGE))
            .clamp(1, i64::from(MAX_PER_PAGE)) as u32;
        Self { page, per_page }
    }

    pub fn offset(&self) -> u64 {
        u64::from(self.page - 1) * u64::from(self.per_page)
    }

    pub fn limit(&self) -> u64 {
        u64::from(self.per_page)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PageResult<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub pages: u64,
    pub current_page: u32,
    pub per_page: u32,
    pub has_next: bool,
    pub has_prev: bool,
}

impl<T> PageResult<T> {
    pub fn new(items: Vec<T>, total: u64, request: PageRequest) -> Self {
        let pages = total.div_ceil(u64::from(request.per_page));
        let current = u64::from(request.page);
        Self {
            items,
            total,
            pages,
            current_page: request.page,
            per_page: request.per_page,
            has_next: current < pages,
            has_prev: request.page > 1,
        }
    }
}

/// Fetch one page of defects matching `predicate`. A page past the end
/// yields no items rather than an error.
pub fn paginate<S: DefectStore + ?Sized>(
    store: &S,
    predicate: &Predicate,
    sort: SortSpec,
    request: PageRequest,
    now: DateTime<Utc>,
) -> Result<PageResult<DefectItem>> {
    let (rows, total) = store.query(predicate, sort, request.offset(), request.limit(), now)?;
    debug!(
        total,
        page = request.page,
        per_page = request.per_page,
        returned = rows.len(),
        "paginated defect query"
    );
    let items = rows.into_iter().map(|row| row.into_item(now)).collect();
    Ok(PageResult::new(items, total, request))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_defaults() {
        let req = PageRequest::new(None, None);
        assert_eq!(req, PageRequest::default());
        assert_eq!(req.offset(), 0);
        assert_eq!(req.limit(), 20);
    }

    #[test]
    fn test_per_page_clamped() {
        assert_eq!(PageRequest::new(None, Some(500)).per_page, 100);
        assert_eq!(PageRequest::new(None, Some(0)).per_page, 1);
        assert_eq!(PageRequest::new(None, Some(-3)).per_page, 1);
    }

    #[test]
    fn test_page_zero_is_page_one() {
        assert_eq!(PageRequest::new(Some(0), None), PageRequest::new(Some(1), None));
        assert_eq!(PageRequest::new(Some(-10), None).page, 1);
    }

    #[test]
    fn test_offset() {
        assert_eq!(PageRequest::new(Some(3), Some(25)).offset(), 50);
    }

    #[test]
    fn test_page_metadata() {
        let result: PageResult<()> = PageResult::new(vec![(), ()], 5, PageRequest::new(Some(2), Some(2)));
        assert_eq!(result.pages, 3);
        assert!(result.has_next);
        assert!(result.has_prev);

        let last: PageResult<()> = PageResult::new(vec![()], 5, PageRequest::new(Some(3), Some(2)));
        assert!(!last.has_next);
    }

    #[test]
    fn test_empty_total() {
        let result: PageResult<()> = PageResult::new(vec![], 0, PageRequest::default());
        assert_eq!(result.pages, 0);
        assert!(!result.has_next);
        assert!(!result.has_prev);
    }

    #[test]
    fn test_page_beyond_range() {
        let result: PageResult<()> = PageResult::new(vec![], 5, PageRequest::new(Some(9), Some(2)));
        assert!(result.items.is_empty());
        assert_eq!(result.current_page, 9);
        assert!(!result.has_next);
        assert!(result.has_prev);
    }

    #[test]
    fn test_serialized_envelope() {
        let result: PageResult<u8> = PageResult::new(vec![1], 1, PageRequest::default());
        let json = serde_json::to_value(&result).unwrap();
        for key in ["items", "total", "pages", "current_page", "per_page", "has_next", "has_prev"] {
            assert!(json.get(key).is_some(), "missing {}", key);
        }
    }

    proptest! {
        #[test]
        fn prop_per_page_always_in_bounds(page in any::<i64>(), per_page in any::<i64>()) {
            let req = PageRequest::new(Some(page), Some(per_page));
            prop_assert!(req.page >= 1);
            prop_assert!((1..=MAX_PER_PAGE).contains(&req.per_page));
        }

        #[test]
        fn prop_pages_cover_total(total in 0u64..10_000, per_page in 1i64..200) {
            let req = PageRequest::new(Some(1), Some(per_page));
            let result: PageResult<()> = PageResult::new(vec![], total, req);
            prop_assert!(result.pages * u64::from(req.per_page) >= total);
            prop_assert!(result.pages == 0 || (result.pages - 1) * u64::from(req.per_page) < total);
        }
    }
}
