use serde::{Deserialize, Serialize};

use crate::constants::{DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE};

/// `?page=&limit=` window, `page` is 1-based.
#[derive(Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PageQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

impl PageQuery {
    pub fn new(page: i64, limit: i64) -> Self {
        Self {
            page: Some(page),
            limit: Some(limit),
        }
    }

    pub fn page(&self) -> i64 {
        self.page.unwrap_or(1).max(1)
    }

    pub fn limit(&self) -> i64 {
        self.limit
            .unwrap_or(DEFAULT_PAGE_SIZE)
            .clamp(1, MAX_PAGE_SIZE)
    }

    /// Saturates for absurd page numbers; such a window is simply empty.
    pub fn offset(&self) -> i64 {
        (self.page() - 1).saturating_mul(self.limit())
    }

    /// True when rows of a `COUNT(*) OVER()` query can't tell the total:
    /// the window is past the end.
    pub fn past_end(&self, rows: usize) -> bool {
        rows == 0 && self.offset() > 0
    }
}

#[derive(Serialize, Deserialize, Debug, PartialEq)]
pub struct Page<T> {
    pub count: i64,
    pub next: Option<String>,
    pub previous: Option<String>,
    pub results: Vec<T>,
}

impl<T> Page<T> {
    /// `path` is the request path the `next`/`previous` links point back to.
    pub fn from_rows(rows: Vec<T>, total_rows: i64, query: PageQuery, path: &str) -> Self {
        let page = query.page();
        let limit = query.limit();

        let link = |page: i64| format!("{path}?page={page}&limit={limit}");

        let next = (page.saturating_mul(limit) < total_rows).then(|| link(page + 1));
        let previous = (page > 1).then(|| link(page - 1));

        Self {
            count: total_rows,
            next,
            previous,
            results: rows,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn query_defaults_and_clamps() {
        let query = PageQuery::default();
        assert_eq!(query.page(), 1);
        assert_eq!(query.limit(), DEFAULT_PAGE_SIZE);
        assert_eq!(query.offset(), 0);

        let query = PageQuery::new(0, 10_000);
        assert_eq!(query.page(), 1);
        assert_eq!(query.limit(), MAX_PAGE_SIZE);

        assert_eq!(PageQuery::new(3, 5).offset(), 10);
    }

    #[test]
    fn huge_page_numbers_saturate() {
        let query = PageQuery::new(i64::MAX, 6);
        assert_eq!(query.offset(), i64::MAX);
        assert!(query.past_end(0));

        let page: Page<i32> = Page::from_rows(vec![], 12, query, "/recipes/");
        assert_eq!(page.next, None);
        assert_eq!(
            page.previous,
            Some(format!("/recipes/?page={}&limit=6", i64::MAX - 1))
        );
    }

    #[test]
    fn first_page_is_never_past_end() {
        assert!(!PageQuery::default().past_end(0));
        assert!(!PageQuery::new(2, 6).past_end(3));
        assert!(PageQuery::new(2, 6).past_end(0));
    }

    #[test]
    fn links_follow_the_window() {
        let first = Page::from_rows(vec![1, 2], 5, PageQuery::new(1, 2), "/recipes/");
        assert_eq!(first.count, 5);
        assert_eq!(first.next.as_deref(), Some("/recipes/?page=2&limit=2"));
        assert_eq!(first.previous, None);

        let last = Page::from_rows(vec![5], 5, PageQuery::new(3, 2), "/recipes/");
        assert_eq!(last.next, None);
        assert_eq!(last.previous.as_deref(), Some("/recipes/?page=2&limit=2"));
    }

    #[test]
    fn empty_page_has_no_links() {
        let page: Page<i32> = Page::from_rows(vec![], 0, PageQuery::default(), "/users/");
        assert_eq!(page.count, 0);
        assert_eq!(page.next, None);
        assert_eq!(page.previous, None);
        assert!(page.results.is_empty());
    }
}
