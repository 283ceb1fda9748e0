//! Paged list responses.

use serde::{Deserialize, Serialize};

/// One page of results.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub content: Vec<T>,
    /// Zero-based page index.
    pub page: u32,
    pub size: u32,
    pub total_elements: i64,
    pub total_pages: i64,
}

impl<T> Page<T> {
    /// Build a page, deriving `total_pages` from the element count.
    #[must_use]
    pub fn new(content: Vec<T>, page: u32, size: u32, total_elements: i64) -> Self {
        let size_i64 = i64::from(size.max(1));
        let total_pages = (total_elements + size_i64 - 1) / size_i64;
        Self {
            content,
            page,
            size,
            total_elements,
            total_pages,
        }
    }

    /// Whether a later page exists.
    #[must_use]
    pub fn has_next(&self) -> bool {
        i64::from(self.page) + 1 < self.total_pages
    }

    /// Convert every element, keeping the paging metadata.
    #[must_use]
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            content: self.content.into_iter().map(f).collect(),
            page: self.page,
            size: self.size,
            total_elements: self.total_elements,
            total_pages: self.total_pages,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_total_pages_rounds_up() {
        let page = Page::new(vec![1, 2, 3], 0, 10, 21);
        assert_eq!(page.total_pages, 3);
        assert!(page.has_next());

        let last = Page::new(vec![1], 2, 10, 21);
        assert!(!last.has_next());
    }

    #[test]
    fn test_empty_page() {
        let page: Page<i32> = Page::new(Vec::new(), 0, 10, 0);
        assert_eq!(page.total_pages, 0);
        assert!(!page.has_next());
    }

    #[test]
    fn test_map_keeps_metadata() {
        let page = Page::new(vec![1, 2], 1, 2, 6).map(|n| n * 10);
        assert_eq!(page.content, vec![10, 20]);
        assert_eq!(page.page, 1);
        assert_eq!(page.total_pages, 3);
    }
}
