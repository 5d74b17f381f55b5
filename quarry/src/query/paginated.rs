//! One page of results plus its position metadata

use serde::Serialize;

use crate::error::{Error, Result};

/// An immutable page of results
///
/// Invariants, checked by [`PaginatedList::new`]:
///
/// - `page_number >= 1` and `page_size >= 1`
/// - `items.len() <= page_size` and `items.len() <= total_count`
/// - `page_count == ceil(total_count / page_size)`
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaginatedList<T> {
    items: Vec<T>,
    page_number: u32,
    page_size: u32,
    page_count: u64,
    total_count: u64,
}

impl<T> PaginatedList<T> {
    /// Build a page, deriving `page_count`
    ///
    /// # Errors
    ///
    /// - [`Error::OutOfRange`] if `page_number` or `page_size` is 0
    /// - [`Error::InvalidArgument`] if `items` is longer than `page_size` or
    ///   `total_count`
    pub fn new(items: Vec<T>, page_number: u32, page_size: u32, total_count: u64) -> Result<Self> {
        if page_number == 0 {
            return Err(Error::OutOfRange {
                parameter: "page_number",
                minimum: 1,
                actual: 0,
            });
        }
        if page_size == 0 {
            return Err(Error::OutOfRange {
                parameter: "page_size",
                minimum: 1,
                actual: 0,
            });
        }
        let len = items.len() as u64;
        if len > u64::from(page_size) {
            return Err(Error::invalid_argument(
                "items",
                format!("{len} items do not fit a page of {page_size}"),
            ));
        }
        if len > total_count {
            return Err(Error::invalid_argument(
                "items",
                format!("{len} items exceed the total count of {total_count}"),
            ));
        }
        Ok(Self {
            items,
            page_number,
            page_size,
            page_count: total_count.div_ceil(u64::from(page_size)),
            total_count,
        })
    }

    /// A page as returned by the store, reconciled with an earlier count
    ///
    /// The count and the fetch are separate reads, so rows saved in between
    /// can leave the page with more items than were counted. The total is
    /// raised to cover everything the store actually returned.
    pub(crate) fn from_store(
        mut items: Vec<T>,
        page_number: u32,
        page_size: u32,
        offset: u64,
        counted: u64,
    ) -> Self {
        items.truncate(page_size as usize);
        let total_count = counted.max(offset + items.len() as u64);
        Self {
            items,
            page_number,
            page_size,
            page_count: total_count.div_ceil(u64::from(page_size.max(1))),
            total_count,
        }
    }

    /// An empty page (no matching entities at this position)
    pub(crate) fn empty(page_number: u32, page_size: u32, total_count: u64) -> Self {
        Self {
            items: Vec::new(),
            page_number,
            page_size,
            page_count: total_count.div_ceil(u64::from(page_size.max(1))),
            total_count,
        }
    }

    /// Items on this page
    pub fn items(&self) -> &[T] {
        &self.items
    }

    /// Take ownership of the items
    pub fn into_items(self) -> Vec<T> {
        self.items
    }

    /// One-based page number
    pub fn page_number(&self) -> u32 {
        self.page_number
    }

    /// Requested page size
    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    /// Number of pages needed for `total_count` items
    pub fn page_count(&self) -> u64 {
        self.page_count
    }

    /// Matching entities across all pages
    pub fn total_count(&self) -> u64 {
        self.total_count
    }

    /// Items on this page
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn has_previous_page(&self) -> bool {
        self.page_number > 1
    }

    pub fn has_next_page(&self) -> bool {
        u64::from(self.page_number) < self.page_count
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.items.iter()
    }

    /// Transform the items, keeping the page metadata
    pub fn map<U, F: FnMut(T) -> U>(self, f: F) -> PaginatedList<U> {
        PaginatedList {
            items: self.items.into_iter().map(f).collect(),
            page_number: self.page_number,
            page_size: self.page_size,
            page_count: self.page_count,
            total_count: self.total_count,
        }
    }
}

impl<T> IntoIterator for PaginatedList<T> {
    type Item = T;
    type IntoIter = std::vec::IntoIter<T>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.into_iter()
    }
}

impl<'a, T> IntoIterator for &'a PaginatedList<T> {
    type Item = &'a T;
    type IntoIter = std::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_count_rounds_up() {
        let page = PaginatedList::new(vec![1, 2, 3, 4, 5], 1, 5, 9).unwrap();
        assert_eq!(page.page_count(), 2);
        assert!(page.has_next_page());
        assert!(!page.has_previous_page());

        let last = PaginatedList::new(vec![6, 7, 8, 9], 2, 5, 9).unwrap();
        assert!(!last.has_next_page());
        assert!(last.has_previous_page());
    }

    #[test]
    fn test_empty_total_has_zero_pages() {
        let page = PaginatedList::<i32>::new(Vec::new(), 1, 20, 0).unwrap();
        assert_eq!(page.page_count(), 0);
        assert!(page.is_empty());
        assert!(!page.has_next_page());
    }

    #[test]
    fn test_invariants_are_enforced() {
        assert!(matches!(
            PaginatedList::new(vec![1], 0, 5, 1),
            Err(Error::OutOfRange { parameter: "page_number", .. })
        ));
        assert!(matches!(
            PaginatedList::new(vec![1], 1, 0, 1),
            Err(Error::OutOfRange { parameter: "page_size", .. })
        ));
        assert!(matches!(
            PaginatedList::new(vec![1, 2, 3], 1, 2, 3),
            Err(Error::InvalidArgument { parameter: "items", .. })
        ));
        assert!(matches!(
            PaginatedList::new(vec![1, 2], 1, 5, 1),
            Err(Error::InvalidArgument { parameter: "items", .. })
        ));
    }

    #[test]
    fn test_from_store_raises_a_stale_total() {
        let page = PaginatedList::from_store(vec![1, 2], 1, 5, 0, 1);
        assert_eq!(page.total_count(), 2);
        assert_eq!(page.page_count(), 1);

        let page = PaginatedList::from_store(vec![6, 7, 8], 2, 3, 3, 4);
        assert_eq!(page.total_count(), 6);
        assert_eq!(page.page_count(), 2);

        let fresh = PaginatedList::from_store(vec![1], 1, 5, 0, 9);
        assert_eq!(fresh.total_count(), 9);
        assert_eq!(fresh.page_count(), 2);
    }

    #[test]
    fn test_map_keeps_metadata() {
        let page = PaginatedList::new(vec![1, 2], 3, 2, 6).unwrap();
        let mapped = page.map(|n| n.to_string());
        assert_eq!(mapped.items(), &["1".to_string(), "2".to_string()]);
        assert_eq!(mapped.page_number(), 3);
        assert_eq!(mapped.page_count(), 3);
        assert_eq!(mapped.total_count(), 6);
    }

    #[test]
    fn test_serialized_shape() {
        let page = PaginatedList::new(vec!["a"], 2, 1, 3).unwrap();
        let json = serde_json::to_value(&page).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "items": ["a"],
                "pageNumber": 2,
                "pageSize": 1,
                "pageCount": 3,
                "totalCount": 3
            })
        );
    }
}
