//! Pagination criteria and the paginator
//!
//! [`PaginationCriteria`] holds a page position and an ordered list of sort
//! criteria. It is configured fluently, then handed a filtered queryable:
//!
//! 1. the queryable is counted, exactly once
//! 2. sort criteria (if any) are applied, first as the primary key and the
//!    rest as tie-breakers
//! 3. `(page_number - 1) * page_size` entities are skipped and `page_size`
//!    taken
//! 4. the bounded sequence is materialized into a [`PaginatedList`]
//!
//! The skip in step 3 is applied whether or not an order was established.
//! Paging past page 1 of an unordered sequence returns whatever the store
//! yields at that offset, which is not guaranteed to be stable; a warning is
//! logged when that happens.
//!
//! # Example
//!
//! ```rust,ignore
//! use quarry::query::{PaginationCriteria, SortDirection};
//!
//! let criteria = PaginationCriteria::<Person>::new()
//!     .with_page_size(5)?
//!     .starting_at_page(2)?
//!     .sorted_by_string("FamilyName,-Age")?;
//!
//! let page = criteria.paginate(store.query::<Person>(), &cancel).await?;
//! assert_eq!(page.page_number(), 2);
//! ```

use std::fmt;

use tokio_util::sync::CancellationToken;

use super::paginated::PaginatedList;
use super::queryable::Queryable;
use super::sort::{order_with, parse_sort_directives, SortCriterion, SortDirection};
use crate::config::QueryConfig;
use crate::error::{Error, Result};
use crate::reflect::{PathMatching, PropertyPath, Reflect, Selector};

/// Page size used when none is configured
pub const DEFAULT_PAGE_SIZE: u32 = 20;

/// Page position plus ordering for one paginated read
pub struct PaginationCriteria<T> {
    page_number: u32,
    page_size: u32,
    sort: Vec<SortCriterion<T>>,
    matching: PathMatching,
}

impl<T: Reflect> PaginationCriteria<T> {
    /// Page 1, [`DEFAULT_PAGE_SIZE`], no ordering, case-insensitive paths
    pub fn new() -> Self {
        Self {
            page_number: 1,
            page_size: DEFAULT_PAGE_SIZE,
            sort: Vec::new(),
            matching: PathMatching::default(),
        }
    }

    /// Criteria using the configured default page size and matching mode
    ///
    /// # Errors
    ///
    /// [`Error::OutOfRange`] if the configured page size is 0.
    pub fn from_config(config: &QueryConfig) -> Result<Self> {
        Ok(Self::new()
            .with_page_size(config.default_page_size)?
            .with_property_matching(config.property_matching))
    }

    pub fn page_number(&self) -> u32 {
        self.page_number
    }

    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    /// Sort criteria in application order
    pub fn sort_criteria(&self) -> &[SortCriterion<T>] {
        &self.sort
    }

    /// Matching mode for string property names
    pub fn property_matching(&self) -> PathMatching {
        self.matching
    }

    /// Number of entities skipped before this page
    pub fn offset(&self) -> u64 {
        u64::from(self.page_number - 1) * u64::from(self.page_size)
    }

    /// Set the one-based page number
    ///
    /// # Errors
    ///
    /// [`Error::OutOfRange`] if `page_number` is 0.
    pub fn set_page_number(&mut self, page_number: u32) -> Result<()> {
        self.page_number = at_least_one("page_number", page_number)?;
        Ok(())
    }

    /// Set the page size
    ///
    /// # Errors
    ///
    /// [`Error::OutOfRange`] if `page_size` is 0.
    pub fn set_page_size(&mut self, page_size: u32) -> Result<()> {
        self.page_size = at_least_one("page_size", page_size)?;
        Ok(())
    }

    /// Fluent [`set_page_number`](Self::set_page_number)
    pub fn starting_at_page(mut self, page_number: u32) -> Result<Self> {
        self.set_page_number(page_number)?;
        Ok(self)
    }

    /// Fluent [`set_page_size`](Self::set_page_size)
    pub fn with_page_size(mut self, page_size: u32) -> Result<Self> {
        self.set_page_size(page_size)?;
        Ok(self)
    }

    /// Resolution mode for [`sorted_by_property`](Self::sorted_by_property)
    /// and [`sorted_by_string`](Self::sorted_by_string)
    #[must_use]
    pub fn with_property_matching(mut self, matching: PathMatching) -> Self {
        self.matching = matching;
        self
    }

    /// Append a sort key named by a dotted property path
    pub fn sorted_by_property(self, name: &str, direction: SortDirection) -> Result<Self> {
        let path = PropertyPath::resolve(name, self.matching)?;
        Ok(self.sorted_by_criterion(SortCriterion::new(path, direction)?))
    }

    /// Append a sort key named by a typed selector
    pub fn sorted_by<V>(
        self,
        selector: impl Into<Selector<T, V>>,
        direction: SortDirection,
    ) -> Result<Self> {
        Ok(self.sorted_by_criterion(SortCriterion::by_selector(selector, direction)?))
    }

    /// Append an already built sort key
    #[must_use]
    pub fn sorted_by_criterion(mut self, criterion: SortCriterion<T>) -> Self {
        self.sort.push(criterion);
        self
    }

    /// Append every directive of a comma-separated sort string
    ///
    /// Nothing is appended unless every directive parses.
    ///
    /// # Errors
    ///
    /// [`Error::Format`] wrapping the resolution failure of the first bad
    /// directive; [`Error::InvalidArgument`] for a blank string.
    pub fn sorted_by_string(mut self, sort: &str) -> Result<Self> {
        let parsed = parse_sort_directives(sort, self.matching)?;
        self.sort.extend(parsed);
        Ok(self)
    }

    /// Remove every sort key
    #[must_use]
    pub fn clear_sort(mut self) -> Self {
        self.sort.clear();
        self
    }

    /// Count, order, bound and materialize one page of `queryable`
    ///
    /// The count completes before the bounded fetch is issued. If `cancel`
    /// fires during the count, the fetch is never issued. When the page
    /// starts at or beyond the total count the fetch is skipped and an empty
    /// page is returned.
    pub async fn paginate<Q>(&self, queryable: Q, cancel: &CancellationToken) -> Result<PaginatedList<T>>
    where
        Q: Queryable<T>,
    {
        let total_count = queryable.count(cancel).await?;
        if cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }

        let offset = self.offset();
        if offset >= total_count {
            tracing::debug!(
                entity = T::type_info().name,
                page = self.page_number,
                total_count,
                "Page starts past the last entity"
            );
            return Ok(PaginatedList::empty(self.page_number, self.page_size, total_count));
        }

        let items = match self.sort.split_first() {
            Some((primary, tie_breakers)) => {
                let ordered = order_with(primary, tie_breakers, queryable);
                self.fetch(ordered, offset, cancel).await?
            }
            None => {
                if self.page_number > 1 {
                    tracing::warn!(
                        entity = T::type_info().name,
                        page = self.page_number,
                        "Paging an unordered sequence past page 1; page contents are not stable"
                    );
                }
                self.fetch(queryable, offset, cancel).await?
            }
        };

        tracing::debug!(
            entity = T::type_info().name,
            page = self.page_number,
            page_size = self.page_size,
            items = items.len(),
            total_count,
            "Page materialized"
        );
        Ok(PaginatedList::from_store(
            items,
            self.page_number,
            self.page_size,
            offset,
            total_count,
        ))
    }

    async fn fetch<Q: Queryable<T>>(
        &self,
        queryable: Q,
        offset: u64,
        cancel: &CancellationToken,
    ) -> Result<Vec<T>> {
        queryable
            .skip(offset)
            .take(u64::from(self.page_size))
            .to_list(cancel)
            .await
    }
}

fn at_least_one(parameter: &'static str, value: u32) -> Result<u32> {
    if value == 0 {
        return Err(Error::OutOfRange {
            parameter,
            minimum: 1,
            actual: 0,
        });
    }
    Ok(value)
}

impl<T: Reflect> Default for PaginationCriteria<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Clone for PaginationCriteria<T> {
    fn clone(&self) -> Self {
        Self {
            page_number: self.page_number,
            page_size: self.page_size,
            sort: self.sort.clone(),
            matching: self.matching,
        }
    }
}

impl<T> fmt::Debug for PaginationCriteria<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PaginationCriteria")
            .field("page_number", &self.page_number)
            .field("page_size", &self.page_size)
            .field("sort", &self.sort)
            .field("matching", &self.matching)
            .finish()
    }
}
