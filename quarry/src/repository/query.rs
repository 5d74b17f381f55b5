//! Fluent read builder

use std::fmt;

use tokio_util::sync::CancellationToken;

use super::Repository;
use crate::entity::{entity_name, Entity};
use crate::error::{Error, Result};
use crate::query::{
    order_with, FilterCriterion, IncludePaths, PaginatedList, PaginationCriteria, Queryable,
    SortCriterion, Tracking,
};
use crate::store::DataStore;

/// A read against one repository, configured before a terminal call
///
/// Filters combine with `and`; sort keys apply in the order they were added;
/// include paths pass through to the store unchanged.
pub struct RepositoryQuery<'r, T, S> {
    repository: &'r Repository<T, S>,
    filter: FilterCriterion<T>,
    includes: Vec<String>,
    sort: Vec<SortCriterion<T>>,
    tracking: Option<Tracking>,
    cancel: CancellationToken,
}

impl<'r, T: Entity, S: DataStore> RepositoryQuery<'r, T, S> {
    pub(crate) fn new(repository: &'r Repository<T, S>) -> Self {
        Self {
            repository,
            filter: FilterCriterion::all(),
            includes: Vec::new(),
            sort: Vec::new(),
            tracking: None,
            cancel: CancellationToken::new(),
        }
    }

    /// Keep only entities matching `filter` (and every earlier filter)
    #[must_use]
    pub fn filter(mut self, filter: FilterCriterion<T>) -> Self {
        self.filter = self.filter.and(filter);
        self
    }

    /// Eager-load every path in `includes`
    #[must_use]
    pub fn include(mut self, includes: &IncludePaths<T>) -> Self {
        self.includes.extend(includes.iter().map(str::to_string));
        self
    }

    /// Eager-load one raw path
    ///
    /// # Errors
    ///
    /// [`Error::InvalidArgument`] if `path` is blank.
    pub fn include_path(mut self, path: &str) -> Result<Self> {
        let path = path.trim();
        if path.is_empty() {
            return Err(Error::invalid_argument("path", "include path must not be blank"));
        }
        self.includes.push(path.to_string());
        Ok(self)
    }

    /// Add a sort key; the first one added is the primary key
    #[must_use]
    pub fn order_by(mut self, criterion: SortCriterion<T>) -> Self {
        self.sort.push(criterion);
        self
    }

    /// Read detached snapshots
    #[must_use]
    pub fn no_tracking(mut self) -> Self {
        self.tracking = Some(Tracking::NoTracking);
        self
    }

    /// Abort the terminal call when `cancel` fires
    #[must_use]
    pub fn with_cancellation(mut self, cancel: &CancellationToken) -> Self {
        self.cancel = cancel.clone();
        self
    }

    /// Base sequence with tracking, includes and filter applied
    pub(crate) fn build(&self) -> Result<S::Query<T>> {
        let mut query = self.repository.base_query()?;
        if let Some(tracking) = self.tracking {
            query = query.with_tracking(tracking);
        }
        for path in &self.includes {
            query = query.include(path);
        }
        Ok(self.filter.apply(query))
    }

    /// Whether anything matches
    pub async fn any(self) -> Result<bool> {
        let query = self.build()?;
        Ok(!query.take(1).to_list(&self.cancel).await?.is_empty())
    }

    /// Number of matching entities
    pub async fn count(self) -> Result<u64> {
        self.build()?.count(&self.cancel).await
    }

    /// First matching entity under the configured order
    pub async fn first_or_default(self) -> Result<Option<T>> {
        Ok(self.fetch(Some(1)).await?.into_iter().next())
    }

    /// The only matching entity
    ///
    /// # Errors
    ///
    /// [`Error::MultipleResults`] if more than one entity matches.
    pub async fn single_or_default(self) -> Result<Option<T>> {
        let mut rows = self.fetch(Some(2)).await?;
        if rows.len() > 1 {
            return Err(Error::MultipleResults {
                entity_type: entity_name::<T>(),
            });
        }
        Ok(rows.pop())
    }

    /// Every matching entity under the configured order
    pub async fn to_list(self) -> Result<Vec<T>> {
        self.fetch(None).await
    }

    /// One page of matching entities
    ///
    /// Page ordering comes from `criteria`; sort keys added with
    /// [`order_by`](Self::order_by) act as further tie-breakers.
    pub async fn paginate(self, criteria: &PaginationCriteria<T>) -> Result<PaginatedList<T>> {
        let criteria = self
            .sort
            .iter()
            .cloned()
            .fold(criteria.clone(), PaginationCriteria::sorted_by_criterion);
        let query = self.build()?;
        tracing::debug!(
            entity = entity_name::<T>(),
            page = criteria.page_number(),
            page_size = criteria.page_size(),
            "Paginating"
        );
        criteria.paginate(query, &self.cancel).await
    }

    async fn fetch(self, limit: Option<u64>) -> Result<Vec<T>> {
        let query = self.build()?;
        let rows = match self.sort.split_first() {
            Some((primary, tie_breakers)) => {
                bounded(order_with(primary, tie_breakers, query), limit)
                    .to_list(&self.cancel)
                    .await?
            }
            None => bounded(query, limit).to_list(&self.cancel).await?,
        };
        tracing::debug!(entity = entity_name::<T>(), rows = rows.len(), "Fetched");
        Ok(rows)
    }
}

fn bounded<T, Q: Queryable<T>>(query: Q, limit: Option<u64>) -> Q {
    match limit {
        Some(limit) => query.take(limit),
        None => query,
    }
}

impl<T, S> fmt::Debug for RepositoryQuery<'_, T, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RepositoryQuery")
            .field("filter", &self.filter)
            .field("includes", &self.includes)
            .field("sort", &self.sort)
            .field("tracking", &self.tracking)
            .finish()
    }
}
