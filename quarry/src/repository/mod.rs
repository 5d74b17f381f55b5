//! Repositories over a Unit of Work's store
//!
//! A [`Repository`] exposes staging (`add`, `update`, `remove`) and reads
//! (`any`, `count`, `first_or_default`, `single_or_default`, `list`,
//! `paginate`, `find`) for one entity type. It owns no entity state: reads go
//! to the store, and staged changes only become durable when the owning Unit
//! of Work completes.
//!
//! Every read composes the same way: base sequence, then filter, then
//! ordering and bounds, then materialization.
//!
//! # Example
//!
//! ```rust,ignore
//! use quarry::query::{FilterCriterion, PaginationCriteria};
//!
//! let people = uow.repository::<Person>()?;
//! people.add(Person::new(10, "Barbara", "McClintock", 90))?;
//!
//! let adults = FilterCriterion::new(|p: &Person| p.age.is_some_and(|a| a >= 18));
//! let page = people
//!     .query()
//!     .filter(adults)
//!     .with_cancellation(&cancel)
//!     .paginate(&PaginationCriteria::new().sorted_by_string("FamilyName")?)
//!     .await?;
//! ```

mod factory;
mod query;

pub use factory::{DefaultRepositoryFactory, RepositoryFactory};
pub use query::RepositoryQuery;

use std::fmt;
use std::marker::PhantomData;
use std::sync::{Arc, Weak};

use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use crate::entity::{entity_name, Entity};
use crate::error::{Error, Result};
use crate::query::{FilterCriterion, PaginatedList, PaginationCriteria, Queryable, Tracking};
use crate::store::DataStore;

/// Per-repository settings supplied by the factory
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositoryOptions {
    /// Tracking mode applied to every read unless overridden per query
    pub tracking: Tracking,
}

/// Staging and read access to one entity type
pub struct Repository<T, S> {
    store: Weak<S>,
    options: RepositoryOptions,
    _entity: PhantomData<fn() -> T>,
}

impl<T: Entity, S: DataStore> Repository<T, S> {
    /// Create a repository over a store it does not own
    pub fn new(store: Weak<S>, options: RepositoryOptions) -> Self {
        Self {
            store,
            options,
            _entity: PhantomData,
        }
    }

    pub fn options(&self) -> RepositoryOptions {
        self.options
    }

    /// Upgrade the store handle, failing once the Unit of Work has let it go
    fn store(&self) -> Result<Arc<S>> {
        self.store
            .upgrade()
            .filter(|store| !store.is_closed())
            .ok_or_else(|| {
                Error::InvalidState(format!(
                    "repository for `{}` used after its unit of work was disposed",
                    entity_name::<T>()
                ))
            })
    }

    /// Base sequence with the repository's tracking mode applied
    pub(crate) fn base_query(&self) -> Result<S::Query<T>> {
        Ok(self.store()?.query::<T>().with_tracking(self.options.tracking))
    }

    /// Stage a new entity
    pub fn add(&self, entity: T) -> Result<()> {
        self.store()?.stage_add(entity)
    }

    /// Stage several new entities
    pub fn add_range(&self, entities: impl IntoIterator<Item = T>) -> Result<()> {
        let store = self.store()?;
        entities
            .into_iter()
            .try_for_each(|entity| store.stage_add(entity))
    }

    /// Stage a replacement for the stored entity with the same key
    pub fn update(&self, entity: T) -> Result<()> {
        self.store()?.stage_update(entity)
    }

    /// Stage removal of the stored entity with the same key
    pub fn remove(&self, entity: &T) -> Result<()> {
        self.store()?.stage_remove::<T>(entity.key())
    }

    /// Stage removal of several entities
    pub fn remove_range<'a>(&self, entities: impl IntoIterator<Item = &'a T>) -> Result<()> {
        let store = self.store()?;
        entities
            .into_iter()
            .try_for_each(|entity| store.stage_remove::<T>(entity.key()))
    }

    /// Start a composable read
    pub fn query(&self) -> RepositoryQuery<'_, T, S> {
        RepositoryQuery::new(self)
    }

    /// Whether any entity matches `filter`
    pub async fn any(&self, filter: &FilterCriterion<T>, cancel: &CancellationToken) -> Result<bool> {
        self.filtered(filter, cancel).any().await
    }

    /// Number of entities matching `filter`
    pub async fn count(&self, filter: &FilterCriterion<T>, cancel: &CancellationToken) -> Result<u64> {
        self.filtered(filter, cancel).count().await
    }

    /// First matching entity in store order, if any
    pub async fn first_or_default(
        &self,
        filter: &FilterCriterion<T>,
        cancel: &CancellationToken,
    ) -> Result<Option<T>> {
        self.filtered(filter, cancel).first_or_default().await
    }

    /// The only matching entity, if any
    ///
    /// # Errors
    ///
    /// [`Error::MultipleResults`] if more than one entity matches.
    pub async fn single_or_default(
        &self,
        filter: &FilterCriterion<T>,
        cancel: &CancellationToken,
    ) -> Result<Option<T>> {
        self.filtered(filter, cancel).single_or_default().await
    }

    /// Every matching entity
    pub async fn list(&self, filter: &FilterCriterion<T>, cancel: &CancellationToken) -> Result<Vec<T>> {
        self.filtered(filter, cancel).to_list().await
    }

    /// One page of the matching entities
    pub async fn paginate(
        &self,
        filter: &FilterCriterion<T>,
        criteria: &PaginationCriteria<T>,
        cancel: &CancellationToken,
    ) -> Result<PaginatedList<T>> {
        self.filtered(filter, cancel).paginate(criteria).await
    }

    /// The stored entity with `key`, if any
    pub async fn find(&self, key: &T::Key, cancel: &CancellationToken) -> Result<Option<T>> {
        let key = key.clone();
        self.query()
            .filter(FilterCriterion::new(move |entity: &T| entity.key() == key))
            .with_cancellation(cancel)
            .first_or_default()
            .await
    }

    fn filtered(&self, filter: &FilterCriterion<T>, cancel: &CancellationToken) -> RepositoryQuery<'_, T, S> {
        self.query().filter(filter.clone()).with_cancellation(cancel)
    }
}

impl<T, S> fmt::Debug for Repository<T, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Repository")
            .field("entity", &std::any::type_name::<T>())
            .field("store_alive", &(self.store.strong_count() > 0))
            .field("options", &self.options)
            .finish()
    }
}
