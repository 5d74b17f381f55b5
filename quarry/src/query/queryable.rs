//! Queryable sequence abstraction over a backing store
//!
//! A queryable is a not-yet-executed description of a data source. Filter,
//! ordering and bounds compose lazily; only [`Queryable::count`] and
//! [`Queryable::to_list`] reach the backing store, and both may suspend.
//!
//! Ordering is split across two traits so the compiler enforces that
//! tie-breaking keys are only applied to an already ordered sequence:
//! [`Queryable::order_by`] produces an [`OrderedQueryable`], which is the only
//! thing [`OrderedQueryable::then_by`] is available on.

use std::future::Future;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use super::sort::SortDirection;
use crate::error::Result;
use crate::reflect::PropertyPath;

/// Shared entity predicate
pub type Predicate<T> = Arc<dyn Fn(&T) -> bool + Send + Sync>;

/// Change-tracking mode requested from the backing store
///
/// The data-access layer passes this through unchanged; only the store
/// gives it meaning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tracking {
    /// Materialized entities are tracked for changes
    #[default]
    Tracked,
    /// Materialized entities are detached snapshots
    NoTracking,
}

/// A composable, lazily executed sequence of `T`
pub trait Queryable<T>: Sized + Send {
    /// Sequence type produced by [`Queryable::order_by`]
    type Ordered: OrderedQueryable<T>;

    /// Keep only entities for which `predicate` holds
    fn filter(self, predicate: Predicate<T>) -> Self;

    /// Establish `key` as the primary ordering
    fn order_by(self, key: &PropertyPath<T>, direction: SortDirection) -> Self::Ordered;

    /// Skip the first `count` entities
    fn skip(self, count: u64) -> Self;

    /// Keep at most `count` entities
    fn take(self, count: u64) -> Self;

    /// Ask the store to eager-load a related path alongside each entity
    fn include(self, path: &str) -> Self {
        let _ = path;
        self
    }

    /// Select the change-tracking mode
    fn with_tracking(self, tracking: Tracking) -> Self;

    /// Count the entities the sequence currently describes
    fn count(&self, cancel: &CancellationToken) -> impl Future<Output = Result<u64>> + Send;

    /// Execute the sequence and materialize the results
    fn to_list(self, cancel: &CancellationToken) -> impl Future<Output = Result<Vec<T>>> + Send;
}

/// A queryable with an established ordering
pub trait OrderedQueryable<T>: Queryable<T> {
    /// Add a stable secondary ordering that only breaks ties of earlier keys
    fn then_by(self, key: &PropertyPath<T>, direction: SortDirection) -> Self;
}
