//! Backing store abstraction
//!
//! A [`DataStore`] is the handle a Unit of Work owns: it produces queryable
//! sequences, stages changes until they are saved, and opens transactions.
//! Every method that may reach the underlying engine is async and takes a
//! cancellation token.
//!
//! [`MemoryStore`] is an in-memory implementation backed by a shared
//! [`MemoryDatabase`].

use std::future::Future;

use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::entity::Entity;
use crate::error::Result;
use crate::query::Queryable;

mod error;
mod memory;

pub use error::{StoreError, StoreErrorKind, StoreOperation};
pub use memory::{MemoryDatabase, MemoryQuery, MemoryStore, MemoryTransaction};

/// A store handle exclusively owned by one Unit of Work
///
/// Staging calls only record intent; nothing becomes visible to queries until
/// [`DataStore::save_changes`] succeeds. Changes saved inside a transaction
/// are undone if that transaction rolls back.
pub trait DataStore: Send + Sync + 'static {
    /// Queryable sequence over one entity type
    type Query<T: Entity>: Queryable<T>;

    /// Transaction handle
    type Transaction: StoreTransaction;

    /// Start a new queryable sequence over every stored `T`
    fn query<T: Entity>(&self) -> Self::Query<T>;

    /// Stage a new entity
    fn stage_add<T: Entity>(&self, entity: T) -> Result<()>;

    /// Stage a replacement for the stored entity with the same key
    fn stage_update<T: Entity>(&self, entity: T) -> Result<()>;

    /// Stage removal of the stored entity with `key`
    fn stage_remove<T: Entity>(&self, key: T::Key) -> Result<()>;

    /// Number of staged, unsaved changes
    fn pending_changes(&self) -> usize;

    /// Drop every staged change
    fn discard_changes(&self);

    /// Validate and persist every staged change, returning how many were saved
    ///
    /// Either every staged change is persisted or none is.
    fn save_changes(&self, cancel: &CancellationToken) -> impl Future<Output = Result<u64>> + Send;

    /// Open a transaction
    fn begin_transaction(
        &self,
        cancel: &CancellationToken,
    ) -> impl Future<Output = Result<Self::Transaction>> + Send;

    /// Release the handle
    ///
    /// Further operations fail with a `connection_failed` store error.
    /// Closing twice is a no-op.
    fn close(&self);

    fn is_closed(&self) -> bool;
}

/// An open transaction on a [`DataStore`]
///
/// A transaction dropped without a successful `commit` rolls back.
pub trait StoreTransaction: Send + Sync + 'static {
    /// Identifier used for log correlation
    fn id(&self) -> Uuid;

    /// Make every change saved since the transaction began durable
    fn commit(self, cancel: &CancellationToken) -> impl Future<Output = Result<()>> + Send;

    /// Undo every change saved since the transaction began
    fn rollback(self, cancel: &CancellationToken) -> impl Future<Output = Result<()>> + Send;
}
