//! Unit of Work
//!
//! A [`UnitOfWork`] owns one store handle, the repositories created over it
//! and at most one active transaction. Repositories stage changes; the Unit of
//! Work makes them durable in [`UnitOfWork::complete`].
//!
//! ```text
//! Active --begin_transaction--> TransactionActive
//!   ^                                  |
//!   +---- commit / rollback / complete-+
//!
//! Active | TransactionActive --dispose--> Disposed
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use quarry::store::MemoryStore;
//! use quarry::UnitOfWork;
//!
//! let uow = UnitOfWork::new(MemoryStore::new());
//! uow.on_completed(|uow| tracing::info!(unit_of_work = %uow.id(), "saved"));
//!
//! uow.begin_transaction(&cancel).await?;
//! uow.repository::<Person>()?.add(person)?;
//! uow.complete().await?;
//! uow.dispose().await;
//! ```

use std::any::{Any, TypeId};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use dashmap::DashMap;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::entity::{entity_name, Entity};
use crate::error::{Error, Result};
use crate::repository::{DefaultRepositoryFactory, Repository, RepositoryFactory};
use crate::store::{DataStore, StoreTransaction};

type CompletedListener<S, F> = Arc<dyn Fn(&UnitOfWork<S, F>) + Send + Sync>;

/// Lifecycle state of a [`UnitOfWork`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnitOfWorkState {
    /// No transaction is open
    Active,
    /// A transaction is open
    TransactionActive,
    /// Disposed; every further operation fails
    Disposed,
}

impl fmt::Display for UnitOfWorkState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Active => write!(f, "active"),
            Self::TransactionActive => write!(f, "transaction_active"),
            Self::Disposed => write!(f, "disposed"),
        }
    }
}

/// Transactional boundary and repository owner for one store handle
pub struct UnitOfWork<S: DataStore, F = DefaultRepositoryFactory> {
    id: Uuid,
    store: RwLock<Option<Arc<S>>>,
    factory: F,
    repositories: DashMap<TypeId, Arc<dyn Any + Send + Sync>>,
    transaction: tokio::sync::Mutex<Option<S::Transaction>>,
    transaction_active: AtomicBool,
    listeners: Mutex<Vec<CompletedListener<S, F>>>,
    disposed: AtomicBool,
}

impl<S: DataStore> UnitOfWork<S> {
    /// Take ownership of `store`, creating repositories with default options
    pub fn new(store: S) -> Self {
        Self::with_factory(store, DefaultRepositoryFactory::default())
    }
}

impl<S: DataStore, F: RepositoryFactory> UnitOfWork<S, F> {
    /// Take ownership of `store`, creating repositories with `factory`
    pub fn with_factory(store: S, factory: F) -> Self {
        let id = Uuid::new_v4();
        tracing::debug!(unit_of_work = %id, "Unit of work created");
        Self {
            id,
            store: RwLock::new(Some(Arc::new(store))),
            factory,
            repositories: DashMap::new(),
            transaction: tokio::sync::Mutex::new(None),
            transaction_active: AtomicBool::new(false),
            listeners: Mutex::new(Vec::new()),
            disposed: AtomicBool::new(false),
        }
    }

    /// Identifier used for log correlation
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn state(&self) -> UnitOfWorkState {
        if self.disposed.load(Ordering::Acquire) {
            UnitOfWorkState::Disposed
        } else if self.transaction_active.load(Ordering::Acquire) {
            UnitOfWorkState::TransactionActive
        } else {
            UnitOfWorkState::Active
        }
    }

    pub fn in_transaction(&self) -> bool {
        self.state() == UnitOfWorkState::TransactionActive
    }

    fn store(&self) -> Result<Arc<S>> {
        self.store
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
            .ok_or_else(|| Error::InvalidState("unit of work has been disposed".to_string()))
    }

    /// The repository for `T`, created on first use
    ///
    /// Every call for the same `T` returns the same instance, including
    /// concurrent first calls.
    pub fn repository<T: Entity>(&self) -> Result<Arc<Repository<T, S>>> {
        let store = self.store()?;
        let erased = Arc::clone(
            &*self
                .repositories
                .entry(TypeId::of::<T>())
                .or_insert_with(|| {
                    tracing::debug!(
                        unit_of_work = %self.id,
                        entity = entity_name::<T>(),
                        "Repository created"
                    );
                    Arc::new(self.factory.create::<T, S>(Arc::downgrade(&store)))
                        as Arc<dyn Any + Send + Sync>
                }),
        );
        erased.downcast::<Repository<T, S>>().map_err(|_| {
            Error::InvalidState(format!(
                "repository cache holds a different type for `{}`",
                entity_name::<T>()
            ))
        })
    }

    /// Open a transaction
    ///
    /// # Errors
    ///
    /// [`Error::InvalidState`] if a transaction is already active; nested
    /// transactions are not supported.
    pub async fn begin_transaction(&self, cancel: &CancellationToken) -> Result<()> {
        let store = self.store()?;
        let mut slot = self.transaction.lock().await;
        if slot.is_some() {
            return Err(Error::InvalidState(
                "a transaction is already active; nested transactions are not supported"
                    .to_string(),
            ));
        }
        let transaction = store.begin_transaction(cancel).await?;
        tracing::debug!(
            unit_of_work = %self.id,
            transaction_id = %transaction.id(),
            "Transaction started"
        );
        *slot = Some(transaction);
        self.transaction_active.store(true, Ordering::Release);
        Ok(())
    }

    /// Commit the active transaction
    ///
    /// # Errors
    ///
    /// [`Error::InvalidState`] if no transaction is active.
    pub async fn commit_transaction(&self, cancel: &CancellationToken) -> Result<()> {
        self.store()?;
        let transaction = self.take_transaction().await?;
        let id = transaction.id();
        transaction.commit(cancel).await.inspect_err(|err| {
            tracing::error!(unit_of_work = %self.id, transaction_id = %id, error = %err, "Commit failed");
        })?;
        tracing::debug!(unit_of_work = %self.id, transaction_id = %id, "Transaction committed");
        Ok(())
    }

    /// Roll back the active transaction
    ///
    /// # Errors
    ///
    /// [`Error::InvalidState`] if no transaction is active.
    pub async fn rollback_transaction(&self, cancel: &CancellationToken) -> Result<()> {
        self.store()?;
        let transaction = self.take_transaction().await?;
        let id = transaction.id();
        transaction.rollback(cancel).await?;
        tracing::debug!(unit_of_work = %self.id, transaction_id = %id, "Transaction rolled back");
        Ok(())
    }

    async fn take_transaction(&self) -> Result<S::Transaction> {
        let transaction = self
            .transaction
            .lock()
            .await
            .take()
            .ok_or_else(|| Error::InvalidState("no transaction is active".to_string()))?;
        self.transaction_active.store(false, Ordering::Release);
        Ok(transaction)
    }

    /// Persist staged changes without finishing the Unit of Work
    ///
    /// Inside a transaction the saved changes stay revocable until the
    /// transaction commits.
    pub async fn save_changes(&self, cancel: &CancellationToken) -> Result<u64> {
        self.store()?.save_changes(cancel).await
    }

    /// [`complete_with`](Self::complete_with) without a cancellation signal
    pub async fn complete(&self) -> Result<u64> {
        self.complete_with(&CancellationToken::new()).await
    }

    /// Save staged changes, commit the active transaction and notify listeners
    ///
    /// Completed listeners run synchronously after the commit returns and
    /// before this method does. On failure the active transaction is rolled
    /// back, listeners are not notified, and the original error is returned.
    /// The rollback runs even when `cancel` has fired.
    pub async fn complete_with(&self, cancel: &CancellationToken) -> Result<u64> {
        let store = self.store()?;
        let mut slot = self.transaction.lock().await;

        let saved = match store.save_changes(cancel).await {
            Ok(saved) => saved,
            Err(err) => {
                tracing::warn!(unit_of_work = %self.id, error = %err, "Saving changes failed");
                if let Some(transaction) = slot.take() {
                    self.transaction_active.store(false, Ordering::Release);
                    self.roll_back_quietly(transaction).await;
                }
                return Err(err);
            }
        };

        if let Some(transaction) = slot.take() {
            self.transaction_active.store(false, Ordering::Release);
            let id = transaction.id();
            // a transaction dropped by a failed commit rolls itself back
            if let Err(err) = transaction.commit(cancel).await {
                tracing::error!(unit_of_work = %self.id, transaction_id = %id, error = %err, "Commit failed");
                return Err(err);
            }
            tracing::debug!(unit_of_work = %self.id, transaction_id = %id, "Transaction committed");
        }
        drop(slot);

        tracing::debug!(unit_of_work = %self.id, saved, "Unit of work completed");
        self.raise_completed();
        Ok(saved)
    }

    async fn roll_back_quietly(&self, transaction: S::Transaction) {
        let id = transaction.id();
        match transaction.rollback(&CancellationToken::new()).await {
            Ok(()) => {
                tracing::debug!(unit_of_work = %self.id, transaction_id = %id, "Transaction rolled back")
            }
            Err(err) => tracing::warn!(
                unit_of_work = %self.id,
                transaction_id = %id,
                error = %err,
                "Rollback failed"
            ),
        }
    }

    /// Register a listener for successful completion
    pub fn on_completed(&self, listener: impl Fn(&Self) + Send + Sync + 'static) {
        self.listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Arc::new(listener));
    }

    fn raise_completed(&self) {
        let listeners = self
            .listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        for listener in listeners {
            listener(self);
        }
    }

    /// Roll back any open transaction, drop staged changes and repositories,
    /// and close the store
    ///
    /// Disposing twice is a no-op.
    pub async fn dispose(&self) {
        if self.disposed.swap(true, Ordering::AcqRel) {
            return;
        }
        let transaction = self.transaction.lock().await.take();
        self.transaction_active.store(false, Ordering::Release);
        if let Some(transaction) = transaction {
            self.roll_back_quietly(transaction).await;
        }

        self.repositories.clear();
        let store = self
            .store
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(store) = store {
            store.discard_changes();
            store.close();
        }
        tracing::debug!(unit_of_work = %self.id, "Unit of work disposed");
    }
}

impl<S: DataStore, F> Drop for UnitOfWork<S, F> {
    fn drop(&mut self) {
        if *self.disposed.get_mut() {
            return;
        }
        drop(self.transaction.get_mut().take());
        let store = self
            .store
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(store) = store {
            store.discard_changes();
            store.close();
        }
    }
}

impl<S: DataStore, F> fmt::Debug for UnitOfWork<S, F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UnitOfWork")
            .field("id", &self.id)
            .field("repositories", &self.repositories.len())
            .field("transaction_active", &self.transaction_active.load(Ordering::Acquire))
            .field("disposed", &self.disposed.load(Ordering::Acquire))
            .finish()
    }
}
