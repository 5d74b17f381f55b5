//! In-memory store
//!
//! [`MemoryDatabase`] holds one table per entity type and is shared by every
//! [`MemoryStore`] opened on it. Each store is a session: it has its own
//! staged changes, its own transaction journal and its own closed flag.
//! Sessions read each other's saved but uncommitted changes.

use std::any::{Any, TypeId};
use std::cmp::Ordering;
use std::fmt;
use std::mem;
use std::sync::atomic::{AtomicBool, Ordering as AtomicOrdering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use dashmap::DashMap;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use super::{DataStore, StoreError, StoreErrorKind, StoreOperation, StoreTransaction};
use crate::entity::{entity_name, Entity};
use crate::error::{Error, Result};
use crate::query::{OrderedQueryable, Predicate, Queryable, SortDirection, Tracking};
use crate::reflect::PropertyPath;

type Table<T> = RwLock<Vec<T>>;
type Undo = Box<dyn FnOnce() + Send>;
type Check = Box<dyn Fn() -> std::result::Result<(), StoreError> + Send + Sync>;
type Apply = Box<dyn Fn(&MemoryDatabase) -> std::result::Result<Undo, StoreError> + Send + Sync>;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn read_rows<T>(table: &Table<T>) -> RwLockReadGuard<'_, Vec<T>> {
    table.read().unwrap_or_else(PoisonError::into_inner)
}

fn write_rows<T>(table: &Table<T>) -> RwLockWriteGuard<'_, Vec<T>> {
    table.write().unwrap_or_else(PoisonError::into_inner)
}

/// Yield once, failing if `cancel` fired before or during the yield
async fn checkpoint(cancel: &CancellationToken) -> Result<()> {
    if cancel.is_cancelled() {
        return Err(Error::Cancelled);
    }
    tokio::task::yield_now().await;
    if cancel.is_cancelled() {
        return Err(Error::Cancelled);
    }
    Ok(())
}

/// Shared, type-keyed tables
#[derive(Clone, Default)]
pub struct MemoryDatabase {
    tables: Arc<DashMap<TypeId, Arc<dyn Any + Send + Sync>>>,
}

impl MemoryDatabase {
    pub fn new() -> Self {
        Self::default()
    }

    fn table<T: Entity>(&self) -> std::result::Result<Arc<Table<T>>, StoreError> {
        let erased = Arc::clone(
            &*self
                .tables
                .entry(TypeId::of::<T>())
                .or_insert_with(|| Arc::new(Table::<T>::default()) as Arc<dyn Any + Send + Sync>),
        );
        erased.downcast::<Table<T>>().map_err(|_| {
            StoreError::new(
                StoreOperation::Query,
                StoreErrorKind::Other,
                "table registered under a different type",
            )
            .with_entity(entity_name::<T>())
        })
    }

    /// Insert rows directly, bypassing staging and key checks
    pub fn seed<T: Entity>(&self, rows: impl IntoIterator<Item = T>) -> Result<()> {
        let table = self.table::<T>()?;
        write_rows(&table).extend(rows);
        Ok(())
    }

    /// Snapshot of every stored `T`, in storage order
    pub fn rows<T: Entity>(&self) -> Result<Vec<T>> {
        let table = self.table::<T>()?;
        let rows = read_rows(&table).to_vec();
        Ok(rows)
    }
}

impl fmt::Debug for MemoryDatabase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryDatabase")
            .field("tables", &self.tables.len())
            .finish()
    }
}

struct PendingChange {
    entity_type: &'static str,
    check: Check,
    apply: Apply,
}

struct Journal {
    id: Uuid,
    undo: Vec<Undo>,
}

#[derive(Default)]
struct Session {
    pending: Mutex<Vec<PendingChange>>,
    journal: Mutex<Option<Journal>>,
    closed: AtomicBool,
}

impl Session {
    /// Undo the active journal if it belongs to `id` (any journal when `None`)
    ///
    /// Returns how many saved changes were undone, `None` if no matching
    /// journal was active.
    fn roll_back(&self, id: Option<Uuid>) -> Option<usize> {
        let journal = {
            let mut slot = lock(&self.journal);
            let matches = slot
                .as_ref()
                .is_some_and(|journal| id.map_or(true, |id| journal.id == id));
            if !matches {
                return None;
            }
            slot.take()?
        };
        let undone = journal.undo.len();
        for undo in journal.undo.into_iter().rev() {
            undo();
        }
        Some(undone)
    }
}

/// A store session over a [`MemoryDatabase`]
///
/// Clones share the session, so closing one clone closes them all.
#[derive(Clone, Default)]
pub struct MemoryStore {
    db: MemoryDatabase,
    session: Arc<Session>,
}

impl MemoryStore {
    /// Open a session on a fresh, empty database
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a new session on `db`
    pub fn open(db: &MemoryDatabase) -> Self {
        Self {
            db: db.clone(),
            session: Arc::default(),
        }
    }

    pub fn database(&self) -> &MemoryDatabase {
        &self.db
    }

    /// Insert rows directly into the underlying database
    pub fn seed<T: Entity>(&self, rows: impl IntoIterator<Item = T>) -> Result<()> {
        self.db.seed(rows)
    }

    fn ensure_open(&self, operation: StoreOperation) -> std::result::Result<(), StoreError> {
        if self.session.closed.load(AtomicOrdering::Acquire) {
            return Err(StoreError::closed(operation));
        }
        Ok(())
    }

    fn stage(&self, change: PendingChange) -> Result<()> {
        self.ensure_open(StoreOperation::Stage)
            .map_err(|e| e.with_entity(change.entity_type))?;
        tracing::trace!(entity = change.entity_type, "Change staged");
        lock(&self.session.pending).push(change);
        Ok(())
    }

    /// Put changes back at the front of the pending list after a failed save
    fn restore_pending(&self, changes: Vec<PendingChange>) {
        let mut pending = lock(&self.session.pending);
        let staged_since = mem::replace(&mut *pending, changes);
        pending.extend(staged_since);
    }
}

fn validation<T: Entity>(entity: T) -> Check {
    Box::new(move || {
        entity.validate().map_err(|reason| {
            StoreError::validation_failed(reason).with_entity(entity_name::<T>())
        })
    })
}

impl DataStore for MemoryStore {
    type Query<T: Entity> = MemoryQuery<T>;
    type Transaction = MemoryTransaction;

    fn query<T: Entity>(&self) -> MemoryQuery<T> {
        MemoryQuery {
            db: self.db.clone(),
            session: Arc::clone(&self.session),
            ops: Vec::new(),
            includes: Vec::new(),
            tracking: Tracking::default(),
        }
    }

    fn stage_add<T: Entity>(&self, entity: T) -> Result<()> {
        let name = entity_name::<T>();
        self.stage(PendingChange {
            entity_type: name,
            check: validation(entity.clone()),
            apply: Box::new(move |db| {
                let table = db.table::<T>()?;
                let key = entity.key();
                {
                    let mut rows = write_rows(&table);
                    if rows.iter().any(|row| row.key() == key) {
                        return Err(StoreError::constraint_violation(
                            StoreOperation::SaveChanges,
                            format!("an entity with key {key:?} already exists"),
                        )
                        .with_entity(name));
                    }
                    rows.push(entity.clone());
                }
                Ok(Box::new(move || {
                    write_rows(&table).retain(|row| row.key() != key);
                }) as Undo)
            }),
        })
    }

    fn stage_update<T: Entity>(&self, entity: T) -> Result<()> {
        let name = entity_name::<T>();
        self.stage(PendingChange {
            entity_type: name,
            check: validation(entity.clone()),
            apply: Box::new(move |db| {
                let table = db.table::<T>()?;
                let key = entity.key();
                let previous = {
                    let mut rows = write_rows(&table);
                    let slot = rows.iter_mut().find(|row| row.key() == key).ok_or_else(|| {
                        StoreError::constraint_violation(
                            StoreOperation::SaveChanges,
                            format!("no entity with key {key:?} to update"),
                        )
                        .with_entity(name)
                    })?;
                    mem::replace(slot, entity.clone())
                };
                Ok(Box::new(move || {
                    if let Some(slot) = write_rows(&table).iter_mut().find(|row| row.key() == key) {
                        *slot = previous;
                    }
                }) as Undo)
            }),
        })
    }

    fn stage_remove<T: Entity>(&self, key: T::Key) -> Result<()> {
        let name = entity_name::<T>();
        self.stage(PendingChange {
            entity_type: name,
            check: Box::new(|| Ok(())),
            apply: Box::new(move |db| {
                let table = db.table::<T>()?;
                let (index, removed) = {
                    let mut rows = write_rows(&table);
                    let index = rows.iter().position(|row| row.key() == key).ok_or_else(|| {
                        StoreError::constraint_violation(
                            StoreOperation::SaveChanges,
                            format!("no entity with key {key:?} to remove"),
                        )
                        .with_entity(name)
                    })?;
                    (index, rows.remove(index))
                };
                Ok(Box::new(move || {
                    let mut rows = write_rows(&table);
                    let at = index.min(rows.len());
                    rows.insert(at, removed);
                }) as Undo)
            }),
        })
    }

    fn pending_changes(&self) -> usize {
        lock(&self.session.pending).len()
    }

    fn discard_changes(&self) {
        let discarded = mem::take(&mut *lock(&self.session.pending)).len();
        if discarded > 0 {
            tracing::debug!(discarded, "Staged changes discarded");
        }
    }

    async fn save_changes(&self, cancel: &CancellationToken) -> Result<u64> {
        self.ensure_open(StoreOperation::SaveChanges)?;
        checkpoint(cancel).await?;

        let changes = mem::take(&mut *lock(&self.session.pending));
        if changes.is_empty() {
            return Ok(0);
        }

        if let Err(err) = changes.iter().try_for_each(|change| (change.check)()) {
            tracing::debug!(error = %err, "Staged change failed validation");
            self.restore_pending(changes);
            return Err(err.into());
        }

        let mut undo = Vec::with_capacity(changes.len());
        for change in &changes {
            match (change.apply)(&self.db) {
                Ok(step) => undo.push(step),
                Err(err) => {
                    tracing::debug!(
                        error = %err,
                        applied = undo.len(),
                        "Save failed; undoing applied changes"
                    );
                    for step in undo.into_iter().rev() {
                        step();
                    }
                    self.restore_pending(changes);
                    return Err(err.into());
                }
            }
        }

        let saved = undo.len() as u64;
        if let Some(journal) = lock(&self.session.journal).as_mut() {
            journal.undo.extend(undo);
        }
        tracing::debug!(saved, "Staged changes saved");
        Ok(saved)
    }

    async fn begin_transaction(&self, cancel: &CancellationToken) -> Result<MemoryTransaction> {
        self.ensure_open(StoreOperation::BeginTransaction)?;
        checkpoint(cancel).await?;

        let id = Uuid::new_v4();
        {
            let mut slot = lock(&self.session.journal);
            if slot.is_some() {
                return Err(StoreError::transaction_failed(
                    StoreOperation::BeginTransaction,
                    "a transaction is already active on this store",
                )
                .into());
            }
            *slot = Some(Journal {
                id,
                undo: Vec::new(),
            });
        }
        tracing::debug!(transaction_id = %id, "Transaction started");
        Ok(MemoryTransaction {
            id,
            session: Arc::clone(&self.session),
            finished: false,
        })
    }

    fn close(&self) {
        if self.session.closed.swap(true, AtomicOrdering::AcqRel) {
            return;
        }
        self.discard_changes();
        if let Some(undone) = self.session.roll_back(None) {
            tracing::warn!(undone, "Store closed with an open transaction; changes rolled back");
        }
        tracing::debug!("Memory store closed");
    }

    fn is_closed(&self) -> bool {
        self.session.closed.load(AtomicOrdering::Acquire)
    }
}

impl fmt::Debug for MemoryStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryStore")
            .field("pending", &self.pending_changes())
            .field("closed", &self.is_closed())
            .finish()
    }
}

/// Transaction on a [`MemoryStore`] session
///
/// Dropping it without calling `commit` or `rollback` rolls it back.
pub struct MemoryTransaction {
    id: Uuid,
    session: Arc<Session>,
    finished: bool,
}

impl StoreTransaction for MemoryTransaction {
    fn id(&self) -> Uuid {
        self.id
    }

    async fn commit(mut self, cancel: &CancellationToken) -> Result<()> {
        checkpoint(cancel).await?;
        if self.session.closed.load(AtomicOrdering::Acquire) {
            return Err(StoreError::closed(StoreOperation::Commit).into());
        }

        let journal = {
            let mut slot = lock(&self.session.journal);
            if !slot.as_ref().is_some_and(|journal| journal.id == self.id) {
                return Err(StoreError::transaction_failed(
                    StoreOperation::Commit,
                    "transaction is no longer active",
                )
                .into());
            }
            slot.take()
        };
        self.finished = true;
        let changes = journal.map_or(0, |journal| journal.undo.len());
        tracing::debug!(transaction_id = %self.id, changes, "Transaction committed");
        Ok(())
    }

    async fn rollback(mut self, _cancel: &CancellationToken) -> Result<()> {
        self.finished = true;
        let undone = self.session.roll_back(Some(self.id)).unwrap_or(0);
        tracing::debug!(transaction_id = %self.id, undone, "Transaction rolled back");
        Ok(())
    }
}

impl Drop for MemoryTransaction {
    fn drop(&mut self) {
        if self.finished {
            return;
        }
        if let Some(undone) = self.session.roll_back(Some(self.id)) {
            tracing::warn!(
                transaction_id = %self.id,
                undone,
                "Transaction dropped while active; changes rolled back"
            );
        }
    }
}

impl fmt::Debug for MemoryTransaction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryTransaction")
            .field("id", &self.id)
            .field("finished", &self.finished)
            .finish()
    }
}

enum Op<T> {
    Filter(Predicate<T>),
    Order(Vec<(PropertyPath<T>, SortDirection)>),
    Skip(u64),
    Take(u64),
}

impl<T> Clone for Op<T> {
    fn clone(&self) -> Self {
        match self {
            Self::Filter(predicate) => Self::Filter(Arc::clone(predicate)),
            Self::Order(keys) => Self::Order(keys.clone()),
            Self::Skip(n) => Self::Skip(*n),
            Self::Take(n) => Self::Take(*n),
        }
    }
}

/// Queryable over one table of a [`MemoryStore`]
///
/// Operations are recorded and evaluated in call order against a snapshot of
/// the table when the query is counted or materialized. Ordering uses a
/// stable sort over the composite key, so `then_by` only reorders entities
/// that tie on every earlier key.
pub struct MemoryQuery<T> {
    db: MemoryDatabase,
    session: Arc<Session>,
    ops: Vec<Op<T>>,
    includes: Vec<String>,
    tracking: Tracking,
}

impl<T: Entity> MemoryQuery<T> {
    /// Requested tracking mode
    pub fn tracking(&self) -> Tracking {
        self.tracking
    }

    /// Requested eager-load paths
    ///
    /// In-memory entities own their related records, so these are recorded
    /// but have no effect on the results.
    pub fn includes(&self) -> &[String] {
        &self.includes
    }

    fn execute(&self, operation: StoreOperation) -> Result<Vec<T>> {
        if self.session.closed.load(AtomicOrdering::Acquire) {
            return Err(StoreError::closed(operation)
                .with_entity(entity_name::<T>())
                .into());
        }
        let table = self.db.table::<T>()?;
        let mut rows = read_rows(&table).to_vec();
        for op in &self.ops {
            match op {
                Op::Filter(predicate) => rows.retain(|row| predicate(row)),
                Op::Order(keys) => rows.sort_by(|a, b| compare_keys(keys, a, b)),
                Op::Skip(n) => {
                    let n = usize::try_from(*n).unwrap_or(usize::MAX).min(rows.len());
                    rows.drain(..n);
                }
                Op::Take(n) => rows.truncate(usize::try_from(*n).unwrap_or(usize::MAX)),
            }
        }
        Ok(rows)
    }
}

fn compare_keys<T: Entity>(keys: &[(PropertyPath<T>, SortDirection)], a: &T, b: &T) -> Ordering {
    keys.iter().fold(Ordering::Equal, |ordering, (path, direction)| {
        ordering.then_with(|| direction.orient(path.read(a).compare(&path.read(b))))
    })
}

impl<T: Entity> Queryable<T> for MemoryQuery<T> {
    type Ordered = Self;

    fn filter(mut self, predicate: Predicate<T>) -> Self {
        self.ops.push(Op::Filter(predicate));
        self
    }

    fn order_by(mut self, key: &PropertyPath<T>, direction: SortDirection) -> Self {
        self.ops.push(Op::Order(vec![(key.clone(), direction)]));
        self
    }

    fn skip(mut self, count: u64) -> Self {
        self.ops.push(Op::Skip(count));
        self
    }

    fn take(mut self, count: u64) -> Self {
        self.ops.push(Op::Take(count));
        self
    }

    fn include(mut self, path: &str) -> Self {
        self.includes.push(path.to_string());
        self
    }

    fn with_tracking(mut self, tracking: Tracking) -> Self {
        self.tracking = tracking;
        self
    }

    async fn count(&self, cancel: &CancellationToken) -> Result<u64> {
        checkpoint(cancel).await?;
        let count = self.execute(StoreOperation::Count)?.len() as u64;
        tracing::trace!(entity = entity_name::<T>(), count, "Counted");
        Ok(count)
    }

    async fn to_list(self, cancel: &CancellationToken) -> Result<Vec<T>> {
        checkpoint(cancel).await?;
        let rows = self.execute(StoreOperation::Materialize)?;
        tracing::trace!(
            entity = entity_name::<T>(),
            rows = rows.len(),
            tracking = ?self.tracking,
            "Materialized"
        );
        Ok(rows)
    }
}

impl<T: Entity> OrderedQueryable<T> for MemoryQuery<T> {
    /// Extend the most recent ordering with a tie-breaking key
    fn then_by(mut self, key: &PropertyPath<T>, direction: SortDirection) -> Self {
        let entry = (key.clone(), direction);
        match self.ops.iter().rposition(|op| matches!(op, Op::Order(_))) {
            Some(index) => {
                if let Op::Order(keys) = &mut self.ops[index] {
                    keys.push(entry);
                }
            }
            None => self.ops.push(Op::Order(vec![entry])),
        }
        self
    }
}

impl<T> Clone for MemoryQuery<T> {
    fn clone(&self) -> Self {
        Self {
            db: self.db.clone(),
            session: Arc::clone(&self.session),
            ops: self.ops.clone(),
            includes: self.includes.clone(),
            tracking: self.tracking,
        }
    }
}

impl<T> fmt::Debug for MemoryQuery<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryQuery")
            .field("ops", &self.ops.len())
            .field("includes", &self.includes)
            .field("tracking", &self.tracking)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{people, Person};

    fn seeded() -> MemoryStore {
        let store = MemoryStore::new();
        store.seed(people()).unwrap();
        store
    }

    fn path(name: &str) -> PropertyPath<Person> {
        PropertyPath::resolve(name, Default::default()).unwrap()
    }

    fn ids(rows: &[Person]) -> Vec<i64> {
        rows.iter().map(|p| p.id).collect()
    }

    #[tokio::test]
    async fn test_staged_changes_are_invisible_until_saved() {
        let store = seeded();
        let cancel = CancellationToken::new();
        store
            .stage_add(Person::new(10, "Barbara", "McClintock", 90))
            .unwrap();
        assert_eq!(store.pending_changes(), 1);
        assert_eq!(store.query::<Person>().count(&cancel).await.unwrap(), 9);

        assert_eq!(store.save_changes(&cancel).await.unwrap(), 1);
        assert_eq!(store.pending_changes(), 0);
        assert_eq!(store.query::<Person>().count(&cancel).await.unwrap(), 10);
    }

    #[tokio::test]
    async fn test_save_is_all_or_nothing() {
        let store = seeded();
        let cancel = CancellationToken::new();
        store.stage_add(Person::new(10, "New", "Person", 1)).unwrap();
        store.stage_remove::<Person>(1).unwrap();
        store.stage_add(Person::new(2, "Dup", "Licate", 1)).unwrap();

        let err = store.save_changes(&cancel).await.unwrap_err();
        match err {
            Error::Store(store_err) => {
                assert_eq!(store_err.kind, StoreErrorKind::ConstraintViolation);
                assert_eq!(store_err.entity_type.as_deref(), Some("Person"));
            }
            other => panic!("unexpected error: {other:?}"),
        }

        let rows = store.database().rows::<Person>().unwrap();
        assert_eq!(ids(&rows), (1..=9).collect::<Vec<_>>());
        assert_eq!(store.pending_changes(), 3);
    }

    #[tokio::test]
    async fn test_validation_runs_before_anything_is_applied() {
        let store = seeded();
        store.stage_add(Person::new(10, "Fine", "Person", 1)).unwrap();
        store.stage_update(Person::new(1, "Grace", " ", 85)).unwrap();

        let err = store.save_changes(&CancellationToken::new()).await.unwrap_err();
        assert!(matches!(
            err,
            Error::Store(StoreError { kind: StoreErrorKind::ValidationFailed, .. })
        ));
        assert_eq!(store.database().rows::<Person>().unwrap().len(), 9);
    }

    #[tokio::test]
    async fn test_update_and_remove_require_existing_keys() {
        let store = seeded();
        let cancel = CancellationToken::new();

        store.stage_update(Person::new(42, "No", "Body", 1)).unwrap();
        assert!(store.save_changes(&cancel).await.is_err());
        store.discard_changes();

        store.stage_remove::<Person>(42).unwrap();
        assert!(store.save_changes(&cancel).await.is_err());
        store.discard_changes();

        store.stage_update(Person::new(1, "Grace", "Murray Hopper", 85)).unwrap();
        store.stage_remove::<Person>(2).unwrap();
        assert_eq!(store.save_changes(&cancel).await.unwrap(), 2);
        let rows = store.database().rows::<Person>().unwrap();
        assert_eq!(rows[0].family_name, "Murray Hopper");
        assert!(rows.iter().all(|p| p.id != 2));
    }

    #[tokio::test]
    async fn test_rollback_undoes_saved_changes() {
        let store = seeded();
        let cancel = CancellationToken::new();
        let tx = store.begin_transaction(&cancel).await.unwrap();

        store.stage_remove::<Person>(3).unwrap();
        store.stage_update(Person::new(1, "Grace", "Renamed", 85)).unwrap();
        store.stage_add(Person::new(10, "New", "Person", 1)).unwrap();
        store.save_changes(&cancel).await.unwrap();
        assert_eq!(store.database().rows::<Person>().unwrap().len(), 9);

        tx.rollback(&cancel).await.unwrap();
        assert_eq!(store.database().rows::<Person>().unwrap(), people());
    }

    #[tokio::test]
    async fn test_commit_keeps_changes_and_frees_the_slot() {
        let store = seeded();
        let cancel = CancellationToken::new();
        let tx = store.begin_transaction(&cancel).await.unwrap();
        store.stage_remove::<Person>(3).unwrap();
        store.save_changes(&cancel).await.unwrap();
        tx.commit(&cancel).await.unwrap();

        assert_eq!(store.database().rows::<Person>().unwrap().len(), 8);
        let again = store.begin_transaction(&cancel).await.unwrap();
        again.commit(&cancel).await.unwrap();
    }

    #[tokio::test]
    async fn test_second_transaction_is_rejected() {
        let store = MemoryStore::new();
        let cancel = CancellationToken::new();
        let _tx = store.begin_transaction(&cancel).await.unwrap();
        let err = store.begin_transaction(&cancel).await.unwrap_err();
        assert!(matches!(
            err,
            Error::Store(StoreError { kind: StoreErrorKind::TransactionFailed, .. })
        ));
    }

    #[tokio::test]
    async fn test_dropped_transaction_rolls_back() {
        let store = seeded();
        let cancel = CancellationToken::new();
        {
            let _tx = store.begin_transaction(&cancel).await.unwrap();
            store.stage_remove::<Person>(1).unwrap();
            store.save_changes(&cancel).await.unwrap();
        }
        assert_eq!(store.database().rows::<Person>().unwrap().len(), 9);
    }

    #[tokio::test]
    async fn test_closed_store_rejects_work() {
        let store = seeded();
        let cancel = CancellationToken::new();
        store.close();
        store.close();
        assert!(store.is_closed());

        let err = store.query::<Person>().count(&cancel).await.unwrap_err();
        assert!(matches!(
            err,
            Error::Store(StoreError { kind: StoreErrorKind::ConnectionFailed, operation: StoreOperation::Count, .. })
        ));
        assert!(store.stage_add(Person::new(10, "A", "B", 1)).is_err());

        let other = MemoryStore::open(store.database());
        assert_eq!(other.query::<Person>().count(&cancel).await.unwrap(), 9);
    }

    #[tokio::test]
    async fn test_query_ops_compose_in_call_order() {
        let store = seeded();
        let cancel = CancellationToken::new();
        let over_80: Predicate<Person> = Arc::new(|p: &Person| p.age.is_some_and(|a| a > 80));

        let rows = store
            .query::<Person>()
            .filter(over_80)
            .order_by(&path("Age"), SortDirection::Descending)
            .skip(1)
            .take(3)
            .to_list(&cancel)
            .await
            .unwrap();
        // ages over 80, descending: Allen 88, Knuth 86, Hopper 85, Liskov 84, Backus 82, Thompson 81
        assert_eq!(ids(&rows), vec![6, 1, 5]);
    }

    #[tokio::test]
    async fn test_then_by_only_breaks_ties() {
        let store = MemoryStore::new();
        store
            .seed(vec![
                Person::new(1, "B", "Smith", 30),
                Person::new(2, "A", "Jones", 30),
                Person::new(3, "C", "Smith", 40),
                Person::new(4, "D", "Jones", 40).without_age(),
            ])
            .unwrap();

        let rows = store
            .query::<Person>()
            .order_by(&path("FamilyName"), SortDirection::Ascending)
            .then_by(&path("Age"), SortDirection::Descending)
            .to_list(&CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(ids(&rows), vec![2, 4, 3, 1]);
    }

    #[tokio::test]
    async fn test_cancelled_token_short_circuits() {
        let store = seeded();
        let cancel = CancellationToken::new();
        cancel.cancel();
        assert!(store.query::<Person>().count(&cancel).await.unwrap_err().is_cancelled());
        assert!(store.save_changes(&cancel).await.unwrap_err().is_cancelled());
    }

    #[test]
    fn test_tracking_and_includes_pass_through() {
        let query = MemoryStore::new()
            .query::<Person>()
            .include("FavoriteBook.Author")
            .with_tracking(Tracking::NoTracking);
        assert_eq!(query.tracking(), Tracking::NoTracking);
        assert_eq!(query.includes(), ["FavoriteBook.Author"]);
    }
}
