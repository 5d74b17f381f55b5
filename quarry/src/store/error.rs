//! Backing store error types
//!
//! Structured errors for failures inside a [`DataStore`](super::DataStore),
//! carrying the operation that failed and a coarse category so callers can
//! decide whether to retry.
//!
//! # Example
//!
//! ```rust
//! use quarry::store::{StoreError, StoreErrorKind, StoreOperation};
//!
//! let error = StoreError::constraint_violation(StoreOperation::SaveChanges, "duplicate key")
//!     .with_entity("Person");
//! assert!(matches!(error.kind, StoreErrorKind::ConstraintViolation));
//! assert!(!error.is_retriable());
//! ```

use std::fmt;

/// Store operation being performed when the error occurred
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreOperation {
    /// Building a queryable sequence
    Query,
    /// Counting a queryable sequence
    Count,
    /// Materializing a queryable sequence into a list
    Materialize,
    /// Staging an add, update or remove
    Stage,
    /// Persisting staged changes
    SaveChanges,
    /// Opening a transaction
    BeginTransaction,
    /// Committing a transaction
    Commit,
    /// Rolling back a transaction
    Rollback,
    /// Releasing the store handle
    Close,
}

impl fmt::Display for StoreOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Query => write!(f, "query"),
            Self::Count => write!(f, "count"),
            Self::Materialize => write!(f, "materialize"),
            Self::Stage => write!(f, "stage"),
            Self::SaveChanges => write!(f, "save_changes"),
            Self::BeginTransaction => write!(f, "begin_transaction"),
            Self::Commit => write!(f, "commit"),
            Self::Rollback => write!(f, "rollback"),
            Self::Close => write!(f, "close"),
        }
    }
}

/// Category of store error
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreErrorKind {
    /// Key or uniqueness constraint violated
    ConstraintViolation,
    /// An entity failed validation before persisting
    ValidationFailed,
    /// The store handle is closed or unreachable
    ConnectionFailed,
    /// Transaction could not be opened, committed or rolled back
    TransactionFailed,
    /// Operation timed out
    Timeout,
    /// Other unclassified error
    Other,
}

impl fmt::Display for StoreErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ConstraintViolation => write!(f, "constraint_violation"),
            Self::ValidationFailed => write!(f, "validation_failed"),
            Self::ConnectionFailed => write!(f, "connection_failed"),
            Self::TransactionFailed => write!(f, "transaction_failed"),
            Self::Timeout => write!(f, "timeout"),
            Self::Other => write!(f, "other"),
        }
    }
}

/// Structured store error with operation context
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreError {
    /// The operation being performed when the error occurred
    pub operation: StoreOperation,
    /// The category of error
    pub kind: StoreErrorKind,
    /// Human-readable error message
    pub message: String,
    /// The entity type involved, if any
    pub entity_type: Option<String>,
}

impl StoreError {
    /// Create a new store error
    pub fn new(operation: StoreOperation, kind: StoreErrorKind, message: impl Into<String>) -> Self {
        Self {
            operation,
            kind,
            message: message.into(),
            entity_type: None,
        }
    }

    /// Create a constraint violation error
    pub fn constraint_violation(operation: StoreOperation, message: impl Into<String>) -> Self {
        Self::new(operation, StoreErrorKind::ConstraintViolation, message)
    }

    /// Create a validation failed error
    pub fn validation_failed(message: impl Into<String>) -> Self {
        Self::new(
            StoreOperation::SaveChanges,
            StoreErrorKind::ValidationFailed,
            message,
        )
    }

    /// Create an error for an operation on a closed store
    pub fn closed(operation: StoreOperation) -> Self {
        Self::new(
            operation,
            StoreErrorKind::ConnectionFailed,
            "store handle has been closed",
        )
    }

    /// Create a transaction error
    pub fn transaction_failed(operation: StoreOperation, message: impl Into<String>) -> Self {
        Self::new(operation, StoreErrorKind::TransactionFailed, message)
    }

    /// Add entity context to an existing error
    #[must_use]
    pub fn with_entity(mut self, entity_type: impl Into<String>) -> Self {
        self.entity_type = Some(entity_type.into());
        self
    }

    /// Check if this error is retriable (transient errors that may succeed on retry)
    pub fn is_retriable(&self) -> bool {
        matches!(
            self.kind,
            StoreErrorKind::ConnectionFailed | StoreErrorKind::Timeout
        )
    }
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Store {} error during {}: {}",
            self.kind, self.operation, self.message
        )?;
        if let Some(ref entity_type) = self.entity_type {
            write!(f, " [{}]", entity_type)?;
        }
        Ok(())
    }
}

impl std::error::Error for StoreError {}
