//! Error types for query criteria, repositories and the unit of work

use thiserror::Error;

use crate::store::StoreError;

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// Crate-wide error type
///
/// Validation errors (`NullArgument`, `InvalidArgument`, `OutOfRange`) are raised
/// synchronously at the point of misuse. Backing-store failures arrive as
/// [`Error::Store`] and are handed back exactly as the store produced them.
#[derive(Debug, Error)]
pub enum Error {
    /// A required argument was missing
    #[error("Argument `{parameter}` must not be null")]
    NullArgument {
        /// Name of the missing parameter
        parameter: &'static str,
    },

    /// An argument had the wrong shape (e.g. a blank property path)
    #[error("Invalid argument `{parameter}`: {reason}")]
    InvalidArgument {
        /// Name of the offending parameter
        parameter: &'static str,
        /// What is wrong with it
        reason: String,
    },

    /// A numeric bound was violated
    #[error("Argument `{parameter}` is out of range: must be >= {minimum}, got {actual}")]
    OutOfRange {
        /// Name of the offending parameter
        parameter: &'static str,
        /// Smallest accepted value
        minimum: u64,
        /// Value that was supplied
        actual: u64,
    },

    /// A property path segment did not resolve
    #[error("Property `{property}` not found on type `{type_name}`")]
    PropertyNotFound {
        /// The segment that failed to resolve
        property: String,
        /// The type the segment was looked up on
        type_name: &'static str,
    },

    /// A sort directive could not be parsed
    #[error("Invalid sort directive `{directive}`: {source}")]
    Format {
        /// The raw directive text
        directive: String,
        /// The underlying resolution failure
        #[source]
        source: Box<Error>,
    },

    /// An operation was called in the wrong lifecycle order
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// A single-result query matched more than one entity
    #[error("Query for a single `{entity_type}` matched more than one entity")]
    MultipleResults {
        /// Entity type that was queried
        entity_type: &'static str,
    },

    /// The operation observed a cancellation signal
    #[error("Operation cancelled")]
    Cancelled,

    /// Backing store failure
    #[error("{0}")]
    Store(#[from] StoreError),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(Box<figment::Error>),

    /// Tracing subscriber could not be installed
    #[error("Tracing error: {0}")]
    Tracing(String),
}

impl Error {
    /// Shorthand for [`Error::InvalidArgument`]
    pub(crate) fn invalid_argument(parameter: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidArgument {
            parameter,
            reason: reason.into(),
        }
    }

    /// Shorthand for [`Error::PropertyNotFound`]
    pub(crate) fn property_not_found(property: impl Into<String>, type_name: &'static str) -> Self {
        Self::PropertyNotFound {
            property: property.into(),
            type_name,
        }
    }

    /// Whether this error reports a cancellation
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

impl From<figment::Error> for Error {
    fn from(err: figment::Error) -> Self {
        Error::Config(Box::new(err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{StoreErrorKind, StoreOperation};
    use std::error::Error as _;

    #[test]
    fn test_out_of_range_names_parameter_and_bound() {
        let err = Error::OutOfRange {
            parameter: "page_size",
            minimum: 1,
            actual: 0,
        };
        let message = err.to_string();
        assert!(message.contains("page_size"));
        assert!(message.contains(">= 1"));
        assert!(message.contains("got 0"));
    }

    #[test]
    fn test_format_error_exposes_source() {
        let err = Error::Format {
            directive: "-( )".to_string(),
            source: Box::new(Error::property_not_found("", "Person")),
        };
        let source = err.source().expect("format error has a source");
        assert!(source.to_string().contains("Person"));
    }

    #[test]
    fn test_store_error_passes_through_display() {
        let store = StoreError::new(
            StoreOperation::SaveChanges,
            StoreErrorKind::ConstraintViolation,
            "duplicate key",
        );
        let err: Error = store.clone().into();
        assert_eq!(err.to_string(), store.to_string());
    }

    #[test]
    fn test_is_cancelled() {
        assert!(Error::Cancelled.is_cancelled());
        assert!(!Error::InvalidState("x".into()).is_cancelled());
    }
}
