//! Filter criteria
//!
//! A [`FilterCriterion`] wraps a predicate over `T`; applying it keeps only the
//! entities the predicate accepts. [`FilterCriterion::all`] is the identity
//! filter used as the default wherever a filter is optional.
//!
//! # Example
//!
//! ```rust
//! use quarry::query::FilterCriterion;
//!
//! let adults = FilterCriterion::new(|age: &u32| *age >= 18);
//! let teens = FilterCriterion::new(|age: &u32| (13..20).contains(age));
//! let adult_teens = adults.and(teens);
//!
//! assert!(adult_teens.matches(&19));
//! assert!(!adult_teens.matches(&21));
//! assert!(FilterCriterion::<u32>::all().matches(&0));
//! ```

use std::fmt;
use std::sync::Arc;

use super::queryable::{Predicate, Queryable};
use crate::error::{Error, Result};

/// A value object that encapsulates a fixed predicate
pub trait Specification<T>: Send + Sync + 'static {
    /// Whether `entity` satisfies the specification
    fn is_satisfied_by(&self, entity: &T) -> bool;
}

/// Boolean predicate over `T`, or the pass-through filter
pub struct FilterCriterion<T> {
    predicate: Option<Predicate<T>>,
}

impl<T: 'static> FilterCriterion<T> {
    /// Wrap a predicate
    pub fn new<F>(predicate: F) -> Self
    where
        F: Fn(&T) -> bool + Send + Sync + 'static,
    {
        Self {
            predicate: Some(Arc::new(predicate)),
        }
    }

    /// Wrap an optional predicate
    ///
    /// # Errors
    ///
    /// [`Error::NullArgument`] when `predicate` is `None`.
    pub fn from_option<F>(predicate: Option<F>) -> Result<Self>
    where
        F: Fn(&T) -> bool + Send + Sync + 'static,
    {
        predicate
            .map(Self::new)
            .ok_or(Error::NullArgument {
                parameter: "predicate",
            })
    }

    /// Wrap a [`Specification`]
    pub fn from_specification<S: Specification<T>>(specification: S) -> Self {
        Self::new(move |entity| specification.is_satisfied_by(entity))
    }

    /// Filter that matches every entity
    pub fn all() -> Self {
        Self { predicate: None }
    }

    /// Entities matching both filters
    #[must_use]
    pub fn and(self, other: Self) -> Self {
        match (self.predicate, other.predicate) {
            (None, rhs) => Self { predicate: rhs },
            (lhs, None) => Self { predicate: lhs },
            (Some(lhs), Some(rhs)) => Self::new(move |entity| lhs(entity) && rhs(entity)),
        }
    }

    /// Entities matching either filter
    #[must_use]
    pub fn or(self, other: Self) -> Self {
        match (self.predicate, other.predicate) {
            (Some(lhs), Some(rhs)) => Self::new(move |entity| lhs(entity) || rhs(entity)),
            _ => Self::all(),
        }
    }

    /// Entities not matching this filter
    #[must_use]
    pub fn not(self) -> Self {
        match self.predicate {
            Some(inner) => Self::new(move |entity| !inner(entity)),
            None => Self::new(|_| false),
        }
    }

    /// Whether `entity` passes the filter
    pub fn matches(&self, entity: &T) -> bool {
        self.predicate.as_ref().map_or(true, |p| p(entity))
    }

    /// Whether this is the identity filter
    pub fn is_pass_through(&self) -> bool {
        self.predicate.is_none()
    }

    /// Restrict `queryable` to matching entities
    ///
    /// The pass-through filter returns the queryable untouched.
    pub fn apply<Q: Queryable<T>>(&self, queryable: Q) -> Q {
        match &self.predicate {
            Some(predicate) => queryable.filter(Arc::clone(predicate)),
            None => queryable,
        }
    }
}

impl<T: 'static> Default for FilterCriterion<T> {
    fn default() -> Self {
        Self::all()
    }
}

impl<T> Clone for FilterCriterion<T> {
    fn clone(&self) -> Self {
        Self {
            predicate: self.predicate.clone(),
        }
    }
}

impl<T> fmt::Debug for FilterCriterion<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = if self.predicate.is_some() {
            "predicate"
        } else {
            "pass_through"
        };
        f.debug_tuple("FilterCriterion").field(&kind).finish()
    }
}
