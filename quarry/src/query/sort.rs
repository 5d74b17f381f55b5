//! Sort criteria and the sort-string parser
//!
//! A list of [`SortCriterion`] values is applied in order: the first entry is
//! the primary key and every later entry only breaks ties left by the keys
//! before it.
//!
//! # Example
//!
//! ```rust,ignore
//! use quarry::query::{parse_sort_directives, SortDirection};
//! use quarry::reflect::PathMatching;
//!
//! let criteria = parse_sort_directives::<Person>("FamilyName,-Age", PathMatching::CaseInsensitive)?;
//! assert_eq!(criteria[0].direction(), SortDirection::Ascending);
//! assert_eq!(criteria[1].direction(), SortDirection::Descending);
//! ```

use std::cmp::Ordering;
use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use super::queryable::{OrderedQueryable, Queryable};
use crate::error::{Error, Result};
use crate::reflect::{PathMatching, PropertyPath, Reflect, Selector};

/// Direction for ordering results
///
/// # Example
///
/// ```rust
/// use quarry::query::SortDirection;
///
/// assert_eq!(format!("{}", SortDirection::Ascending), "asc");
/// assert_eq!(SortDirection::Ascending.reverse(), SortDirection::Descending);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortDirection {
    /// Natural increasing order, absent values first
    #[default]
    Ascending,
    /// Reverse of ascending
    Descending,
}

impl SortDirection {
    /// The opposite direction
    #[must_use]
    pub const fn reverse(self) -> Self {
        match self {
            Self::Ascending => Self::Descending,
            Self::Descending => Self::Ascending,
        }
    }

    pub(crate) fn orient(self, ordering: Ordering) -> Ordering {
        match self {
            Self::Ascending => ordering,
            Self::Descending => ordering.reverse(),
        }
    }
}

impl fmt::Display for SortDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ascending => write!(f, "asc"),
            Self::Descending => write!(f, "desc"),
        }
    }
}

/// One sort key: a resolved property path plus a direction
///
/// Immutable once constructed.
pub struct SortCriterion<T> {
    path: PropertyPath<T>,
    direction: SortDirection,
}

impl<T: Reflect> SortCriterion<T> {
    /// Create a criterion from an already resolved path
    ///
    /// # Errors
    ///
    /// [`Error::InvalidArgument`] if the path ends on a related record or
    /// navigates through a collection.
    pub fn new(path: PropertyPath<T>, direction: SortDirection) -> Result<Self> {
        if !path.is_sortable() {
            return Err(Error::invalid_argument(
                "path",
                format!("`{path}` does not end on a sortable scalar property"),
            ));
        }
        Ok(Self { path, direction })
    }

    /// Resolve `name` case-sensitively and build a criterion
    pub fn by_name(name: &str, direction: SortDirection) -> Result<Self> {
        Self::new(PropertyPath::resolve(name, PathMatching::CaseSensitive)?, direction)
    }

    /// Build a criterion from a typed selector
    pub fn by_selector<V>(
        selector: impl Into<Selector<T, V>>,
        direction: SortDirection,
    ) -> Result<Self> {
        Self::new(selector.into().to_path()?, direction)
    }

    /// Compare two entities under this key and direction
    pub fn compare(&self, a: &T, b: &T) -> Ordering {
        self.direction
            .orient(self.path.read(a).compare(&self.path.read(b)))
    }

    /// Apply as the primary ordering
    pub fn apply<Q: Queryable<T>>(&self, queryable: Q) -> Q::Ordered {
        queryable.order_by(&self.path, self.direction)
    }

    /// Apply as a stable secondary ordering over an ordered sequence
    pub fn apply_as_tie_break<O: OrderedQueryable<T>>(&self, ordered: O) -> O {
        ordered.then_by(&self.path, self.direction)
    }
}

impl<T> SortCriterion<T> {
    /// Resolved property path
    pub fn path(&self) -> &PropertyPath<T> {
        &self.path
    }

    /// Sort direction
    pub fn direction(&self) -> SortDirection {
        self.direction
    }
}

impl<T> Clone for SortCriterion<T> {
    fn clone(&self) -> Self {
        Self {
            path: self.path.clone(),
            direction: self.direction,
        }
    }
}

impl<T> PartialEq for SortCriterion<T> {
    fn eq(&self, other: &Self) -> bool {
        self.path == other.path && self.direction == other.direction
    }
}

impl<T> fmt::Debug for SortCriterion<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SortCriterion")
            .field("path", &self.path.as_str())
            .field("direction", &self.direction)
            .finish()
    }
}

impl<T> fmt::Display for SortCriterion<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.path, self.direction)
    }
}

/// Order `queryable` by `primary`, then by each tie-breaker in turn
pub fn order_with<T, Q>(
    primary: &SortCriterion<T>,
    tie_breakers: &[SortCriterion<T>],
    queryable: Q,
) -> Q::Ordered
where
    T: Reflect,
    Q: Queryable<T>,
{
    tie_breakers
        .iter()
        .fold(primary.apply(queryable), |ordered, criterion| {
            criterion.apply_as_tie_break(ordered)
        })
}

/// One sort directive: optional sign, then a name with optional parentheses
static DIRECTIVE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*([+-]?)\s*(?:\(\s*([^()]*?)\s*\)|([^()]*?))\s*$")
        .expect("sort directive regex is valid")
});

/// Parse a comma-separated sort string into criteria
///
/// Each directive is a property path, optionally prefixed with `+`
/// (ascending, the default) or `-` (descending), optionally wrapped in
/// parentheses: `"FamilyName,-Age"`, `"+(FavoriteBook.Title)"`.
///
/// # Errors
///
/// - [`Error::InvalidArgument`] if `input` is blank
/// - [`Error::Format`] for the first directive that is malformed or does not
///   resolve; its source is the underlying resolution failure
pub fn parse_sort_directives<T: Reflect>(
    input: &str,
    matching: PathMatching,
) -> Result<Vec<SortCriterion<T>>> {
    if input.trim().is_empty() {
        return Err(Error::invalid_argument("sort", "sort string must not be blank"));
    }
    input
        .split(',')
        .map(|directive| parse_directive(directive, matching))
        .collect()
}

fn parse_directive<T: Reflect>(directive: &str, matching: PathMatching) -> Result<SortCriterion<T>> {
    let format_error = |source: Error| Error::Format {
        directive: directive.to_string(),
        source: Box::new(source),
    };

    let captures = DIRECTIVE
        .captures(directive)
        .ok_or_else(|| format_error(Error::property_not_found(directive.trim(), T::type_info().name)))?;

    let direction = match captures.get(1).map(|m| m.as_str()) {
        Some("-") => SortDirection::Descending,
        _ => SortDirection::Ascending,
    };
    let name = captures
        .get(2)
        .or_else(|| captures.get(3))
        .map(|m| m.as_str().trim())
        .unwrap_or_default();
    if name.is_empty() {
        return Err(format_error(Error::property_not_found(name, T::type_info().name)));
    }

    PropertyPath::resolve(name, matching)
        .and_then(|path| SortCriterion::new(path, direction))
        .map_err(format_error)
}
