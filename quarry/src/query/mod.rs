//! Query composition
//!
//! Building blocks for reads against a [`Queryable`] sequence:
//!
//! - [`FilterCriterion`]: a composable predicate, with [`FilterCriterion::all`]
//!   as the pass-through filter
//! - [`SortCriterion`]: one validated sort key and its direction
//! - [`PaginationCriteria`]: page position plus ordered sort keys, and the
//!   paginator that turns a filtered sequence into a [`PaginatedList`]
//! - [`IncludePaths`]: eager-load paths passed through to the store
//!
//! None of these reach the store until a terminal operation runs.

mod filter;
mod include;
mod paginated;
mod pagination;
mod queryable;
mod sort;

pub use filter::{FilterCriterion, Specification};
pub use include::{IncludeChain, IncludePaths};
pub use paginated::PaginatedList;
pub use pagination::{PaginationCriteria, DEFAULT_PAGE_SIZE};
pub use queryable::{OrderedQueryable, Predicate, Queryable, Tracking};
pub use sort::{order_with, parse_sort_directives, SortCriterion, SortDirection};
