//! # quarry
//!
//! Unit-of-Work and Repository data access with composable filter, sort and
//! pagination criteria.
//!
//! ## Features
//!
//! - **Unit of Work**: one store handle, lazily created repositories, at most
//!   one transaction, a `completed` notification on successful commit
//! - **Repositories**: staging (`add`, `update`, `remove`) and reads (`any`,
//!   `count`, `first_or_default`, `single_or_default`, `list`, `paginate`)
//! - **Criteria**: composable filters, validated sort keys, `"Name,-Age"`
//!   sort strings, eager-load include paths
//! - **Pagination**: count-then-fetch paging into a serializable
//!   [`PaginatedList`](query::PaginatedList)
//! - **Cancellation**: every suspending call takes a
//!   [`CancellationToken`](tokio_util::sync::CancellationToken)
//!
//! ## Example
//!
//! ```rust,ignore
//! use quarry::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let config = Config::load()?;
//!     init_tracing(&config)?;
//!
//!     let uow = UnitOfWork::with_factory(
//!         MemoryStore::new(),
//!         DefaultRepositoryFactory::from_config(&config.repository),
//!     );
//!     let people = uow.repository::<Person>()?;
//!     people.add(Person::new(1, "Grace", "Hopper", 85))?;
//!     uow.complete().await?;
//!
//!     let page = people
//!         .query()
//!         .paginate(&PaginationCriteria::from_config(&config.query)?.sorted_by_string("FamilyName")?)
//!         .await?;
//!     println!("{} of {}", page.len(), page.total_count());
//!
//!     uow.dispose().await;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod entity;
pub mod error;
pub mod observability;
pub mod query;
pub mod reflect;
pub mod repository;
pub mod store;
pub mod unit_of_work;

#[cfg(test)]
mod test_support;

pub use config::Config;
pub use entity::Entity;
pub use error::{Error, Result};
pub use unit_of_work::{UnitOfWork, UnitOfWorkState};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::config::{Config, LoggingConfig, QueryConfig, RepositoryConfig};
    pub use crate::entity::Entity;
    pub use crate::error::{Error, Result};
    pub use crate::observability::init_tracing;
    pub use crate::query::{
        FilterCriterion, IncludePaths, PaginatedList, PaginationCriteria, SortCriterion,
        SortDirection, Specification, Tracking,
    };
    pub use crate::reflect::{
        FieldRef, PathMatching, Prop, PropertyInfo, PropertyPath, Reflect, TypeInfo, Value,
        ValueKind,
    };
    pub use crate::repository::{
        DefaultRepositoryFactory, Repository, RepositoryFactory, RepositoryOptions,
    };
    pub use crate::store::{
        DataStore, MemoryDatabase, MemoryStore, StoreError, StoreErrorKind, StoreTransaction,
    };
    pub use crate::unit_of_work::{UnitOfWork, UnitOfWorkState};

    pub use tokio_util::sync::CancellationToken;
}
