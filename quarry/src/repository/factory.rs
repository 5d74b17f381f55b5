//! Repository construction

use std::sync::Weak;

use super::{Repository, RepositoryOptions};
use crate::config::RepositoryConfig;
use crate::entity::{entity_name, Entity};
use crate::store::DataStore;

/// Creates repositories for a Unit of Work
///
/// The Unit of Work calls this at most once per entity type and caches the
/// result.
pub trait RepositoryFactory: Send + Sync + 'static {
    fn create<T: Entity, S: DataStore>(&self, store: Weak<S>) -> Repository<T, S>;
}

/// Factory that hands every repository the same options
#[derive(Debug, Clone, Default)]
pub struct DefaultRepositoryFactory {
    options: RepositoryOptions,
}

impl DefaultRepositoryFactory {
    pub fn new(options: RepositoryOptions) -> Self {
        Self { options }
    }

    /// Factory using the configured repository defaults
    pub fn from_config(config: &RepositoryConfig) -> Self {
        Self::new(RepositoryOptions {
            tracking: config.tracking,
        })
    }

    pub fn options(&self) -> RepositoryOptions {
        self.options
    }
}

impl RepositoryFactory for DefaultRepositoryFactory {
    fn create<T: Entity, S: DataStore>(&self, store: Weak<S>) -> Repository<T, S> {
        tracing::trace!(entity = entity_name::<T>(), tracking = ?self.options.tracking, "Creating repository");
        Repository::new(store, self.options)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::Tracking;
    use crate::store::MemoryStore;
    use crate::test_support::Person;
    use std::sync::Arc;

    #[test]
    fn test_from_config_carries_tracking() {
        let factory = DefaultRepositoryFactory::from_config(&RepositoryConfig {
            tracking: Tracking::NoTracking,
        });
        let store = Arc::new(MemoryStore::new());
        let repo = factory.create::<Person, _>(Arc::downgrade(&store));
        assert_eq!(repo.options().tracking, Tracking::NoTracking);
    }
}
