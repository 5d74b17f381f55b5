//! Entity contract

use std::fmt::Debug;
use std::hash::Hash;

use crate::reflect::Reflect;

/// An identity-bearing record managed by a repository
///
/// The data-access layer never inspects entity fields directly; everything it
/// needs goes through [`Reflect`] (for criteria) and [`Entity::key`] (for
/// staging updates and removals).
pub trait Entity: Reflect + Clone + Send + Sync + 'static {
    /// Identity key type
    type Key: Eq + Hash + Clone + Debug + Send + Sync + 'static;

    /// Identity of this entity
    fn key(&self) -> Self::Key;

    /// Check the entity before it is persisted
    ///
    /// Stores that support validation call this for every staged add and
    /// update during `save_changes`. The default accepts everything.
    fn validate(&self) -> std::result::Result<(), String> {
        Ok(())
    }
}

/// Type name used in logs and errors
pub(crate) fn entity_name<T: Entity>() -> &'static str {
    T::type_info().name
}
