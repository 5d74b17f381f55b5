//! Eager-load include paths
//!
//! [`IncludePaths`] accumulates dotted paths that tell the store which related
//! records to load alongside each entity. Typed chains narrow as they go, so
//! `then_include` only accepts properties of the record reached so far:
//!
//! ```rust,ignore
//! let mut includes = IncludePaths::<Person>::new();
//! includes
//!     .include(Person::FAVORITE_BOOK)?
//!     .then_include(Book::AUTHOR)?
//!     .include(Person::BOOKS)?;
//! assert_eq!(includes.as_list(), ["FavoriteBook.Author", "Books"]);
//! ```
//!
//! Duplicate paths are kept; two independent chains may legitimately traverse
//! the same relation.

use std::fmt;
use std::marker::PhantomData;

use crate::error::{Error, Result};
use crate::reflect::{PathMatching, Prop, PropertyPath, Reflect, Selector};

/// Ordered eager-load instructions for `T`
pub struct IncludePaths<T> {
    paths: Vec<String>,
    _entity: PhantomData<fn(&T)>,
}

impl<T: Reflect> IncludePaths<T> {
    pub fn new() -> Self {
        Self {
            paths: Vec::new(),
            _entity: PhantomData,
        }
    }

    /// Append a raw path
    ///
    /// Raw paths are not resolved against `T`, so store-specific syntax
    /// passes through untouched.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidArgument`] if `path` is blank.
    pub fn include_path(&mut self, path: &str) -> Result<&mut Self> {
        let path = non_blank(path)?;
        self.paths.push(path.to_string());
        Ok(self)
    }

    /// Extend the most recently added path by a raw segment
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidState`] if nothing has been included yet
    /// - [`Error::InvalidArgument`] if `path` is blank
    pub fn then_include_path(&mut self, path: &str) -> Result<&mut Self> {
        let path = non_blank(path)?;
        let last = self
            .paths
            .last_mut()
            .ok_or_else(|| Error::InvalidState("no initial path set".to_string()))?;
        last.push('.');
        last.push_str(path);
        Ok(self)
    }

    /// Start a typed chain at `selector`
    ///
    /// # Errors
    ///
    /// [`Error::PropertyNotFound`] if the selector names an undeclared property.
    pub fn include<V>(&mut self, selector: impl Into<Selector<T, V>>) -> Result<IncludeChain<'_, T, V>> {
        let selector = selector.into();
        let path = selector.to_path()?;
        self.paths.push(path.as_str().to_string());
        Ok(IncludeChain {
            segments: selector.segments().to_vec(),
            includes: self,
            _target: PhantomData,
        })
    }
}

impl<T> IncludePaths<T> {
    /// Remove the most recently added occurrence of `path`
    ///
    /// Returns whether anything was removed.
    pub fn remove(&mut self, path: &str) -> bool {
        match self.paths.iter().rposition(|p| p == path) {
            Some(index) => {
                self.paths.remove(index);
                true
            }
            None => false,
        }
    }

    /// Paths in insertion order
    pub fn as_list(&self) -> &[String] {
        &self.paths
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    pub fn contains(&self, path: &str) -> bool {
        self.paths.iter().any(|p| p == path)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.paths.iter().map(String::as_str)
    }

    pub fn clear(&mut self) {
        self.paths.clear();
    }
}

fn non_blank(path: &str) -> Result<&str> {
    let trimmed = path.trim();
    if trimmed.is_empty() {
        return Err(Error::invalid_argument("path", "include path must not be blank"));
    }
    Ok(trimmed)
}

impl<T: Reflect> Default for IncludePaths<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Clone for IncludePaths<T> {
    fn clone(&self) -> Self {
        Self {
            paths: self.paths.clone(),
            _entity: PhantomData,
        }
    }
}

impl<T> fmt::Debug for IncludePaths<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(&self.paths).finish()
    }
}

/// A typed include chain currently positioned on `P`
pub struct IncludeChain<'a, T, P> {
    includes: &'a mut IncludePaths<T>,
    segments: Vec<&'static str>,
    _target: PhantomData<fn() -> P>,
}

impl<'a, T: Reflect, P> IncludeChain<'a, T, P> {
    /// Extend this chain's path by a property of `P`
    ///
    /// The chain's entry is replaced by the longer path; no sibling entry is
    /// created.
    pub fn then_include<Q>(mut self, next: Prop<P, Q>) -> Result<IncludeChain<'a, T, Q>> {
        self.segments.push(next.name());
        let path = PropertyPath::<T>::resolve_segments(
            self.segments.iter().copied(),
            PathMatching::CaseSensitive,
        )?;
        let last = self
            .includes
            .paths
            .last_mut()
            .ok_or_else(|| Error::InvalidState("no initial path set".to_string()))?;
        *last = path.as_str().to_string();
        Ok(IncludeChain {
            includes: self.includes,
            segments: self.segments,
            _target: PhantomData,
        })
    }

    /// Start a sibling chain
    pub fn include<V>(self, selector: impl Into<Selector<T, V>>) -> Result<IncludeChain<'a, T, V>> {
        let includes = self.includes;
        includes.include(selector)
    }

    /// Dotted path this chain has built so far
    pub fn path(&self) -> String {
        self.segments.join(".")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{Author, Book, Person};

    #[test]
    fn test_then_include_before_include_is_invalid_state() {
        let mut includes = IncludePaths::<Person>::new();
        let err = includes.then_include_path("Title").unwrap_err();
        assert!(matches!(err, Error::InvalidState(ref msg) if msg.contains("no initial path")));
        assert!(includes.is_empty());
    }

    #[test]
    fn test_then_include_appends_to_last_entry() {
        let mut includes = IncludePaths::<Person>::new();
        includes
            .include_path("Books")
            .unwrap()
            .include_path("FavoriteBook")
            .unwrap()
            .then_include_path("Author")
            .unwrap();
        assert_eq!(includes.as_list(), ["Books", "FavoriteBook.Author"]);
    }

    #[test]
    fn test_typed_chain_narrows_and_replaces_entry() {
        const NAME: Prop<Author, String> = Prop::new("Name");
        let mut includes = IncludePaths::<Person>::new();
        let chain = includes
            .include(Person::FAVORITE_BOOK)
            .unwrap()
            .then_include(Book::AUTHOR)
            .unwrap()
            .then_include(NAME)
            .unwrap();
        assert_eq!(chain.path(), "FavoriteBook.Author.Name");
        chain.include(Person::BOOKS).unwrap().then_include(Book::AUTHOR).unwrap();
        assert_eq!(includes.as_list(), ["FavoriteBook.Author.Name", "Books.Author"]);
    }

    #[test]
    fn test_raw_paths_are_not_validated() {
        let mut includes = IncludePaths::<Person>::new();
        includes.include_path("Nonexistent.Thing").unwrap();
        assert!(includes.contains("Nonexistent.Thing"));
        assert!(includes.include_path("   ").is_err());
    }

    #[test]
    fn test_typed_include_validates() {
        const BOGUS: Prop<Person, Book> = Prop::new("Library");
        let mut includes = IncludePaths::<Person>::new();
        assert!(matches!(
            includes.include(BOGUS),
            Err(Error::PropertyNotFound { type_name: "Person", .. })
        ));
        assert!(includes.is_empty());
    }

    #[test]
    fn test_duplicates_are_kept_and_removed_last_first() {
        let mut includes = IncludePaths::<Person>::new();
        includes.include_path("Books").unwrap();
        includes.include(Person::FAVORITE_BOOK).unwrap();
        includes.include(Person::BOOKS).unwrap();
        assert_eq!(includes.len(), 3);
        assert_eq!(includes.iter().filter(|p| *p == "Books").count(), 2);

        assert!(includes.remove("Books"));
        assert_eq!(includes.as_list(), ["Books", "FavoriteBook"]);
        assert!(includes.remove("Books"));
        assert!(!includes.remove("Books"));
        assert_eq!(includes.as_list(), ["FavoriteBook"]);

        includes.clear();
        assert!(includes.is_empty());
    }
}
