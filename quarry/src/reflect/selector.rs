//! Statically-typed property selectors
//!
//! A [`Prop<Owner, Target>`] names one property of `Owner` whose values are
//! `Target` (for related records and collections, `Target` is the record
//! type). Chaining with [`Prop::then`] only compiles when the next property
//! belongs to the previous target, which is what lets include chains narrow
//! their type as they go.
//!
//! ```rust,ignore
//! impl Person {
//!     pub const FAVORITE_BOOK: Prop<Person, Book> = Prop::new("FavoriteBook");
//! }
//! impl Book {
//!     pub const TITLE: Prop<Book, String> = Prop::new("Title");
//! }
//!
//! let title: Selector<Person, String> = Person::FAVORITE_BOOK.then(Book::TITLE);
//! ```

use std::fmt;
use std::marker::PhantomData;

use super::{PathMatching, PropertyPath, Reflect};
use crate::error::Result;

/// A single typed property of `Owner`
pub struct Prop<Owner, Target> {
    name: &'static str,
    _types: PhantomData<fn(&Owner) -> Target>,
}

impl<Owner, Target> Prop<Owner, Target> {
    /// Declare a typed property by its declared name
    pub const fn new(name: &'static str) -> Self {
        Self {
            name,
            _types: PhantomData,
        }
    }

    /// Declared property name
    pub const fn name(&self) -> &'static str {
        self.name
    }

    /// Extend this property into a path through `Target`
    pub fn then<Next>(self, next: Prop<Target, Next>) -> Selector<Owner, Next> {
        Selector {
            segments: vec![self.name, next.name],
            _types: PhantomData,
        }
    }
}

impl<Owner, Target> Clone for Prop<Owner, Target> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<Owner, Target> Copy for Prop<Owner, Target> {}

impl<Owner, Target> fmt::Debug for Prop<Owner, Target> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Prop").field(&self.name).finish()
    }
}

/// A typed, possibly nested, property path from `Owner` to `Target`
pub struct Selector<Owner, Target> {
    segments: Vec<&'static str>,
    _types: PhantomData<fn(&Owner) -> Target>,
}

impl<Owner, Target> Selector<Owner, Target> {
    /// Extend the selector by one more property
    pub fn then<Next>(mut self, next: Prop<Target, Next>) -> Selector<Owner, Next> {
        self.segments.push(next.name);
        Selector {
            segments: self.segments,
            _types: PhantomData,
        }
    }

    /// Declared property names, in order
    pub fn segments(&self) -> &[&'static str] {
        &self.segments
    }
}

impl<Owner: Reflect, Target> Selector<Owner, Target> {
    /// Normalize into a validated [`PropertyPath`]
    ///
    /// Selector names are matched case-sensitively; a selector that names an
    /// undeclared property fails with `PropertyNotFound` just like a string path.
    pub fn to_path(&self) -> Result<PropertyPath<Owner>> {
        PropertyPath::resolve_segments(self.segments.iter().copied(), PathMatching::CaseSensitive)
    }
}

impl<Owner, Target> From<Prop<Owner, Target>> for Selector<Owner, Target> {
    fn from(prop: Prop<Owner, Target>) -> Self {
        Self {
            segments: vec![prop.name],
            _types: PhantomData,
        }
    }
}

impl<Owner, Target> Clone for Selector<Owner, Target> {
    fn clone(&self) -> Self {
        Self {
            segments: self.segments.clone(),
            _types: PhantomData,
        }
    }
}

impl<Owner, Target> fmt::Debug for Selector<Owner, Target> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Selector").field(&self.segments.join(".")).finish()
    }
}
