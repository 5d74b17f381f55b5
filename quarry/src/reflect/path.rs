//! Property-path descriptors

use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::{FieldRef, PropertyKind, Reflect, TypeInfo, Value, ValueKind};
use crate::error::{Error, Result};

/// How path segments are matched against declared property names
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PathMatching {
    /// Segments must match declared names exactly
    CaseSensitive,
    /// Segments match declared names ignoring ASCII case
    #[default]
    CaseInsensitive,
}

impl PathMatching {
    pub(crate) fn matches(self, declared: &str, candidate: &str) -> bool {
        match self {
            Self::CaseSensitive => declared == candidate,
            Self::CaseInsensitive => declared.eq_ignore_ascii_case(candidate),
        }
    }
}

/// Type reached by the segments resolved so far
#[derive(Clone, Copy)]
enum Owner {
    Type(&'static TypeInfo),
    Scalar(ValueKind),
}

/// A validated, reusable reference to a (possibly nested) property of `T`
///
/// Segments are stored with their declared spelling regardless of the
/// [`PathMatching`] mode used to resolve them, so two descriptors for the same
/// property always render the same dotted path.
pub struct PropertyPath<T> {
    segments: Arc<[&'static str]>,
    dotted: Arc<str>,
    terminal: PropertyKind,
    crosses_collection: bool,
    _entity: PhantomData<fn(&T)>,
}

impl<T: Reflect> PropertyPath<T> {
    /// Resolve a dotted path against `T`
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidArgument`] if the path is blank or contains an empty segment
    /// - [`Error::PropertyNotFound`] for the first segment (left to right) that does
    ///   not name a property on the type reached so far
    pub fn resolve(path: &str, matching: PathMatching) -> Result<Self> {
        if path.trim().is_empty() {
            return Err(Error::invalid_argument(
                "path",
                "property path must not be blank",
            ));
        }
        Self::resolve_segments(path.split('.').map(str::trim), matching)
    }

    pub(crate) fn resolve_segments<'s>(
        segments: impl IntoIterator<Item = &'s str>,
        matching: PathMatching,
    ) -> Result<Self> {
        let mut owner = Owner::Type(T::type_info());
        let mut resolved: Vec<&'static str> = Vec::new();
        let mut terminal = None;
        let mut crosses_collection = false;

        for segment in segments {
            if segment.is_empty() {
                return Err(Error::invalid_argument(
                    "path",
                    "property path contains an empty segment",
                ));
            }
            let info = match owner {
                Owner::Type(info) => info,
                Owner::Scalar(kind) => {
                    return Err(Error::property_not_found(segment, kind.type_name()))
                }
            };
            let property = info
                .property(segment, matching)
                .ok_or_else(|| Error::property_not_found(segment, info.name))?;

            if let Some(PropertyKind::Collection(_)) = terminal {
                crosses_collection = true;
            }
            resolved.push(property.name);
            terminal = Some(property.kind);
            owner = match property.kind {
                PropertyKind::Scalar(kind) => Owner::Scalar(kind),
                PropertyKind::Record(target) | PropertyKind::Collection(target) => {
                    Owner::Type(target())
                }
            };
        }

        let terminal = terminal.ok_or_else(|| {
            Error::invalid_argument("path", "property path must not be blank")
        })?;
        let dotted: Arc<str> = Arc::from(resolved.join("."));
        Ok(Self {
            segments: Arc::from(resolved),
            dotted,
            terminal,
            crosses_collection,
            _entity: PhantomData,
        })
    }

    /// Read the terminal value from an instance
    ///
    /// A missing record anywhere along the path yields [`Value::Null`], as do
    /// paths ending on a record or crossing a collection.
    pub fn read(&self, entity: &T) -> Value {
        let mut current: &dyn Reflect = entity;
        let (last, intermediate) = match self.segments.split_last() {
            Some(split) => split,
            None => return Value::Null,
        };
        for segment in intermediate {
            match current.field(segment) {
                Some(FieldRef::Record(Some(next))) => current = next,
                _ => return Value::Null,
            }
        }
        match current.field(last) {
            Some(FieldRef::Value(value)) => value,
            _ => Value::Null,
        }
    }
}

impl<T> PropertyPath<T> {
    /// Declared property names, in order
    pub fn segments(&self) -> &[&'static str] {
        &self.segments
    }

    /// Dotted path using declared property names
    pub fn as_str(&self) -> &str {
        &self.dotted
    }

    /// Shape of the terminal property
    pub fn terminal(&self) -> PropertyKind {
        self.terminal
    }

    /// Whether the path can act as a sort key
    ///
    /// Sort keys must end on a scalar and must not navigate through a collection.
    pub fn is_sortable(&self) -> bool {
        self.terminal.is_scalar() && !self.crosses_collection
    }
}

impl<T> Clone for PropertyPath<T> {
    fn clone(&self) -> Self {
        Self {
            segments: Arc::clone(&self.segments),
            dotted: Arc::clone(&self.dotted),
            terminal: self.terminal,
            crosses_collection: self.crosses_collection,
            _entity: PhantomData,
        }
    }
}

impl<T> PartialEq for PropertyPath<T> {
    fn eq(&self, other: &Self) -> bool {
        self.segments == other.segments
    }
}

impl<T> Eq for PropertyPath<T> {}

impl<T> fmt::Debug for PropertyPath<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("PropertyPath").field(&self.as_str()).finish()
    }
}

impl<T> fmt::Display for PropertyPath<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
