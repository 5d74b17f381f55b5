//! Runtime property introspection and property-path resolution
//!
//! Entities describe their readable properties once, in a static [`TypeInfo`]
//! table, and expose instance access through [`Reflect::field`]. Everything
//! that needs to name a property at runtime (sort criteria, sort strings,
//! include paths) goes through [`PropertyPath`], which validates a dotted path
//! against those tables and can then read the terminal value from any
//! instance.
//!
//! # Example
//!
//! ```rust
//! use quarry::reflect::{
//!     FieldRef, PathMatching, PropertyInfo, PropertyPath, Reflect, TypeInfo, Value, ValueKind,
//! };
//!
//! struct Book {
//!     title: String,
//! }
//!
//! impl Reflect for Book {
//!     fn type_info() -> &'static TypeInfo {
//!         static INFO: TypeInfo =
//!             TypeInfo::new("Book", &[PropertyInfo::scalar("Title", ValueKind::Text)]);
//!         &INFO
//!     }
//!
//!     fn reflect_type(&self) -> &'static TypeInfo {
//!         Self::type_info()
//!     }
//!
//!     fn field(&self, name: &str) -> Option<FieldRef<'_>> {
//!         match name {
//!             "Title" => Some(FieldRef::value(&self.title)),
//!             _ => None,
//!         }
//!     }
//! }
//!
//! let path = PropertyPath::<Book>::resolve("title", PathMatching::CaseInsensitive).unwrap();
//! assert_eq!(path.as_str(), "Title");
//!
//! let book = Book { title: "Dune".to_string() };
//! assert_eq!(path.read(&book), Value::from("Dune"));
//! ```

mod path;
mod selector;
mod value;

pub use path::{PathMatching, PropertyPath};
pub use selector::{Prop, Selector};
pub use value::{Value, ValueKind};

/// Shape of a reflected property
#[derive(Debug, Clone, Copy)]
pub enum PropertyKind {
    /// A scalar readable as a [`Value`]
    Scalar(ValueKind),
    /// A single related record (may be absent)
    Record(fn() -> &'static TypeInfo),
    /// A collection of related records; navigable for include paths only
    Collection(fn() -> &'static TypeInfo),
}

impl PropertyKind {
    /// Type info of the related record type, `None` for scalars
    pub fn target(&self) -> Option<&'static TypeInfo> {
        match self {
            Self::Scalar(_) => None,
            Self::Record(info) | Self::Collection(info) => Some(info()),
        }
    }

    /// Whether this property holds a scalar
    pub fn is_scalar(&self) -> bool {
        matches!(self, Self::Scalar(_))
    }
}

/// Metadata for one publicly readable property
#[derive(Debug, Clone, Copy)]
pub struct PropertyInfo {
    /// Declared property name
    pub name: &'static str,
    /// Property shape
    pub kind: PropertyKind,
}

impl PropertyInfo {
    /// Declare a scalar property
    pub const fn scalar(name: &'static str, kind: ValueKind) -> Self {
        Self {
            name,
            kind: PropertyKind::Scalar(kind),
        }
    }

    /// Declare a single related record
    pub const fn record(name: &'static str, target: fn() -> &'static TypeInfo) -> Self {
        Self {
            name,
            kind: PropertyKind::Record(target),
        }
    }

    /// Declare a collection of related records
    pub const fn collection(name: &'static str, target: fn() -> &'static TypeInfo) -> Self {
        Self {
            name,
            kind: PropertyKind::Collection(target),
        }
    }
}

/// Static metadata for a reflected type
#[derive(Debug)]
pub struct TypeInfo {
    /// Type name used in diagnostics and error messages
    pub name: &'static str,
    /// Declared properties, in declaration order
    pub properties: &'static [PropertyInfo],
}

impl TypeInfo {
    /// Create type metadata
    pub const fn new(name: &'static str, properties: &'static [PropertyInfo]) -> Self {
        Self { name, properties }
    }

    /// Look up a property by name
    pub fn property(&self, name: &str, matching: PathMatching) -> Option<&'static PropertyInfo> {
        self.properties.iter().find(|p| matching.matches(p.name, name))
    }
}

/// Instance-level view of one property
pub enum FieldRef<'a> {
    /// A scalar value
    Value(Value),
    /// A related record, `None` when absent
    Record(Option<&'a dyn Reflect>),
    /// A collection of related records
    Collection(Vec<&'a dyn Reflect>),
}

impl<'a> FieldRef<'a> {
    /// Wrap a scalar
    pub fn value(value: impl Into<Value>) -> Self {
        Self::Value(value.into())
    }

    /// Wrap an optional related record
    pub fn record<R: Reflect>(record: Option<&'a R>) -> Self {
        Self::Record(record.map(|r| r as &dyn Reflect))
    }

    /// Wrap a slice of related records
    pub fn collection<R: Reflect>(records: &'a [R]) -> Self {
        Self::Collection(records.iter().map(|r| r as &dyn Reflect).collect())
    }
}

/// Runtime property access for entity types
///
/// Implementations keep [`Reflect::type_info`] and [`Reflect::field`] in
/// agreement: every name in the static table must be answered by `field`
/// with the matching [`FieldRef`] variant.
pub trait Reflect: Send + Sync + 'static {
    /// Static metadata for this type
    fn type_info() -> &'static TypeInfo
    where
        Self: Sized;

    /// Static metadata for the dynamic type of `self`
    fn reflect_type(&self) -> &'static TypeInfo;

    /// Read one property by its declared name
    fn field(&self, name: &str) -> Option<FieldRef<'_>>;
}
