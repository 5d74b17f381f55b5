//! Scalar values read through property paths

use std::cmp::Ordering;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Scalar kind of a reflected property
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueKind {
    /// `bool`
    Bool,
    /// Signed or unsigned integers up to 64 bits
    Int,
    /// Floating point numbers
    Float,
    /// Strings
    Text,
    /// UTC timestamps
    Timestamp,
    /// UUIDs
    Uuid,
}

impl ValueKind {
    /// Type name used in resolution errors when a path descends into a scalar
    pub const fn type_name(self) -> &'static str {
        match self {
            Self::Bool => "bool",
            Self::Int => "int",
            Self::Float => "float",
            Self::Text => "text",
            Self::Timestamp => "timestamp",
            Self::Uuid => "uuid",
        }
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.type_name())
    }
}

/// A property value read from an entity
///
/// `Value` carries a total order through [`Value::compare`]: `Null` sorts
/// below every present value, integers and floats compare numerically, and
/// values of unrelated kinds fall back to a fixed kind rank. Equality is
/// structural, so `Int(1)` and `Float(1.0)` tie under `compare` but are not
/// `==`; for that reason `Value` is not `PartialOrd`.
///
/// # Example
///
/// ```rust
/// use quarry::reflect::Value;
/// use std::cmp::Ordering;
///
/// assert_eq!(Value::Null.compare(&Value::from(0)), Ordering::Less);
/// assert_eq!(Value::from(2).compare(&Value::from(1.5)), Ordering::Greater);
/// assert_eq!(Value::from("a").compare(&Value::from("b")), Ordering::Less);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Value {
    /// Absent value
    #[default]
    Null,
    /// Boolean
    Bool(bool),
    /// 64-bit integer
    Int(i64),
    /// 64-bit float
    Float(f64),
    /// Text
    Text(String),
    /// UTC timestamp
    Timestamp(DateTime<Utc>),
    /// UUID
    Uuid(Uuid),
}

impl Value {
    /// Scalar kind of this value, `None` for `Null`
    pub fn kind(&self) -> Option<ValueKind> {
        match self {
            Self::Null => None,
            Self::Bool(_) => Some(ValueKind::Bool),
            Self::Int(_) => Some(ValueKind::Int),
            Self::Float(_) => Some(ValueKind::Float),
            Self::Text(_) => Some(ValueKind::Text),
            Self::Timestamp(_) => Some(ValueKind::Timestamp),
            Self::Uuid(_) => Some(ValueKind::Uuid),
        }
    }

    /// Whether this is `Null`
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Total order used for sorting
    pub fn compare(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Self::Null, Self::Null) => Ordering::Equal,
            (Self::Null, _) => Ordering::Less,
            (_, Self::Null) => Ordering::Greater,
            (Self::Bool(a), Self::Bool(b)) => a.cmp(b),
            (Self::Int(a), Self::Int(b)) => a.cmp(b),
            (Self::Float(a), Self::Float(b)) => a.total_cmp(b),
            (Self::Int(a), Self::Float(b)) => int_float_cmp(*a, *b),
            (Self::Float(a), Self::Int(b)) => int_float_cmp(*b, *a).reverse(),
            (Self::Text(a), Self::Text(b)) => a.cmp(b),
            (Self::Timestamp(a), Self::Timestamp(b)) => a.cmp(b),
            (Self::Uuid(a), Self::Uuid(b)) => a.cmp(b),
            (a, b) => a.rank().cmp(&b.rank()),
        }
    }

    fn rank(&self) -> u8 {
        match self {
            Self::Null => 0,
            Self::Bool(_) => 1,
            Self::Int(_) | Self::Float(_) => 2,
            Self::Text(_) => 3,
            Self::Timestamp(_) => 4,
            Self::Uuid(_) => 5,
        }
    }
}

/// Exact comparison of an integer with a float
///
/// NaN orders by sign, as `f64::total_cmp` does.
fn int_float_cmp(int: i64, float: f64) -> Ordering {
    // 2^63, exactly representable
    const BOUND: f64 = 9_223_372_036_854_775_808.0;

    if float.is_nan() {
        return if float.is_sign_negative() {
            Ordering::Greater
        } else {
            Ordering::Less
        };
    }
    if float >= BOUND {
        return Ordering::Less;
    }
    if float < -BOUND {
        return Ordering::Greater;
    }
    let whole = float.trunc();
    // in range, so the cast is exact
    int.cmp(&(whole as i64)).then_with(|| {
        if float > whole {
            Ordering::Less
        } else if float < whole {
            Ordering::Greater
        } else {
            Ordering::Equal
        }
    })
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => write!(f, "null"),
            Self::Bool(b) => write!(f, "{}", b),
            Self::Int(n) => write!(f, "{}", n),
            Self::Float(n) => write!(f, "{}", n),
            Self::Text(s) => write!(f, "{}", s),
            Self::Timestamp(t) => write!(f, "{}", t.to_rfc3339()),
            Self::Uuid(u) => write!(f, "{}", u),
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Self::Int(i64::from(n))
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Self::Int(n)
    }
}

impl From<u32> for Value {
    fn from(n: u32) -> Self {
        Self::Int(i64::from(n))
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Self::Float(n)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<&String> for Value {
    fn from(s: &String) -> Self {
        Self::Text(s.clone())
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(t: DateTime<Utc>) -> Self {
        Self::Timestamp(t)
    }
}

impl From<Uuid> for Value {
    fn from(u: Uuid) -> Self {
        Self::Uuid(u)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(opt: Option<T>) -> Self {
        opt.map_or(Self::Null, Into::into)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_null_sorts_first() {
        assert_eq!(Value::Null.compare(&Value::from("")), Ordering::Less);
        assert_eq!(Value::from(i64::MIN).compare(&Value::Null), Ordering::Greater);
        assert_eq!(Value::Null.compare(&Value::Null), Ordering::Equal);
    }

    #[test]
    fn test_numeric_cross_kind() {
        assert_eq!(Value::from(1).compare(&Value::from(1.0)), Ordering::Equal);
        assert_eq!(Value::from(0.5).compare(&Value::from(1)), Ordering::Less);
        assert_eq!(Value::from(-1).compare(&Value::from(-1.5)), Ordering::Greater);
        assert_eq!(Value::from(-2).compare(&Value::from(-1.5)), Ordering::Less);
    }

    #[test]
    fn test_int_float_compare_is_exact_beyond_f64_precision() {
        let big = Value::from(9_007_199_254_740_993_i64);
        let float = Value::from(9_007_199_254_740_992.0);
        assert_eq!(big.compare(&float), Ordering::Greater);
        assert_eq!(float.compare(&big), Ordering::Less);

        let two_pow_63 = Value::from(9_223_372_036_854_775_808.0);
        assert_eq!(Value::from(i64::MAX).compare(&two_pow_63), Ordering::Less);
        assert_eq!(Value::from(i64::MIN).compare(&Value::from(i64::MIN as f64)), Ordering::Equal);
        assert_eq!(Value::from(i64::MIN).compare(&Value::from(-1e19)), Ordering::Greater);
    }

    #[test]
    fn test_int_against_nan_orders_by_sign() {
        assert_eq!(Value::from(0).compare(&Value::from(f64::NAN)), Ordering::Less);
        assert_eq!(Value::from(0).compare(&Value::from(-f64::NAN)), Ordering::Greater);
    }

    #[test]
    fn test_equality_is_structural_and_separate_from_ordering() {
        // ordering treats these as ties; equality does not
        assert_eq!(Value::from(1).compare(&Value::from(1.0)), Ordering::Equal);
        assert_ne!(Value::from(1), Value::from(1.0));
    }

    #[test]
    fn test_timestamps_compare_chronologically() {
        let early = Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap();
        let late = Utc.with_ymd_and_hms(2021, 1, 1, 0, 0, 0).unwrap();
        assert_eq!(Value::from(early).compare(&Value::from(late)), Ordering::Less);
    }

    #[test]
    fn test_unrelated_kinds_use_rank() {
        assert_eq!(Value::from(true).compare(&Value::from(0)), Ordering::Less);
        assert_eq!(Value::from("z").compare(&Value::from(99)), Ordering::Greater);
    }

    #[test]
    fn test_option_conversion() {
        assert_eq!(Value::from(None::<String>), Value::Null);
        assert_eq!(Value::from(Some(3)), Value::Int(3));
    }

    #[test]
    fn test_kind() {
        assert_eq!(Value::Null.kind(), None);
        assert_eq!(Value::from("x").kind(), Some(ValueKind::Text));
        assert_eq!(ValueKind::Timestamp.to_string(), "timestamp");
    }
}
