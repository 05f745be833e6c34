mod compare;
mod hash;
mod tag;


use serde::{Deserialize, Serialize};
use std::{
    cmp::Ordering,
    fmt::{self, Display},
    hash::{Hash, Hasher},
};
use thiserror::Error as ThisError;

// re-exports
pub(crate) use compare::{DOUBLE_VARIANT, INT64_VARIANT, NumericKey};
pub use compare::{canonical_cmp, numeric_cmp};
pub use hash::{VALUE_HASH_SEED, VALUE_HASH_VERSION, hash_value, hash_values};
pub use tag::{ValueRank, ValueTag};

///
/// FieldValue
///
/// Closed, totally ordered value extracted from a record by a key expression.
///
/// Order: Null < Bool < numeric < String < Bytes. `Int64` and `Double` share
/// the numeric rank and interleave by value; a numerically equal pair orders
/// `Int64` first so equality stays structural.
///

#[derive(Clone, Debug, Deserialize, Serialize)]
pub enum FieldValue {
    Null,
    Bool(bool),
    Int64(i64),
    Double(f64),
    String(String),
    Bytes(#[serde(with = "serde_bytes")] Vec<u8>),
}

impl FieldValue {
    ///
    /// CLASSIFICATION
    ///

    /// Stable variant tag.
    #[must_use]
    pub const fn tag(&self) -> ValueTag {
        tag::canonical_tag(self)
    }

    /// Cross-variant ordering class.
    #[must_use]
    pub const fn rank(&self) -> ValueRank {
        self.tag().rank()
    }

    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    #[must_use]
    pub const fn is_numeric(&self) -> bool {
        matches!(self, Self::Int64(_) | Self::Double(_))
    }

    ///
    /// ACCESSORS
    ///

    #[must_use]
    pub const fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(v) => Some(*v),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Int64(v) => Some(*v),
            _ => None,
        }
    }

    /// Numeric value widened to `f64` (lossy above 2^53 for integers).
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Int64(v) => Some(*v as f64),
            Self::Double(v) => Some(*v),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(v) => Some(v.as_str()),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Self::Bytes(v) => Some(v.as_slice()),
            _ => None,
        }
    }

    /// Stable content hash; see [`hash_value`].
    #[must_use]
    pub fn content_hash(&self) -> u64 {
        hash_value(self)
    }
}

impl PartialEq for FieldValue {
    fn eq(&self, other: &Self) -> bool {
        canonical_cmp(self, other) == Ordering::Equal
    }
}

impl Eq for FieldValue {}

impl PartialOrd for FieldValue {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for FieldValue {
    fn cmp(&self, other: &Self) -> Ordering {
        canonical_cmp(self, other)
    }
}

// Consistent with `Eq`: doubles are equal only when their bits are.
impl Hash for FieldValue {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.tag().to_u8().hash(state);
        match self {
            Self::Null => {}
            Self::Bool(v) => v.hash(state),
            Self::Int64(v) => v.hash(state),
            Self::Double(v) => v.to_bits().hash(state),
            Self::String(v) => v.hash(state),
            Self::Bytes(v) => v.hash(state),
        }
    }
}

impl Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => write!(f, "null"),
            Self::Bool(v) => write!(f, "{v}"),
            Self::Int64(v) => write!(f, "{v}"),
            Self::Double(v) => write!(f, "{v:?}"),
            Self::String(v) => write!(f, "{v:?}"),
            Self::Bytes(v) => {
                write!(f, "0x")?;
                for byte in v {
                    write!(f, "{byte:02x}")?;
                }
                Ok(())
            }
        }
    }
}

///
/// FieldValueError
/// Typed extraction from a `FieldValue` found a different variant.
///

#[derive(Clone, Debug, Eq, PartialEq, ThisError)]
pub enum FieldValueError {
    #[error("expected {expected} value, found {actual}")]
    TypeMismatch {
        expected: &'static str,
        actual: &'static str,
    },
}

impl FieldValueError {
    const fn mismatch(expected: ValueTag, actual: &FieldValue) -> Self {
        Self::TypeMismatch {
            expected: expected.label(),
            actual: actual.tag().label(),
        }
    }
}

///
/// CONVERSIONS
///

impl From<bool> for FieldValue {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i64> for FieldValue {
    fn from(v: i64) -> Self {
        Self::Int64(v)
    }
}

impl From<i32> for FieldValue {
    fn from(v: i32) -> Self {
        Self::Int64(i64::from(v))
    }
}

impl From<u32> for FieldValue {
    fn from(v: u32) -> Self {
        Self::Int64(i64::from(v))
    }
}

impl From<f64> for FieldValue {
    fn from(v: f64) -> Self {
        Self::Double(v)
    }
}

impl From<&str> for FieldValue {
    fn from(v: &str) -> Self {
        Self::String(v.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(v: String) -> Self {
        Self::String(v)
    }
}

impl From<Vec<u8>> for FieldValue {
    fn from(v: Vec<u8>) -> Self {
        Self::Bytes(v)
    }
}

impl From<&[u8]> for FieldValue {
    fn from(v: &[u8]) -> Self {
        Self::Bytes(v.to_vec())
    }
}

impl<T: Into<FieldValue>> From<Option<T>> for FieldValue {
    fn from(v: Option<T>) -> Self {
        v.map_or(Self::Null, Into::into)
    }
}

impl TryFrom<&FieldValue> for bool {
    type Error = FieldValueError;

    fn try_from(value: &FieldValue) -> Result<Self, Self::Error> {
        value
            .as_bool()
            .ok_or_else(|| FieldValueError::mismatch(ValueTag::Bool, value))
    }
}

impl TryFrom<&FieldValue> for i64 {
    type Error = FieldValueError;

    fn try_from(value: &FieldValue) -> Result<Self, Self::Error> {
        value
            .as_i64()
            .ok_or_else(|| FieldValueError::mismatch(ValueTag::Int64, value))
    }
}

impl TryFrom<&FieldValue> for f64 {
    type Error = FieldValueError;

    fn try_from(value: &FieldValue) -> Result<Self, Self::Error> {
        value
            .as_f64()
            .ok_or_else(|| FieldValueError::mismatch(ValueTag::Double, value))
    }
}

impl TryFrom<&FieldValue> for String {
    type Error = FieldValueError;

    fn try_from(value: &FieldValue) -> Result<Self, Self::Error> {
        value
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| FieldValueError::mismatch(ValueTag::String, value))
    }
}
