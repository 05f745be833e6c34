use crate::value::FieldValue;
use serde::{Deserialize, Serialize};
use std::fmt::{self, Display};

///
/// FieldType
///
/// Registration-time type of one record field.
/// Index kinds validate against these, never against runtime values.
///

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub enum FieldType {
    Bool,
    Int64,
    Double,
    String,
    Bytes,
    Optional(Box<Self>),
    Record(Vec<FieldModel>),
    Range(Box<Self>),
}

impl FieldType {
    /// Scalar types (and optional scalars) have a total order and can appear
    /// in an index key.
    #[must_use]
    pub fn is_orderable(&self) -> bool {
        match self {
            Self::Bool | Self::Int64 | Self::Double | Self::String | Self::Bytes => true,
            Self::Optional(inner) => inner.is_orderable(),
            Self::Record(_) | Self::Range(_) => false,
        }
    }

    /// Numeric types can feed a sum aggregation.
    #[must_use]
    pub fn is_numeric(&self) -> bool {
        match self {
            Self::Int64 | Self::Double => true,
            Self::Optional(inner) => inner.is_numeric(),
            _ => false,
        }
    }

    /// Runtime type of a literal value; `None` for `Null`.
    #[must_use]
    pub const fn of_value(value: &FieldValue) -> Option<Self> {
        match value {
            FieldValue::Null => None,
            FieldValue::Bool(_) => Some(Self::Bool),
            FieldValue::Int64(_) => Some(Self::Int64),
            FieldValue::Double(_) => Some(Self::Double),
            FieldValue::String(_) => Some(Self::String),
            FieldValue::Bytes(_) => Some(Self::Bytes),
        }
    }

    /// Nested field list when this type is (optionally) a record.
    #[must_use]
    pub fn record_fields(&self) -> Option<&[FieldModel]> {
        match self {
            Self::Record(fields) => Some(fields.as_slice()),
            Self::Optional(inner) => inner.record_fields(),
            _ => None,
        }
    }

    /// Bound type when this type is (optionally) a range.
    #[must_use]
    pub fn range_bound(&self) -> Option<&Self> {
        match self {
            Self::Range(inner) => Some(inner),
            Self::Optional(inner) => inner.range_bound(),
            _ => None,
        }
    }
}

impl Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool => write!(f, "bool"),
            Self::Int64 => write!(f, "int64"),
            Self::Double => write!(f, "double"),
            Self::String => write!(f, "string"),
            Self::Bytes => write!(f, "bytes"),
            Self::Optional(inner) => write!(f, "{inner}?"),
            Self::Record(_) => write!(f, "record"),
            Self::Range(inner) => write!(f, "range<{inner}>"),
        }
    }
}

///
/// FieldModel
/// Runtime field metadata used by registration-time validation.
///

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct FieldModel {
    pub name: String,
    pub ty: FieldType,
}

impl FieldModel {
    #[must_use]
    pub fn new(name: impl Into<String>, ty: FieldType) -> Self {
        Self {
            name: name.into(),
            ty,
        }
    }

    /// Declare a field whose Rust type is statically orderable.
    #[must_use]
    pub fn orderable<T: Orderable>(name: impl Into<String>) -> Self {
        Self::new(name, T::FIELD_TYPE)
    }

    /// Declare a field whose Rust type is statically numeric.
    #[must_use]
    pub fn numeric<T: Numeric>(name: impl Into<String>) -> Self {
        Self::new(name, T::FIELD_TYPE)
    }

    /// Declare a nullable scalar field.
    #[must_use]
    pub fn optional<T: Orderable>(name: impl Into<String>) -> Self {
        Self::new(name, FieldType::Optional(Box::new(T::FIELD_TYPE)))
    }

    /// Declare a range-typed field with orderable bounds.
    #[must_use]
    pub fn range<T: Orderable>(name: impl Into<String>) -> Self {
        Self::new(name, FieldType::Range(Box::new(T::FIELD_TYPE)))
    }

    /// Declare a nested record field.
    #[must_use]
    pub fn record(name: impl Into<String>, fields: Vec<Self>) -> Self {
        Self::new(name, FieldType::Record(fields))
    }
}

/// Find a field by name in an ordered field list.
#[must_use]
pub fn find_field<'a>(fields: &'a [FieldModel], name: &str) -> Option<&'a FieldModel> {
    fields.iter().find(|field| field.name == name)
}

mod sealed {
    pub trait Sealed {}

    impl Sealed for bool {}
    impl Sealed for i64 {}
    impl Sealed for f64 {}
    impl Sealed for String {}
    impl Sealed for Vec<u8> {}
}

///
/// Orderable
///
/// Closed capability: Rust types that map onto an orderable `FieldType`.
///

pub trait Orderable: sealed::Sealed {
    const FIELD_TYPE: FieldType;
}

///
/// Numeric
///
/// Closed capability: Rust types that map onto a numeric `FieldType`.
///

pub trait Numeric: Orderable {}

impl Orderable for bool {
    const FIELD_TYPE: FieldType = FieldType::Bool;
}

impl Orderable for i64 {
    const FIELD_TYPE: FieldType = FieldType::Int64;
}

impl Orderable for f64 {
    const FIELD_TYPE: FieldType = FieldType::Double;
}

impl Orderable for String {
    const FIELD_TYPE: FieldType = FieldType::String;
}

impl Orderable for Vec<u8> {
    const FIELD_TYPE: FieldType = FieldType::Bytes;
}

impl Numeric for i64 {}
impl Numeric for f64 {}

///
/// TESTS
///
