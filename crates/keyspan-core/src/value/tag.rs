use crate::value::FieldValue;

///
/// ValueTag
///
/// Stable variant tag used by hashing and diagnostics.
///
/// IMPORTANT:
/// Tag values feed the stable content hash and must never be renumbered.
///
#[repr(u8)]
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ValueTag {
    Null = 1,
    Bool = 2,
    Int64 = 3,
    Double = 4,
    String = 5,
    Bytes = 6,
}

impl ValueTag {
    /// Stable hash byte tag for this variant.
    #[must_use]
    pub const fn to_u8(self) -> u8 {
        self as u8
    }

    /// Stable human-readable value kind label for diagnostics.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Null => "Null",
            Self::Bool => "Bool",
            Self::Int64 => "Int64",
            Self::Double => "Double",
            Self::String => "String",
            Self::Bytes => "Bytes",
        }
    }

    /// Ordering class of this variant.
    #[must_use]
    pub const fn rank(self) -> ValueRank {
        match self {
            Self::Null => ValueRank::Null,
            Self::Bool => ValueRank::Bool,
            Self::Int64 | Self::Double => ValueRank::Numeric,
            Self::String => ValueRank::String,
            Self::Bytes => ValueRank::Bytes,
        }
    }
}

///
/// ValueRank
///
/// Cross-variant ordering class. Both numeric variants share one rank, so
/// `Int64` and `Double` interleave by value.
///
/// IMPORTANT:
/// Rank order is the leading byte of every encoded key component; changing it
/// reorders every stored index.
///
#[repr(u8)]
#[derive(Clone, Copy, Debug, Eq, Ord, PartialEq, PartialOrd)]
pub enum ValueRank {
    Null = 0,
    Bool = 1,
    Numeric = 2,
    String = 3,
    Bytes = 4,
}

impl ValueRank {
    /// Type byte written in front of each encoded tuple element.
    #[must_use]
    pub const fn key_byte(self) -> u8 {
        self as u8 + 1
    }

    /// Inverse of [`Self::key_byte`].
    #[must_use]
    pub const fn from_key_byte(byte: u8) -> Option<Self> {
        match byte {
            1 => Some(Self::Null),
            2 => Some(Self::Bool),
            3 => Some(Self::Numeric),
            4 => Some(Self::String),
            5 => Some(Self::Bytes),
            _ => None,
        }
    }
}

#[must_use]
pub(super) const fn canonical_tag(value: &FieldValue) -> ValueTag {
    match value {
        FieldValue::Null => ValueTag::Null,
        FieldValue::Bool(_) => ValueTag::Bool,
        FieldValue::Int64(_) => ValueTag::Int64,
        FieldValue::Double(_) => ValueTag::Double,
        FieldValue::String(_) => ValueTag::String,
        FieldValue::Bytes(_) => ValueTag::Bytes,
    }
}
