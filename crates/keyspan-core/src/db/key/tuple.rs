use crate::{
    db::key::{
        TupleDecodeError,
        ordered::{decode_component, encode_component},
    },
    value::{FieldValue, hash_values},
};
use derive_more::{Deref, IntoIterator};
use serde::{Deserialize, Serialize};
use std::fmt::{self, Display};

///
/// Tuple
///
/// Ordered sequence of values with an order-preserving byte encoding.
/// Encodings compare bytewise exactly as the tuples compare element by
/// element, and a tuple's encoding is a strict prefix of every extension.
///

#[derive(
    Clone,
    Debug,
    Default,
    Deref,
    Deserialize,
    Eq,
    Hash,
    IntoIterator,
    Ord,
    PartialEq,
    PartialOrd,
    Serialize,
)]
#[into_iterator(owned, ref)]
pub struct Tuple(Vec<FieldValue>);

impl Tuple {
    #[must_use]
    pub const fn new(values: Vec<FieldValue>) -> Self {
        Self(values)
    }

    #[must_use]
    pub const fn empty() -> Self {
        Self(Vec::new())
    }

    #[must_use]
    pub fn into_values(self) -> Vec<FieldValue> {
        self.0
    }

    pub fn push(&mut self, value: impl Into<FieldValue>) {
        self.0.push(value.into());
    }

    /// Append all elements of `other` after this tuple's elements.
    #[must_use]
    pub fn concat(mut self, other: &Self) -> Self {
        self.0.extend(other.0.iter().cloned());
        self
    }

    /// Order-preserving byte encoding.
    #[must_use]
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::new();
        self.encode_into(&mut out);
        out
    }

    pub fn encode_into(&self, out: &mut Vec<u8>) {
        for value in &self.0 {
            encode_component(out, value);
        }
    }

    /// Decode a full encoding; every byte must belong to some element.
    pub fn decode(bytes: &[u8]) -> Result<Self, TupleDecodeError> {
        let mut offset = 0;
        let mut values = Vec::new();

        while offset < bytes.len() {
            values.push(decode_component(bytes, &mut offset)?);
        }

        Ok(Self(values))
    }

    /// Stable content hash of the element sequence.
    #[must_use]
    pub fn content_hash(&self) -> u64 {
        hash_values(&self.0)
    }
}

impl From<Vec<FieldValue>> for Tuple {
    fn from(values: Vec<FieldValue>) -> Self {
        Self(values)
    }
}

impl FromIterator<FieldValue> for Tuple {
    fn from_iter<I: IntoIterator<Item = FieldValue>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl Display for Tuple {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(")?;
        for (i, value) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{value}")?;
        }
        write!(f, ")")
    }
}

/// Build a [`Tuple`] from a list of values convertible into `FieldValue`.
#[macro_export]
macro_rules! tuple {
    () => { $crate::db::key::Tuple::empty() };
    ($($value:expr),+ $(,)?) => {
        $crate::db::key::Tuple::new(vec![$($crate::value::FieldValue::from($value)),+])
    };
}
