use crate::{
    db::key::{Tuple, TupleDecodeError},
    value::FieldValue,
};
use serde::{Deserialize, Serialize};
use std::fmt::{self, Display};

// Sorts after the first byte of every encoded element.
const RANGE_END_BYTE: u8 = 0xFF;
const RANGE_BEGIN_BYTE: u8 = 0x00;

///
/// KeyRange
/// Half-open byte range `[begin, end)`.
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct KeyRange {
    pub begin: Vec<u8>,
    pub end: Vec<u8>,
}

impl KeyRange {
    #[must_use]
    pub const fn new(begin: Vec<u8>, end: Vec<u8>) -> Self {
        Self { begin, end }
    }

    /// Range of every key that extends `prefix` by at least one tuple element.
    #[must_use]
    pub fn extending(prefix: &[u8]) -> Self {
        let mut begin = prefix.to_vec();
        begin.push(RANGE_BEGIN_BYTE);
        let mut end = prefix.to_vec();
        end.push(RANGE_END_BYTE);

        Self { begin, end }
    }

    #[must_use]
    pub fn contains(&self, key: &[u8]) -> bool {
        self.begin.as_slice() <= key && key < self.end.as_slice()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.begin >= self.end
    }
}

///
/// Subspace
///
/// Byte prefix that namespaces one index (or other keyspace) in the store.
/// Keys are `prefix ‖ tuple-encoding`, so the subspace owns the half-open
/// range `[prefix ‖ 0x00, prefix ‖ 0xFF)`.
///

#[derive(Clone, Debug, Default, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub struct Subspace {
    #[serde(with = "serde_bytes")]
    raw: Vec<u8>,
}

impl Subspace {
    #[must_use]
    pub const fn from_raw(raw: Vec<u8>) -> Self {
        Self { raw }
    }

    /// Subspace for a tuple prefix.
    #[must_use]
    pub fn from_tuple(prefix: &Tuple) -> Self {
        Self {
            raw: prefix.encode(),
        }
    }

    /// Subspace `(root, name)`; the conventional home of one named index.
    #[must_use]
    pub fn from_name(root: &str, name: &str) -> Self {
        Self::from_tuple(&Tuple::new(vec![
            FieldValue::from(root),
            FieldValue::from(name),
        ]))
    }

    #[must_use]
    pub const fn as_bytes(&self) -> &[u8] {
        self.raw.as_slice()
    }

    /// Nested subspace for one more tuple element.
    #[must_use]
    pub fn child(&self, element: impl Into<FieldValue>) -> Self {
        self.nested(&Tuple::new(vec![element.into()]))
    }

    /// Nested subspace for a tuple suffix.
    #[must_use]
    pub fn nested(&self, suffix: &Tuple) -> Self {
        Self { raw: self.pack(suffix) }
    }

    #[must_use]
    pub fn pack(&self, tuple: &Tuple) -> Vec<u8> {
        let mut out = self.raw.clone();
        tuple.encode_into(&mut out);
        out
    }

    /// Strip the prefix and decode the remainder.
    pub fn unpack(&self, key: &[u8]) -> Result<Tuple, TupleDecodeError> {
        let rest = key
            .strip_prefix(self.raw.as_slice())
            .ok_or(TupleDecodeError::PrefixMismatch)?;

        Tuple::decode(rest)
    }

    #[must_use]
    pub fn contains(&self, key: &[u8]) -> bool {
        key.starts_with(&self.raw)
    }

    /// Every key inside this subspace.
    #[must_use]
    pub fn range(&self) -> KeyRange {
        KeyRange::extending(&self.raw)
    }

    /// Every key that extends `prefix` inside this subspace.
    #[must_use]
    pub fn range_of(&self, prefix: &Tuple) -> KeyRange {
        KeyRange::extending(&self.pack(prefix))
    }
}

impl Display for Subspace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match Tuple::decode(&self.raw) {
            Ok(tuple) => write!(f, "{tuple}"),
            Err(_) => {
                write!(f, "0x")?;
                for byte in &self.raw {
                    write!(f, "{byte:02x}")?;
                }
                Ok(())
            }
        }
    }
}
