//! Module: db::key
//! Responsibility: order-preserving tuple encoding and subspace prefixes.
//! Does not own: index layouts built on top of these keys.
//! Boundary: every store key written by a maintainer is produced here.

mod ordered;
mod subspace;
mod tuple;


pub use subspace::{KeyRange, Subspace};
pub use tuple::Tuple;

use thiserror::Error as ThisError;

///
/// TupleDecodeError
///
/// Malformed or foreign bytes found where an encoded tuple was expected.
///

#[derive(Clone, Debug, Eq, PartialEq, ThisError)]
pub enum TupleDecodeError {
    #[error("encoded tuple is truncated")]
    Truncated,

    #[error("unknown element type byte 0x{byte:02x}")]
    UnknownType { byte: u8 },

    #[error("invalid bool payload 0x{byte:02x}")]
    InvalidBool { byte: u8 },

    #[error("invalid escape sequence at offset {offset}")]
    InvalidEscape { offset: usize },

    #[error("string element is not valid utf-8")]
    InvalidUtf8,

    #[error("unknown numeric variant 0x{variant:02x}")]
    InvalidNumericVariant { variant: u8 },

    #[error("numeric element is out of range for its variant")]
    NumericOutOfRange,

    #[error("key does not start with the expected subspace prefix")]
    PrefixMismatch,
}
