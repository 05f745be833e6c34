//! Module: db::store
//! Responsibility: the transactional key-value capability the engine consumes.
//! Does not own: conflict detection policy (belongs to the store implementation).
//! Boundary: maintainers only ever see `&mut dyn Transaction`.

mod memory;
mod selector;

#[cfg(test)]
mod tests;

pub use memory::{MemoryStore, MemoryTransaction};
pub use selector::KeySelector;

use crate::db::key::KeyRange;
use thiserror::Error as ThisError;

///
/// StoreError
/// Opaque failures surfaced by the transactional store.
///

#[derive(Clone, Debug, Eq, PartialEq, ThisError)]
pub enum StoreError {
    #[error("transaction conflicted with a concurrent commit")]
    Conflict,

    #[error("transaction read version is older than the retained commit history")]
    TransactionTooOld,

    #[error("store backend failure: {0}")]
    Backend(String),
}

///
/// KeyValue
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct KeyValue {
    pub key: Vec<u8>,
    pub value: Vec<u8>,
}

///
/// Transaction
///
/// One caller-owned transaction on an ordered key-value store.
/// Writes are buffered and infallible; reads may fail. The engine never
/// opens or commits transactions itself.
///

pub trait Transaction {
    fn get(&mut self, key: &[u8]) -> Result<Option<Vec<u8>>, StoreError>;

    fn set(&mut self, key: &[u8], value: &[u8]);

    fn clear(&mut self, key: &[u8]);

    /// Clear every key in `[begin, end)`.
    fn clear_range(&mut self, begin: &[u8], end: &[u8]);

    /// Blind little-endian i64 add; takes no read conflict.
    fn atomic_add(&mut self, key: &[u8], delta: i64);

    /// Read the keys between two selectors, ascending unless `reverse`.
    /// `limit` of `None` reads the whole range.
    fn get_range(
        &mut self,
        begin: &KeySelector,
        end: &KeySelector,
        limit: Option<usize>,
        reverse: bool,
    ) -> Result<Vec<KeyValue>, StoreError>;

    /// Read every key inside `range`.
    fn scan(
        &mut self,
        range: &KeyRange,
        limit: Option<usize>,
        reverse: bool,
    ) -> Result<Vec<KeyValue>, StoreError> {
        self.get_range(
            &KeySelector::first_greater_or_equal(&range.begin),
            &KeySelector::first_greater_or_equal(&range.end),
            limit,
            reverse,
        )
    }
}

/// Decode a stored little-endian counter; short values are zero-extended.
#[must_use]
pub fn decode_counter(bytes: &[u8]) -> i64 {
    let mut buf = [0u8; 8];
    let len = bytes.len().min(8);
    buf[..len].copy_from_slice(&bytes[..len]);

    i64::from_le_bytes(buf)
}
