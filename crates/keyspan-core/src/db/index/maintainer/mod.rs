//! Module: db::index::maintainer
//! Responsibility: translating record changes into index key operations.
//! Does not own: transaction lifetime or commit (the caller owns both).
//! Boundary: every plan is fully computed before the first write is issued.

mod aggregate;
mod flat;

#[cfg(test)]
mod tests;

pub use aggregate::{AggregateFunction, AggregateIndexMaintainer};
pub use flat::ValueIndexMaintainer;

use crate::{
    db::{
        index::kind::SubspaceStructure,
        key::{Subspace, Tuple},
        store::Transaction,
    },
    error::InternalError,
    expr::KeyExpression,
    model::{Index, Record},
    obs::sink::{self, MetricsEvent},
};
use thiserror::Error as ThisError;
use tracing::debug;

///
/// MaintainerError
///

#[derive(Clone, Debug, PartialEq, ThisError)]
pub enum MaintainerError {
    #[error("unique index '{index}' already maps {values} to {existing_id}")]
    UniqueViolation {
        index: String,
        values: Tuple,
        existing_id: Tuple,
    },

    #[error("index '{index}' holds a corrupt entry: {reason}")]
    CorruptEntry { index: String, reason: String },
}

///
/// IndexEntryValue
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum IndexEntryValue {
    Empty,
    Counter(i64),
}

impl IndexEntryValue {
    /// Stored byte form.
    #[must_use]
    pub fn to_bytes(self) -> Vec<u8> {
        match self {
            Self::Empty => Vec::new(),
            Self::Counter(value) => value.to_le_bytes().to_vec(),
        }
    }
}

///
/// IndexEntry
/// One key a record contributes to an index, with its stored value.
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct IndexEntry {
    pub key: Vec<u8>,
    pub value: IndexEntryValue,
}

///
/// IndexOp
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum IndexOp {
    Clear { key: Vec<u8> },
    Set { key: Vec<u8>, value: Vec<u8> },
    Add { key: Vec<u8>, delta: i64 },
}

///
/// IndexUpdatePlan
///
/// Deterministic set of operations one record change issues against one
/// index. Building a plan performs no writes; `apply` performs only writes.
///

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct IndexUpdatePlan {
    index: String,
    ops: Vec<IndexOp>,
}

impl IndexUpdatePlan {
    #[must_use]
    pub fn new(index: impl Into<String>) -> Self {
        Self {
            index: index.into(),
            ops: Vec::new(),
        }
    }

    pub(crate) fn push(&mut self, op: IndexOp) {
        self.ops.push(op);
    }

    #[must_use]
    pub fn index(&self) -> &str {
        &self.index
    }

    #[must_use]
    pub fn ops(&self) -> &[IndexOp] {
        &self.ops
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    /// Issue every buffered operation against `txn`.
    pub fn apply(&self, txn: &mut dyn Transaction) {
        let (mut inserts, mut removes, mut adds) = (0u64, 0u64, 0u64);

        for op in &self.ops {
            match op {
                IndexOp::Clear { key } => {
                    txn.clear(key);
                    removes += 1;
                }
                IndexOp::Set { key, value } => {
                    txn.set(key, value);
                    inserts += 1;
                }
                IndexOp::Add { key, delta } => {
                    txn.atomic_add(key, *delta);
                    adds += 1;
                }
            }
        }

        if inserts > 0 || removes > 0 {
            sink::record(MetricsEvent::IndexDelta {
                index: &self.index,
                inserts,
                removes,
            });
        }
        if adds > 0 {
            sink::record(MetricsEvent::AtomicDelta {
                index: &self.index,
                adds,
            });
        }

        debug!(index = %self.index, inserts, removes, adds, "applied index update");
    }
}

///
/// BuildStrategy
/// Kind-specific bulk population that replaces per-record `scan_item`.
///

pub trait BuildStrategy: Send + Sync {
    fn build(
        &self,
        maintainer: &dyn IndexMaintainer,
        records: &[&dyn Record],
        txn: &mut dyn Transaction,
    ) -> Result<(), InternalError>;
}

///
/// IndexMaintainer
///
/// Runtime component bound to one index and one subspace. Maintainers are
/// stateless: every call sees all of its inputs.
///

pub trait IndexMaintainer: Send + Sync {
    fn index(&self) -> &Index;

    fn subspace(&self) -> &Subspace;

    /// Expression extracting the primary key of an indexed record.
    fn id_expression(&self) -> &KeyExpression;

    fn structure(&self) -> SubspaceStructure;

    /// Compute the operations for `old -> new`. Either side may be absent
    /// (insert or delete). Only reads are issued against `txn`.
    fn plan_update(
        &self,
        old: Option<&dyn Record>,
        new: Option<&dyn Record>,
        txn: &mut dyn Transaction,
    ) -> Result<IndexUpdatePlan, InternalError>;

    /// Plan then apply. No write is issued when planning fails.
    fn update_index(
        &self,
        old: Option<&dyn Record>,
        new: Option<&dyn Record>,
        txn: &mut dyn Transaction,
    ) -> Result<(), InternalError> {
        let plan = self.plan_update(old, new, txn)?;
        plan.apply(txn);

        Ok(())
    }

    /// Index one existing record during a build. Equivalent to inserting it.
    fn scan_item(
        &self,
        record: &dyn Record,
        id: &Tuple,
        txn: &mut dyn Transaction,
    ) -> Result<(), InternalError>;

    /// Entries `record` contributes, without touching the store.
    fn compute_index_entries(
        &self,
        record: &dyn Record,
        id: &Tuple,
    ) -> Result<Vec<IndexEntry>, InternalError>;

    fn compute_index_keys(
        &self,
        record: &dyn Record,
        id: &Tuple,
    ) -> Result<Vec<Vec<u8>>, InternalError> {
        let entries = self.compute_index_entries(record, id)?;

        Ok(entries.into_iter().map(|entry| entry.key).collect())
    }

    fn custom_build_strategy(&self) -> Option<&dyn BuildStrategy> {
        None
    }
}

// Evaluation always yields the root arity; anything else is a bug in the
// expression layer, not bad input.
fn check_arity(index: &Index, actual: usize) -> Result<(), InternalError> {
    let expected = index.root_expression.arity();
    if actual != expected {
        return Err(InternalError::maintainer_internal(format!(
            "index '{}' evaluated {actual} values, expected {expected}",
            index.name
        )));
    }

    Ok(())
}
