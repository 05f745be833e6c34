use crate::{
    db::{
        index::{
            kind::SubspaceStructure,
            maintainer::{
                IndexEntry, IndexEntryValue, IndexMaintainer, IndexOp, IndexUpdatePlan,
                MaintainerError, check_arity,
            },
        },
        key::{Subspace, Tuple},
        store::Transaction,
    },
    error::InternalError,
    expr::{KeyExpression, evaluate, extract_id},
    model::{Index, Record},
    obs::sink::{self, MetricsEvent},
    value::FieldValue,
};
use std::{collections::BTreeMap, sync::Arc};
use tracing::debug;

///
/// ValueIndexMaintainer
///
/// Flat layout: one empty-valued key `subspace ‖ values ‖ id` per record.
/// Serves scalar lookups and, because keys sort by value inside a grouping,
/// min/max reads with a single limit-1 scan.
///

pub struct ValueIndexMaintainer {
    index: Arc<Index>,
    subspace: Subspace,
    id_expression: KeyExpression,
}

impl ValueIndexMaintainer {
    #[must_use]
    pub const fn new(index: Arc<Index>, subspace: Subspace, id_expression: KeyExpression) -> Self {
        Self {
            index,
            subspace,
            id_expression,
        }
    }

    // Evaluated root values, or None when a sparse index skips the record.
    fn indexed_values(&self, record: &dyn Record) -> Result<Option<Tuple>, InternalError> {
        let values = evaluate(record, &self.index.root_expression)?;
        check_arity(&self.index, values.len())?;

        if self.index.sparse && values.iter().any(FieldValue::is_null) {
            return Ok(None);
        }

        Ok(Some(Tuple::new(values)))
    }

    fn entry_key(&self, values: &Tuple, id: &Tuple) -> Vec<u8> {
        let mut key = self.subspace.pack(values);
        id.encode_into(&mut key);
        key
    }

    // Reject `values` when another id already holds them. Keys marked `false`
    // in `touched` are being cleared by the same plan and no longer count.
    fn check_unique(
        &self,
        values: &Tuple,
        id: &Tuple,
        touched: &BTreeMap<Vec<u8>, bool>,
        txn: &mut dyn Transaction,
    ) -> Result<(), InternalError> {
        let rows = txn.scan(&self.subspace.range_of(values), Some(2), false)?;

        for row in rows {
            if touched.get(&row.key) == Some(&false) {
                continue;
            }

            let decoded = self.subspace.unpack(&row.key)?;
            let existing_id: Tuple = decoded.iter().skip(values.len()).cloned().collect();
            if existing_id == *id {
                continue;
            }

            sink::record(MetricsEvent::UniqueViolation {
                index: &self.index.name,
            });

            return Err(MaintainerError::UniqueViolation {
                index: self.index.name.clone(),
                values: values.clone(),
                existing_id,
            }
            .into());
        }

        Ok(())
    }
}

impl IndexMaintainer for ValueIndexMaintainer {
    fn index(&self) -> &Index {
        &self.index
    }

    fn subspace(&self) -> &Subspace {
        &self.subspace
    }

    fn id_expression(&self) -> &KeyExpression {
        &self.id_expression
    }

    fn structure(&self) -> SubspaceStructure {
        SubspaceStructure::Flat
    }

    fn plan_update(
        &self,
        old: Option<&dyn Record>,
        new: Option<&dyn Record>,
        txn: &mut dyn Transaction,
    ) -> Result<IndexUpdatePlan, InternalError> {
        // key -> present after the update
        let mut touched: BTreeMap<Vec<u8>, bool> = BTreeMap::new();

        if let Some(old) = old {
            let id = extract_id(old, &self.id_expression)?;
            if let Some(values) = self.indexed_values(old)? {
                touched.insert(self.entry_key(&values, &id), false);
            }
        }

        if let Some(new) = new {
            let id = extract_id(new, &self.id_expression)?;
            if let Some(values) = self.indexed_values(new)? {
                if self.index.unique {
                    self.check_unique(&values, &id, &touched, txn)?;
                }
                touched.insert(self.entry_key(&values, &id), true);
            }
        }

        let mut plan = IndexUpdatePlan::new(self.index.name.as_str());
        for (key, present) in touched {
            if present {
                plan.push(IndexOp::Set {
                    key,
                    value: IndexEntryValue::Empty.to_bytes(),
                });
            } else {
                plan.push(IndexOp::Clear { key });
            }
        }

        Ok(plan)
    }

    fn scan_item(
        &self,
        record: &dyn Record,
        id: &Tuple,
        txn: &mut dyn Transaction,
    ) -> Result<(), InternalError> {
        sink::record(MetricsEvent::ScanItem {
            index: &self.index.name,
        });

        let Some(values) = self.indexed_values(record)? else {
            return Ok(());
        };
        if self.index.unique {
            self.check_unique(&values, id, &BTreeMap::new(), txn)?;
        }

        txn.set(&self.entry_key(&values, id), &[]);
        debug!(index = %self.index.name, %id, "indexed existing record");

        Ok(())
    }

    fn compute_index_entries(
        &self,
        record: &dyn Record,
        id: &Tuple,
    ) -> Result<Vec<IndexEntry>, InternalError> {
        let entries = self
            .indexed_values(record)?
            .map(|values| IndexEntry {
                key: self.entry_key(&values, id),
                value: IndexEntryValue::Empty,
            })
            .into_iter()
            .collect();

        Ok(entries)
    }
}
