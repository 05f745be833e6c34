use crate::{
    db::{
        index::{
            kind::SubspaceStructure,
            maintainer::{
                IndexEntry, IndexEntryValue, IndexMaintainer, IndexOp, IndexUpdatePlan,
                check_arity,
            },
        },
        key::{Subspace, Tuple},
        store::Transaction,
    },
    error::InternalError,
    expr::{EvaluationError, KeyExpression, evaluate},
    model::{Index, Record},
    obs::sink::{self, MetricsEvent},
    value::FieldValue,
};
use std::{
    collections::{BTreeMap, btree_map::Entry},
    sync::Arc,
};
use tracing::debug;

// 2^63 as f64; the first double that does not fit in i64.
const I64_LIMIT: f64 = 9_223_372_036_854_775_808.0;

///
/// AggregateFunction
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum AggregateFunction {
    /// +1 per record in the grouping.
    Count,
    /// The last evaluated value, summed per grouping.
    Sum,
}

///
/// AggregateIndexMaintainer
///
/// Aggregation layout: one key `subspace ‖ grouping` holding a little-endian
/// i64, maintained only through atomic adds. Concurrent writers never
/// conflict with each other, but every writer to one grouping touches the
/// same key, so a very hot grouping serializes at the storage layer.
///

pub struct AggregateIndexMaintainer {
    index: Arc<Index>,
    subspace: Subspace,
    id_expression: KeyExpression,
    function: AggregateFunction,
}

impl AggregateIndexMaintainer {
    #[must_use]
    pub const fn new(
        index: Arc<Index>,
        subspace: Subspace,
        id_expression: KeyExpression,
        function: AggregateFunction,
    ) -> Self {
        Self {
            index,
            subspace,
            id_expression,
            function,
        }
    }

    #[must_use]
    pub const fn function(&self) -> AggregateFunction {
        self.function
    }

    /// Grouping tuple and signed contribution of `record`, or None when the
    /// record contributes nothing.
    fn contribution(&self, record: &dyn Record) -> Result<Option<(Tuple, i64)>, InternalError> {
        let mut values = evaluate(record, &self.index.root_expression)?;
        check_arity(&self.index, values.len())?;

        if self.index.sparse && values.iter().any(FieldValue::is_null) {
            return Ok(None);
        }

        match self.function {
            AggregateFunction::Count => Ok(Some((Tuple::new(values), 1))),
            AggregateFunction::Sum => {
                let value = values.pop().ok_or_else(|| {
                    InternalError::maintainer_internal(format!(
                        "sum index '{}' evaluated no values",
                        self.index.name
                    ))
                })?;

                Ok(sum_delta(&value)?.map(|delta| (Tuple::new(values), delta)))
            }
        }
    }
}

impl IndexMaintainer for AggregateIndexMaintainer {
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
        SubspaceStructure::Aggregation
    }

    fn plan_update(
        &self,
        old: Option<&dyn Record>,
        new: Option<&dyn Record>,
        _txn: &mut dyn Transaction,
    ) -> Result<IndexUpdatePlan, InternalError> {
        let mut touched: BTreeMap<Vec<u8>, NetDelta> = BTreeMap::new();

        if let Some(old) = old
            && let Some((grouping, delta)) = self.contribution(old)?
        {
            let delta = delta.checked_neg().ok_or(EvaluationError::SumOverflow)?;
            accumulate(&mut touched, self.subspace.pack(&grouping), delta)?;
        }

        if let Some(new) = new
            && let Some((grouping, delta)) = self.contribution(new)?
        {
            accumulate(&mut touched, self.subspace.pack(&grouping), delta)?;
        }

        let mut plan = IndexUpdatePlan::new(self.index.name.as_str());
        for (key, net) in touched {
            // a single-sided zero still materializes the grouping key,
            // matching scan_item's blind add
            if net.delta != 0 || !net.both_sides {
                plan.push(IndexOp::Add {
                    key,
                    delta: net.delta,
                });
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

        if let Some((grouping, delta)) = self.contribution(record)? {
            txn.atomic_add(&self.subspace.pack(&grouping), delta);
            sink::record(MetricsEvent::AtomicDelta {
                index: &self.index.name,
                adds: 1,
            });
            debug!(index = %self.index.name, %id, %grouping, delta, "aggregated existing record");
        }

        Ok(())
    }

    fn compute_index_entries(
        &self,
        record: &dyn Record,
        _id: &Tuple,
    ) -> Result<Vec<IndexEntry>, InternalError> {
        let entries = self
            .contribution(record)?
            .map(|(grouping, delta)| IndexEntry {
                key: self.subspace.pack(&grouping),
                value: IndexEntryValue::Counter(delta),
            })
            .into_iter()
            .collect();

        Ok(entries)
    }
}

///
/// NetDelta
///
/// Per-grouping accumulator for one update. `both_sides` is set once the old
/// and the new record have both contributed to the same key.
///

#[derive(Clone, Copy, Debug)]
struct NetDelta {
    delta: i64,
    both_sides: bool,
}

fn accumulate(
    touched: &mut BTreeMap<Vec<u8>, NetDelta>,
    key: Vec<u8>,
    delta: i64,
) -> Result<(), EvaluationError> {
    match touched.entry(key) {
        Entry::Vacant(slot) => {
            slot.insert(NetDelta {
                delta,
                both_sides: false,
            });
        }
        Entry::Occupied(mut slot) => {
            let net = slot.get_mut();
            net.delta = net
                .delta
                .checked_add(delta)
                .ok_or(EvaluationError::SumOverflow)?;
            net.both_sides = true;
        }
    }

    Ok(())
}

/// Integer contribution of a summed value. Null contributes nothing;
/// doubles must be integral and inside the i64 range.
#[allow(clippy::cast_possible_truncation)]
fn sum_delta(value: &FieldValue) -> Result<Option<i64>, EvaluationError> {
    match value {
        FieldValue::Null => Ok(None),
        FieldValue::Int64(v) => Ok(Some(*v)),
        FieldValue::Double(d) => {
            if d.fract() == 0.0 && *d >= -I64_LIMIT && *d < I64_LIMIT {
                Ok(Some(*d as i64))
            } else {
                Err(EvaluationError::NonIntegralSum { value: *d })
            }
        }
        other => Err(EvaluationError::NonNumericSum {
            value: other.clone(),
        }),
    }
}
