use crate::{
    config::ScrubConfig,
    db::{
        index::{
            kind::SubspaceStructure,
            maintainer::{IndexEntryValue, IndexMaintainer},
        },
        key::Tuple,
        store::{KeySelector, KeyValue, Transaction, decode_counter},
    },
    error::InternalError,
    expr::extract_id,
    model::Record,
    obs::sink::{self, MetricsEvent},
};
use std::collections::{BTreeMap, BTreeSet};
use tracing::warn;

///
/// CounterMismatch
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CounterMismatch {
    pub key: Vec<u8>,
    pub expected: i64,
    pub stored: i64,
}

///
/// DriftReport
///
/// Disagreements between records and stored index entries.
/// `missing`: keys the records imply but the store lacks.
/// `dangling`: stored keys no live record implies.
/// `mismatched`: aggregation counters holding the wrong total.
///

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct DriftReport {
    pub missing: Vec<Vec<u8>>,
    pub dangling: Vec<Vec<u8>>,
    pub mismatched: Vec<CounterMismatch>,
}

impl DriftReport {
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.missing.is_empty() && self.dangling.is_empty() && self.mismatched.is_empty()
    }
}

///
/// IndexScrubber
///
/// Verifies an index against the records it was built from and, when
/// `repair` is set, rewrites the disagreeing entries in the same transaction.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct IndexScrubber {
    repair: bool,
    batch_size: usize,
}

impl IndexScrubber {
    #[must_use]
    pub const fn new(repair: bool, batch_size: usize) -> Self {
        Self { repair, batch_size }
    }

    #[must_use]
    pub const fn from_config(config: &ScrubConfig) -> Self {
        Self::new(config.repair, config.batch_size)
    }

    /// Check that every key `records` imply is present in a flat index.
    pub fn verify_records(
        &self,
        maintainer: &dyn IndexMaintainer,
        records: &[&dyn Record],
        txn: &mut dyn Transaction,
    ) -> Result<DriftReport, InternalError> {
        require_flat(maintainer, "verify_records")?;
        let mut report = DriftReport::default();

        for record in records {
            let id = extract_id(*record, maintainer.id_expression())?;
            for key in maintainer.compute_index_keys(*record, &id)? {
                if txn.get(&key)?.is_none() {
                    if self.repair {
                        txn.set(&key, &IndexEntryValue::Empty.to_bytes());
                    }
                    report.missing.push(key);
                }
            }
        }

        Ok(self.finish(maintainer, report))
    }

    /// Walk a flat index and report entries whose id is not in `live_ids`.
    pub fn scan_dangling(
        &self,
        maintainer: &dyn IndexMaintainer,
        live_ids: &BTreeSet<Tuple>,
        txn: &mut dyn Transaction,
    ) -> Result<DriftReport, InternalError> {
        require_flat(maintainer, "scan_dangling")?;
        let arity = maintainer.index().root_expression.arity();
        let mut report = DriftReport::default();

        self.walk(maintainer, txn, |txn, row| {
            let mut values = maintainer.subspace().unpack(&row.key)?.into_values();
            let id = Tuple::new(values.split_off(arity.min(values.len())));

            if !live_ids.contains(&id) {
                if self.repair {
                    txn.clear(&row.key);
                }
                report.dangling.push(row.key);
            }

            Ok(())
        })?;

        Ok(self.finish(maintainer, report))
    }

    /// Recompute aggregation totals over `records` (every live record of the
    /// entity) and compare them with the stored counters.
    pub fn verify_aggregates(
        &self,
        maintainer: &dyn IndexMaintainer,
        records: &[&dyn Record],
        txn: &mut dyn Transaction,
    ) -> Result<DriftReport, InternalError> {
        if maintainer.structure() != SubspaceStructure::Aggregation {
            return Err(InternalError::maintainer_unsupported(format!(
                "verify_aggregates needs an aggregation index, '{}' is {}",
                maintainer.index().name,
                maintainer.structure()
            )));
        }

        let mut expected: BTreeMap<Vec<u8>, i64> = BTreeMap::new();
        for record in records {
            let id = extract_id(*record, maintainer.id_expression())?;
            for entry in maintainer.compute_index_entries(*record, &id)? {
                if let IndexEntryValue::Counter(delta) = entry.value {
                    // wraps like the store's atomic add
                    let total = expected.entry(entry.key).or_insert(0);
                    *total = total.wrapping_add(delta);
                }
            }
        }

        let mut report = DriftReport::default();
        self.walk(maintainer, txn, |txn, row| {
            let stored = decode_counter(&row.value);

            match expected.remove(&row.key) {
                Some(total) if total == stored => {}
                Some(total) => {
                    if self.repair {
                        txn.set(&row.key, &total.to_le_bytes());
                    }
                    report.mismatched.push(CounterMismatch {
                        key: row.key,
                        expected: total,
                        stored,
                    });
                }
                // zero counters are left behind by blind adds
                None if stored == 0 => {}
                None => {
                    if self.repair {
                        txn.clear(&row.key);
                    }
                    report.dangling.push(row.key);
                }
            }

            Ok(())
        })?;

        for (key, total) in expected {
            if total == 0 {
                continue;
            }
            if self.repair {
                txn.set(&key, &total.to_le_bytes());
            }
            report.missing.push(key);
        }

        Ok(self.finish(maintainer, report))
    }

    // Visit every key of the index subspace in `batch_size` reads.
    fn walk(
        &self,
        maintainer: &dyn IndexMaintainer,
        txn: &mut dyn Transaction,
        mut visit: impl FnMut(&mut dyn Transaction, KeyValue) -> Result<(), InternalError>,
    ) -> Result<(), InternalError> {
        let range = maintainer.subspace().range();
        let end = KeySelector::first_greater_or_equal(&range.end);
        let mut begin = KeySelector::first_greater_or_equal(&range.begin);
        let batch_size = self.batch_size.max(1);

        loop {
            let rows = txn.get_range(&begin, &end, Some(batch_size), false)?;
            let exhausted = rows.len() < batch_size;
            let Some(last) = rows.last() else {
                break;
            };
            begin = KeySelector::first_greater_than(&last.key);

            for row in rows {
                visit(&mut *txn, row)?;
            }
            if exhausted {
                break;
            }
        }

        Ok(())
    }

    fn finish(&self, maintainer: &dyn IndexMaintainer, report: DriftReport) -> DriftReport {
        if report.is_clean() {
            return report;
        }

        let index = &maintainer.index().name;
        let missing = report.missing.len() + report.mismatched.len();
        sink::record(MetricsEvent::Drift {
            index,
            missing: u64::try_from(missing).unwrap_or(u64::MAX),
            dangling: u64::try_from(report.dangling.len()).unwrap_or(u64::MAX),
        });
        warn!(
            index = %index,
            missing = report.missing.len(),
            dangling = report.dangling.len(),
            mismatched = report.mismatched.len(),
            repaired = self.repair,
            "index drift detected"
        );

        report
    }
}

fn require_flat(maintainer: &dyn IndexMaintainer, operation: &str) -> Result<(), InternalError> {
    if maintainer.structure() == SubspaceStructure::Flat {
        return Ok(());
    }

    Err(InternalError::maintainer_unsupported(format!(
        "{operation} needs a flat index, '{}' is {}",
        maintainer.index().name,
        maintainer.structure()
    )))
}
