use crate::{
    config::BuildConfig,
    db::{index::maintainer::IndexMaintainer, key::Tuple, store::Transaction},
    error::InternalError,
    expr::extract_id,
    model::Record,
};
use tracing::info;

///
/// BuildProgress
/// Resume point after one batch; `last_id` is the id of the last record seen.
///

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct BuildProgress {
    pub scanned: usize,
    pub last_id: Option<Tuple>,
}

///
/// IndexBuilder
///
/// Populates an index over records that already exist. One call handles one
/// batch inside one caller-owned transaction; the caller iterates batches
/// and commits between them.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct IndexBuilder {
    batch_size: usize,
}

impl IndexBuilder {
    #[must_use]
    pub const fn new(batch_size: usize) -> Self {
        Self { batch_size }
    }

    #[must_use]
    pub const fn from_config(config: &BuildConfig) -> Self {
        Self::new(config.batch_size)
    }

    #[must_use]
    pub const fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Index at most `batch_size` leading records of `records`.
    pub fn build_batch(
        &self,
        maintainer: &dyn IndexMaintainer,
        records: &[&dyn Record],
        txn: &mut dyn Transaction,
    ) -> Result<BuildProgress, InternalError> {
        let batch = &records[..records.len().min(self.batch_size)];
        let index = &maintainer.index().name;

        if let Some(strategy) = maintainer.custom_build_strategy() {
            strategy.build(maintainer, batch, txn)?;
        } else {
            for record in batch {
                let id = extract_id(*record, maintainer.id_expression())?;
                maintainer.scan_item(*record, &id, txn)?;
            }
        }

        let last_id = batch
            .last()
            .map(|record| extract_id(*record, maintainer.id_expression()))
            .transpose()?;

        info!(index = %index, scanned = batch.len(), "index build batch finished");

        Ok(BuildProgress {
            scanned: batch.len(),
            last_id,
        })
    }
}
