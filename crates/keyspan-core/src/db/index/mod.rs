//! Module: db::index
//! Responsibility: index kinds, their maintainers, and the reads and bulk
//! passes built on the resulting layouts.
//! Does not own: record storage or transaction lifetime.

pub mod build;
pub mod kind;
pub mod maintainer;
pub mod query;
pub mod scrub;

pub use build::{BuildProgress, IndexBuilder};
pub use kind::{BuiltinKind, IndexKind, IndexKindRegistry, KindValidationError, SubspaceStructure};
pub use maintainer::{
    AggregateFunction, AggregateIndexMaintainer, BuildStrategy, IndexEntry, IndexEntryValue,
    IndexMaintainer, IndexOp, IndexUpdatePlan, MaintainerError, ValueIndexMaintainer,
};
pub use query::{GroupEntry, aggregate_value, group_entries, max_value, min_value};
pub use scrub::{CounterMismatch, DriftReport, IndexScrubber};
