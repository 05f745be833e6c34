//! Metrics sink boundary.
//!
//! Index maintenance code MUST NOT touch obs::metrics directly.
//! All instrumentation flows through MetricsEvent and MetricsSink.
use crate::obs::metrics::{self, EventReport, IndexCounters};
use std::{cell::RefCell, rc::Rc};

thread_local! {
    static SINK_OVERRIDE: RefCell<Option<Rc<dyn MetricsSink>>> = const { RefCell::new(None) };
}

///
/// MetricsEvent
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum MetricsEvent<'a> {
    IndexDelta {
        index: &'a str,
        inserts: u64,
        removes: u64,
    },
    AtomicDelta {
        index: &'a str,
        adds: u64,
    },
    ScanItem {
        index: &'a str,
    },
    UniqueViolation {
        index: &'a str,
    },
    Drift {
        index: &'a str,
        missing: u64,
        dangling: u64,
    },
}

///
/// MetricsSink
///

pub trait MetricsSink {
    fn record(&self, event: MetricsEvent<'_>);
}

/// GlobalMetricsSink
/// Default sink writing into the thread-local counters.
/// Acts as the concrete sink when no scoped override is installed.

pub(crate) struct GlobalMetricsSink;

impl GlobalMetricsSink {
    fn bump(index: &str, f: impl FnOnce(&mut metrics::EventOps, &mut IndexCounters)) {
        metrics::with_state_mut(|m| {
            let entry = m.indexes.entry(index.to_string()).or_default();
            f(&mut m.ops, entry);
        });
    }
}

impl MetricsSink for GlobalMetricsSink {
    fn record(&self, event: MetricsEvent<'_>) {
        match event {
            MetricsEvent::IndexDelta {
                index,
                inserts,
                removes,
            } => Self::bump(index, |ops, entry| {
                ops.index_inserts = ops.index_inserts.saturating_add(inserts);
                ops.index_removes = ops.index_removes.saturating_add(removes);
                entry.index_inserts = entry.index_inserts.saturating_add(inserts);
                entry.index_removes = entry.index_removes.saturating_add(removes);
            }),

            MetricsEvent::AtomicDelta { index, adds } => Self::bump(index, |ops, entry| {
                ops.atomic_adds = ops.atomic_adds.saturating_add(adds);
                entry.atomic_adds = entry.atomic_adds.saturating_add(adds);
            }),

            MetricsEvent::ScanItem { index } => Self::bump(index, |ops, entry| {
                ops.items_scanned = ops.items_scanned.saturating_add(1);
                entry.items_scanned = entry.items_scanned.saturating_add(1);
            }),

            MetricsEvent::UniqueViolation { index } => Self::bump(index, |ops, entry| {
                ops.unique_violations = ops.unique_violations.saturating_add(1);
                entry.unique_violations = entry.unique_violations.saturating_add(1);
            }),

            MetricsEvent::Drift {
                index,
                missing,
                dangling,
            } => Self::bump(index, |ops, entry| {
                ops.drift_missing = ops.drift_missing.saturating_add(missing);
                ops.drift_dangling = ops.drift_dangling.saturating_add(dangling);
                entry.drift_missing = entry.drift_missing.saturating_add(missing);
                entry.drift_dangling = entry.drift_dangling.saturating_add(dangling);
            }),
        }
    }
}

pub(crate) const GLOBAL_METRICS_SINK: GlobalMetricsSink = GlobalMetricsSink;

pub(crate) fn record(event: MetricsEvent<'_>) {
    // Clone out of the slot so a sink may itself record without a borrow clash.
    let sink = SINK_OVERRIDE.with(|cell| cell.borrow().clone());

    match sink {
        Some(sink) => sink.record(event),
        None => GLOBAL_METRICS_SINK.record(event),
    }
}

/// Snapshot the current thread's metrics state.
///
/// Counters are per thread. Maintenance run on worker threads is only
/// visible here when the report is taken on that same thread; install a
/// [`MetricsSink`] with [`with_metrics_sink`] on each worker to aggregate
/// across threads.
#[must_use]
pub fn metrics_report() -> EventReport {
    metrics::report()
}

/// Reset the current thread's metrics state.
pub fn metrics_reset_all() {
    metrics::reset_all();
}

/// Run a closure with a temporary metrics sink override.
pub fn with_metrics_sink<T>(sink: Rc<dyn MetricsSink>, f: impl FnOnce() -> T) -> T {
    struct Guard(Option<Rc<dyn MetricsSink>>);

    impl Drop for Guard {
        fn drop(&mut self) {
            let prev = self.0.take();
            SINK_OVERRIDE.with(|cell| {
                *cell.borrow_mut() = prev;
            });
        }
    }

    let prev = SINK_OVERRIDE.with(|cell| cell.borrow_mut().replace(sink));
    let _guard = Guard(prev);

    f()
}

///
/// TESTS
///
