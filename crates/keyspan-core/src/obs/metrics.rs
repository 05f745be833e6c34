use serde::{Deserialize, Serialize};
use std::{
    cell::RefCell,
    collections::BTreeMap,
    time::{SystemTime, UNIX_EPOCH},
};

///
/// EventState
/// Ephemeral, in-memory counters for index maintenance.
///

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct EventState {
    pub ops: EventOps,
    pub indexes: BTreeMap<String, IndexCounters>,
    pub since_ms: u64,
}

impl Default for EventState {
    fn default() -> Self {
        Self {
            ops: EventOps::default(),
            indexes: BTreeMap::new(),
            since_ms: now_millis(),
        }
    }
}

///
/// EventOps
///

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct EventOps {
    // Flat layout
    pub index_inserts: u64,
    pub index_removes: u64,
    pub unique_violations: u64,

    // Aggregation layout
    pub atomic_adds: u64,

    // Bulk build and scrubbing
    pub items_scanned: u64,
    pub drift_missing: u64,
    pub drift_dangling: u64,
}

///
/// IndexCounters
///

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct IndexCounters {
    pub index_inserts: u64,
    pub index_removes: u64,
    pub unique_violations: u64,
    pub atomic_adds: u64,
    pub items_scanned: u64,
    pub drift_missing: u64,
    pub drift_dangling: u64,
}

impl IndexCounters {
    const fn writes(&self) -> u64 {
        self.index_inserts
            .saturating_add(self.index_removes)
            .saturating_add(self.atomic_adds)
    }
}

// Per-thread; see `metrics_report`.
thread_local! {
    static EVENT_STATE: RefCell<EventState> = RefCell::new(EventState::default());
}

/// Borrow metrics immutably.
pub(crate) fn with_state<R>(f: impl FnOnce(&EventState) -> R) -> R {
    EVENT_STATE.with(|m| f(&m.borrow()))
}

/// Borrow metrics mutably.
pub(crate) fn with_state_mut<R>(f: impl FnOnce(&mut EventState) -> R) -> R {
    EVENT_STATE.with(|m| f(&mut m.borrow_mut()))
}

/// Reset all counters.
pub(crate) fn reset_all() {
    with_state_mut(|m| *m = EventState::default());
}

///
/// EventReport
///

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct EventReport {
    /// Ephemeral runtime counters since `since_ms`.
    pub counters: Option<EventState>,
    /// Per-index summaries, busiest index first.
    pub index_counters: Vec<IndexSummary>,
}

///
/// IndexSummary
///

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct IndexSummary {
    pub index: String,
    pub writes: u64,
    pub items_scanned: u64,
    pub unique_violations: u64,
    pub drift: u64,
}

pub(crate) fn report() -> EventReport {
    let snap = with_state(Clone::clone);

    let mut index_counters: Vec<IndexSummary> = snap
        .indexes
        .iter()
        .map(|(index, counters)| IndexSummary {
            index: index.clone(),
            writes: counters.writes(),
            items_scanned: counters.items_scanned,
            unique_violations: counters.unique_violations,
            drift: counters.drift_missing.saturating_add(counters.drift_dangling),
        })
        .collect();
    index_counters.sort_by(|a, b| b.writes.cmp(&a.writes).then_with(|| a.index.cmp(&b.index)));

    EventReport {
        counters: Some(snap),
        index_counters,
    }
}

fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |elapsed| u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX))
}

///
/// TESTS
///
