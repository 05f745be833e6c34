use crate::{
    db::{
        key::KeyRange,
        store::{KeySelector, KeyValue, StoreError, Transaction, decode_counter},
    },
    error::InternalError,
};
use std::{
    cmp::Ordering,
    collections::{BTreeMap, VecDeque},
    iter::Peekable,
    ops::Bound,
    sync::{Arc, Mutex, MutexGuard},
};
use tracing::debug;

// Commits older than this many versions can no longer be conflict-checked.
const MAX_COMMIT_LOG: usize = 1024;

type Snapshot = Arc<BTreeMap<Vec<u8>, Vec<u8>>>;
type BoxIter<'a, V> = Box<dyn Iterator<Item = (&'a Vec<u8>, &'a V)> + 'a>;

///
/// MemoryStore
///
/// In-process ordered key-value store with snapshot reads and optimistic
/// commit-time conflict detection. Clones share the same committed state.
///

#[derive(Clone, Debug, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<StoreState>>,
}

#[derive(Debug, Default)]
struct StoreState {
    data: Snapshot,
    version: u64,
    log: VecDeque<CommitRecord>,
    // Highest commit version that has been dropped from `log`.
    log_floor: u64,
}

#[derive(Debug)]
struct CommitRecord {
    version: u64,
    writes: Vec<ConflictRange>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, StoreState>, StoreError> {
        self.state
            .lock()
            .map_err(|_| StoreError::Backend("memory store lock poisoned".to_string()))
    }

    /// Open a transaction reading the latest committed version.
    pub fn begin(&self) -> Result<MemoryTransaction, StoreError> {
        let state = self.lock()?;

        Ok(MemoryTransaction {
            store: self.clone(),
            read_version: state.version,
            snapshot: Arc::clone(&state.data),
            writes: BTreeMap::new(),
            cleared: Vec::new(),
            read_conflicts: Vec::new(),
            write_conflicts: Vec::new(),
        })
    }

    /// Latest committed version.
    pub fn version(&self) -> Result<u64, StoreError> {
        Ok(self.lock()?.version)
    }

    /// Number of committed keys.
    pub fn len(&self) -> Result<usize, StoreError> {
        Ok(self.lock()?.data.len())
    }

    pub fn is_empty(&self) -> Result<bool, StoreError> {
        Ok(self.len()? == 0)
    }

    /// Run `body` in a fresh transaction and commit it, re-running the whole
    /// body on conflict up to `max_retries` more times.
    pub fn transact<T, F>(&self, max_retries: u32, mut body: F) -> Result<T, InternalError>
    where
        F: FnMut(&mut MemoryTransaction) -> Result<T, InternalError>,
    {
        let mut attempt = 0;

        loop {
            let mut txn = self.begin()?;
            let result = body(&mut txn)
                .and_then(|value| txn.commit().map(|_| value).map_err(InternalError::from));

            match result {
                Err(err) if err.is_conflict() && attempt < max_retries => {
                    attempt += 1;
                    debug!(attempt, max_retries, "retrying transaction after conflict");
                }
                other => return other,
            }
        }
    }
}

#[derive(Clone, Debug)]
enum PendingWrite {
    Set(Vec<u8>),
    Cleared,
    Add(i64),
}

// Half-open key range; `end: None` is unbounded.
#[derive(Clone, Debug)]
struct ConflictRange {
    begin: Vec<u8>,
    end: Option<Vec<u8>>,
}

impl ConflictRange {
    fn single(key: &[u8]) -> Self {
        let mut end = key.to_vec();
        end.push(0x00);

        Self {
            begin: key.to_vec(),
            end: Some(end),
        }
    }

    fn intersects(&self, other: &Self) -> bool {
        other.end.as_ref().is_none_or(|end| self.begin < *end)
            && self.end.as_ref().is_none_or(|end| other.begin < *end)
    }
}

enum Position {
    Begin,
    Key(Vec<u8>),
    End,
}

///
/// MemoryTransaction
///
/// Snapshot reads at `read_version` plus a read-your-writes overlay.
/// Reads record conflict ranges; atomic adds do not.
///

pub struct MemoryTransaction {
    store: MemoryStore,
    read_version: u64,
    snapshot: Snapshot,
    writes: BTreeMap<Vec<u8>, PendingWrite>,
    cleared: Vec<KeyRange>,
    read_conflicts: Vec<ConflictRange>,
    write_conflicts: Vec<ConflictRange>,
}

impl MemoryTransaction {
    #[must_use]
    pub const fn read_version(&self) -> u64 {
        self.read_version
    }

    /// Commit buffered writes; returns the new committed version.
    ///
    /// Fails with `Conflict` when a key range this transaction read was
    /// written by a commit newer than its read version.
    pub fn commit(self) -> Result<u64, StoreError> {
        let mut state = self.store.lock()?;

        // read-only
        if self.write_conflicts.is_empty() {
            return Ok(self.read_version);
        }

        if !self.read_conflicts.is_empty() {
            if self.read_version < state.log_floor {
                return Err(StoreError::TransactionTooOld);
            }

            let conflicted = state
                .log
                .iter()
                .filter(|record| record.version > self.read_version)
                .any(|record| {
                    record.writes.iter().any(|written| {
                        self.read_conflicts
                            .iter()
                            .any(|read| read.intersects(written))
                    })
                });

            if conflicted {
                debug!(read_version = self.read_version, "memory store commit conflicted");
                return Err(StoreError::Conflict);
            }
        }

        {
            let data = Arc::make_mut(&mut state.data);

            for range in &self.cleared {
                let doomed: Vec<Vec<u8>> = data
                    .range::<[u8], _>((
                        Bound::Included(range.begin.as_slice()),
                        Bound::Excluded(range.end.as_slice()),
                    ))
                    .map(|(key, _)| key.clone())
                    .collect();
                for key in doomed {
                    data.remove(&key);
                }
            }

            for (key, write) in self.writes {
                match write {
                    PendingWrite::Set(value) => {
                        data.insert(key, value);
                    }
                    PendingWrite::Cleared => {
                        data.remove(&key);
                    }
                    PendingWrite::Add(delta) => {
                        let next = add_counter(data.get(&key).map(Vec::as_slice), delta);
                        data.insert(key, next);
                    }
                }
            }
        }

        state.version += 1;
        let version = state.version;
        state.log.push_back(CommitRecord {
            version,
            writes: self.write_conflicts,
        });
        while state.log.len() > MAX_COMMIT_LOG {
            if let Some(dropped) = state.log.pop_front() {
                state.log_floor = dropped.version;
            }
        }

        Ok(version)
    }

    fn is_cleared(&self, key: &[u8]) -> bool {
        self.cleared.iter().any(|range| range.contains(key))
    }

    fn base_value(&self, key: &[u8]) -> Option<Vec<u8>> {
        if self.is_cleared(key) {
            None
        } else {
            self.snapshot.get(key).cloned()
        }
    }

    fn resolve_write(&self, key: &[u8], write: &PendingWrite) -> Option<Vec<u8>> {
        match write {
            PendingWrite::Set(value) => Some(value.clone()),
            PendingWrite::Cleared => None,
            PendingWrite::Add(delta) => Some(add_counter(self.base_value(key).as_deref(), *delta)),
        }
    }

    fn visible_value(&self, key: &[u8]) -> Option<Vec<u8>> {
        match self.writes.get(key) {
            Some(write) => self.resolve_write(key, write),
            None => self.base_value(key),
        }
    }

    fn merged<'a>(&'a self, lower: Bound<&[u8]>, upper: Bound<&[u8]>, reverse: bool) -> Merged<'a> {
        let (snapshot, writes): (BoxIter<'a, Vec<u8>>, BoxIter<'a, PendingWrite>) =
            if !bounds_nonempty(lower, upper) {
                (Box::new(std::iter::empty()), Box::new(std::iter::empty()))
            } else if reverse {
                (
                    Box::new(self.snapshot.range::<[u8], _>((lower, upper)).rev()),
                    Box::new(self.writes.range::<[u8], _>((lower, upper)).rev()),
                )
            } else {
                (
                    Box::new(self.snapshot.range::<[u8], _>((lower, upper))),
                    Box::new(self.writes.range::<[u8], _>((lower, upper))),
                )
            };

        Merged {
            txn: self,
            snapshot: snapshot.peekable(),
            writes: writes.peekable(),
            reverse,
        }
    }

    fn resolve(&self, selector: &KeySelector) -> Position {
        let key = selector.key.as_slice();

        if selector.offset >= 1 {
            let lower = if selector.or_equal {
                Bound::Excluded(key)
            } else {
                Bound::Included(key)
            };
            let skip = usize::try_from(selector.offset - 1).unwrap_or(usize::MAX);

            match self.merged(lower, Bound::Unbounded, false).nth(skip) {
                Some((found, _)) => Position::Key(found),
                None => Position::End,
            }
        } else {
            let upper = if selector.or_equal {
                Bound::Included(key)
            } else {
                Bound::Excluded(key)
            };
            let skip = usize::try_from(selector.offset.unsigned_abs()).unwrap_or(usize::MAX);

            match self.merged(Bound::Unbounded, upper, true).nth(skip) {
                Some((found, _)) => Position::Key(found),
                None => Position::Begin,
            }
        }
    }
}

impl Transaction for MemoryTransaction {
    fn get(&mut self, key: &[u8]) -> Result<Option<Vec<u8>>, StoreError> {
        self.read_conflicts.push(ConflictRange::single(key));

        Ok(self.visible_value(key))
    }

    fn set(&mut self, key: &[u8], value: &[u8]) {
        self.writes
            .insert(key.to_vec(), PendingWrite::Set(value.to_vec()));
        self.write_conflicts.push(ConflictRange::single(key));
    }

    fn clear(&mut self, key: &[u8]) {
        self.writes.insert(key.to_vec(), PendingWrite::Cleared);
        self.write_conflicts.push(ConflictRange::single(key));
    }

    fn clear_range(&mut self, begin: &[u8], end: &[u8]) {
        if begin >= end {
            return;
        }

        for (_, write) in self
            .writes
            .range_mut::<[u8], _>((Bound::Included(begin), Bound::Excluded(end)))
        {
            *write = PendingWrite::Cleared;
        }
        self.cleared
            .push(KeyRange::new(begin.to_vec(), end.to_vec()));
        self.write_conflicts.push(ConflictRange {
            begin: begin.to_vec(),
            end: Some(end.to_vec()),
        });
    }

    fn atomic_add(&mut self, key: &[u8], delta: i64) {
        let next = match self.writes.get(key) {
            Some(PendingWrite::Set(value)) => {
                PendingWrite::Set(add_counter(Some(value.as_slice()), delta))
            }
            Some(PendingWrite::Cleared) => PendingWrite::Set(add_counter(None, delta)),
            Some(PendingWrite::Add(pending)) => PendingWrite::Add(pending.wrapping_add(delta)),
            None if self.is_cleared(key) => PendingWrite::Set(add_counter(None, delta)),
            None => PendingWrite::Add(delta),
        };

        self.writes.insert(key.to_vec(), next);
        self.write_conflicts.push(ConflictRange::single(key));
    }

    fn get_range(
        &mut self,
        begin: &KeySelector,
        end: &KeySelector,
        limit: Option<usize>,
        reverse: bool,
    ) -> Result<Vec<KeyValue>, StoreError> {
        let begin = self.resolve(begin);
        let end = self.resolve(end);

        let lower = match &begin {
            Position::Begin => Bound::Unbounded,
            Position::Key(key) => Bound::Included(key.as_slice()),
            Position::End => return Ok(Vec::new()),
        };
        let upper = match &end {
            Position::Begin => return Ok(Vec::new()),
            Position::Key(key) => Bound::Excluded(key.as_slice()),
            Position::End => Bound::Unbounded,
        };

        let limit = limit.unwrap_or(usize::MAX);
        let rows: Vec<KeyValue> = self
            .merged(lower, upper, reverse)
            .take(limit)
            .map(|(key, value)| KeyValue { key, value })
            .collect();

        let mut conflict = ConflictRange {
            begin: match lower {
                Bound::Included(key) => key.to_vec(),
                _ => Vec::new(),
            },
            end: match upper {
                Bound::Excluded(key) => Some(key.to_vec()),
                _ => None,
            },
        };
        // A limited read only depends on the keys up to the last one returned.
        if rows.len() == limit
            && let Some(last) = rows.last()
        {
            if reverse {
                conflict.begin.clone_from(&last.key);
            } else {
                let mut end = last.key.clone();
                end.push(0x00);
                conflict.end = Some(end);
            }
        }
        self.read_conflicts.push(conflict);

        Ok(rows)
    }
}

///
/// Merged
/// Lazy merge of snapshot rows and the overlay, in scan direction.
///

struct Merged<'a> {
    txn: &'a MemoryTransaction,
    snapshot: Peekable<BoxIter<'a, Vec<u8>>>,
    writes: Peekable<BoxIter<'a, PendingWrite>>,
    reverse: bool,
}

impl Iterator for Merged<'_> {
    type Item = (Vec<u8>, Vec<u8>);

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let order = match (self.snapshot.peek(), self.writes.peek()) {
                (None, None) => return None,
                (Some(_), None) => Ordering::Less,
                (None, Some(_)) => Ordering::Greater,
                (Some((stored, _)), Some((written, _))) => {
                    let order = stored.cmp(written);
                    if self.reverse { order.reverse() } else { order }
                }
            };

            if order == Ordering::Less {
                let (key, value) = self.snapshot.next()?;
                if !self.txn.is_cleared(key) {
                    return Some((key.clone(), value.clone()));
                }
                continue;
            }

            // The overlay shadows an equal snapshot key.
            if order == Ordering::Equal {
                self.snapshot.next();
            }
            let (key, write) = self.writes.next()?;
            if let Some(value) = self.txn.resolve_write(key, write) {
                return Some((key.clone(), value));
            }
        }
    }
}

fn bounds_nonempty(lower: Bound<&[u8]>, upper: Bound<&[u8]>) -> bool {
    match (lower, upper) {
        (Bound::Included(lower), Bound::Included(upper)) => lower <= upper,
        (Bound::Included(lower) | Bound::Excluded(lower), Bound::Excluded(upper))
        | (Bound::Excluded(lower), Bound::Included(upper)) => lower < upper,
        _ => true,
    }
}

fn add_counter(existing: Option<&[u8]>, delta: i64) -> Vec<u8> {
    let current = existing.map_or(0, decode_counter);

    current.wrapping_add(delta).to_le_bytes().to_vec()
}
