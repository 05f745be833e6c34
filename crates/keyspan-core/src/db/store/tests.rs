use crate::{
    db::{
        key::KeyRange,
        store::{KeySelector, MemoryStore, StoreError, Transaction, decode_counter},
    },
    error::InternalError,
};

fn keys(rows: &[crate::db::store::KeyValue]) -> Vec<&[u8]> {
    rows.iter().map(|row| row.key.as_slice()).collect()
}

fn seeded() -> MemoryStore {
    let store = MemoryStore::new();
    let mut txn = store.begin().expect("begin");
    for key in [b"a".as_slice(), b"b", b"c", b"d"] {
        txn.set(key, b"v");
    }
    txn.commit().expect("seed commit");

    store
}

// ---- reads ------------------------------------------------------------

#[test]
fn reads_see_own_writes_over_snapshot() {
    let store = seeded();
    let mut txn = store.begin().expect("begin");

    txn.set(b"bb", b"new");
    txn.clear(b"c");

    let rows = txn
        .scan(&KeyRange::new(b"a".to_vec(), b"z".to_vec()), None, false)
        .expect("scan");

    assert_eq!(keys(&rows), vec![&b"a"[..], b"b", b"bb", b"d"]);
    assert_eq!(txn.get(b"c").expect("get"), None);
    assert_eq!(txn.get(b"bb").expect("get"), Some(b"new".to_vec()));
}

#[test]
fn reverse_scan_with_limit_returns_last_keys() {
    let store = seeded();
    let mut txn = store.begin().expect("begin");

    let rows = txn
        .scan(&KeyRange::new(b"a".to_vec(), b"d".to_vec()), Some(2), true)
        .expect("scan");

    assert_eq!(keys(&rows), vec![&b"c"[..], b"b"]);
}

#[test]
fn clear_range_hides_snapshot_and_overlay_keys() {
    let store = seeded();
    let mut txn = store.begin().expect("begin");

    txn.set(b"bz", b"pending");
    txn.clear_range(b"b", b"d");
    txn.set(b"c", b"after");

    let rows = txn
        .scan(&KeyRange::new(Vec::new(), vec![0xFF]), None, false)
        .expect("scan");
    assert_eq!(keys(&rows), vec![&b"a"[..], b"c", b"d"]);

    txn.commit().expect("commit");
    let mut check = store.begin().expect("begin");
    assert_eq!(check.get(b"b").expect("get"), None);
    assert_eq!(check.get(b"c").expect("get"), Some(b"after".to_vec()));
}

#[test]
fn selectors_resolve_relative_to_existing_keys() {
    let store = seeded();
    let mut txn = store.begin().expect("begin");

    // [first key > "a", last key <= "c" + 1) = ["b", "d") = b, c
    let rows = txn
        .get_range(
            &KeySelector::first_greater_than(b"a"),
            &KeySelector::last_less_or_equal(b"c").add(1),
            None,
            false,
        )
        .expect("range");
    assert_eq!(keys(&rows), vec![&b"b"[..], b"c"]);

    // Selector past the end yields nothing.
    let rows = txn
        .get_range(
            &KeySelector::first_greater_than(b"d"),
            &KeySelector::first_greater_or_equal(b"zz"),
            None,
            false,
        )
        .expect("range");
    assert!(rows.is_empty());
}

// ---- atomic add -------------------------------------------------------

#[test]
fn atomic_add_accumulates_little_endian() {
    let store = MemoryStore::new();
    let mut txn = store.begin().expect("begin");

    txn.atomic_add(b"n", 5);
    txn.atomic_add(b"n", -2);
    assert_eq!(txn.get(b"n").expect("get").map(|v| decode_counter(&v)), Some(3));
    txn.commit().expect("commit");

    let mut txn = store.begin().expect("begin");
    txn.atomic_add(b"n", 10);
    txn.commit().expect("commit");

    let mut txn = store.begin().expect("begin");
    assert_eq!(txn.get(b"n").expect("get"), Some(13i64.to_le_bytes().to_vec()));
}

#[test]
fn concurrent_atomic_adds_both_commit() {
    let store = MemoryStore::new();
    let mut first = store.begin().expect("begin");
    let mut second = store.begin().expect("begin");

    first.atomic_add(b"count", 1);
    second.atomic_add(b"count", 1);

    first.commit().expect("first commit");
    second.commit().expect("blind add takes no read conflict");

    let mut txn = store.begin().expect("begin");
    let total = txn.get(b"count").expect("get").map(|v| decode_counter(&v));
    assert_eq!(total, Some(2));
}

// ---- conflicts --------------------------------------------------------

#[test]
fn read_write_overlap_conflicts() {
    let store = seeded();
    let mut reader = store.begin().expect("begin");
    let mut writer = store.begin().expect("begin");

    reader.get(b"b").expect("get");
    reader.set(b"x", b"1");
    writer.set(b"b", b"changed");

    writer.commit().expect("writer commit");
    assert_eq!(reader.commit(), Err(StoreError::Conflict));
}

#[test]
fn disjoint_transactions_do_not_conflict() {
    let store = seeded();
    let mut left = store.begin().expect("begin");
    let mut right = store.begin().expect("begin");

    left.get(b"a").expect("get");
    left.set(b"a", b"L");
    right.get(b"d").expect("get");
    right.set(b"d", b"R");

    left.commit().expect("left commit");
    right.commit().expect("right commit");
}

#[test]
fn limited_scan_only_conflicts_on_returned_prefix() {
    let store = seeded();
    let mut reader = store.begin().expect("begin");
    let mut writer = store.begin().expect("begin");

    reader
        .scan(&KeyRange::new(b"a".to_vec(), b"z".to_vec()), Some(1), false)
        .expect("scan");
    reader.set(b"x", b"1");
    writer.set(b"c", b"outside the read prefix");

    writer.commit().expect("writer commit");
    reader.commit().expect("reader saw only \"a\"");
}

#[test]
fn transact_retries_conflicted_body() {
    let store = seeded();
    let mut attempts = 0;

    let value = store
        .transact(3, |txn| {
            attempts += 1;
            let seen = txn.get(b"a")?;
            if attempts == 1 {
                // A concurrent writer lands between read and commit.
                let mut other = store.begin()?;
                other.set(b"a", b"interleaved");
                other.commit()?;
            }
            txn.set(b"a", b"mine");

            Ok::<_, InternalError>(seen)
        })
        .expect("second attempt commits");

    assert_eq!(attempts, 2);
    assert_eq!(value, Some(b"interleaved".to_vec()));
}

#[test]
fn transact_gives_up_after_max_retries() {
    let store = seeded();

    let err = store
        .transact(0, |txn| {
            txn.get(b"a")?;
            let mut other = store.begin()?;
            other.set(b"a", b"again");
            other.commit()?;
            txn.set(b"b", b"x");

            Ok(())
        })
        .expect_err("conflict must surface");

    assert!(err.is_conflict());
}
