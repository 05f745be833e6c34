use crate::{
    db::{
        index::maintainer::{
            AggregateFunction, AggregateIndexMaintainer, IndexEntryValue, IndexMaintainer,
            IndexOp, MaintainerError, ValueIndexMaintainer,
        },
        key::{Subspace, Tuple},
        store::{MemoryStore, Transaction, decode_counter},
    },
    error::{ErrorClass, ErrorDetail},
    expr::{EvaluationError, KeyExpression},
    model::{Index, IndexDescriptor, RecordData},
    obs::{MetricsEvent, MetricsSink, with_metrics_sink},
    test_support::init_tracing,
    tuple,
    value::FieldValue,
};
use std::{cell::RefCell, rc::Rc, sync::Arc};

fn index(descriptor: IndexDescriptor) -> Arc<Index> {
    init_tracing();
    Arc::new(Index::from_descriptor(&descriptor).expect("valid paths"))
}

fn subspace(name: &str) -> Subspace {
    Subspace::from_name("test", name)
}

fn scalar(descriptor: IndexDescriptor) -> ValueIndexMaintainer {
    let name = descriptor.name.clone();
    ValueIndexMaintainer::new(index(descriptor), subspace(&name), KeyExpression::field("id"))
}

fn aggregate(descriptor: IndexDescriptor, function: AggregateFunction) -> AggregateIndexMaintainer {
    let name = descriptor.name.clone();
    AggregateIndexMaintainer::new(
        index(descriptor),
        subspace(&name),
        KeyExpression::field("id"),
        function,
    )
}

fn user(id: i64, email: &str) -> RecordData {
    RecordData::new("user").with("id", id).with("email", email)
}

fn sale(id: i64, shop: &str, amount: impl Into<FieldValue>) -> RecordData {
    RecordData::new("sale")
        .with("id", id)
        .with("shop", shop)
        .with("amount", amount)
}

fn stored_keys(store: &MemoryStore, subspace: &Subspace) -> Vec<Vec<u8>> {
    let mut txn = store.begin().expect("begin");
    txn.scan(&subspace.range(), None, false)
        .expect("scan")
        .into_iter()
        .map(|row| row.key)
        .collect()
}

fn counter(store: &MemoryStore, key: &[u8]) -> Option<i64> {
    let mut txn = store.begin().expect("begin");
    txn.get(key).expect("get").map(|bytes| decode_counter(&bytes))
}

#[derive(Default)]
struct RecordingSink {
    events: RefCell<Vec<String>>,
}

impl MetricsSink for RecordingSink {
    fn record(&self, event: MetricsEvent<'_>) {
        self.events.borrow_mut().push(format!("{event:?}"));
    }
}

// ---- flat layout ------------------------------------------------------

#[test]
fn insert_writes_one_key_matching_computed_keys() {
    let maintainer = scalar(IndexDescriptor::new("by_email", ["email"], "scalar"));
    let store = MemoryStore::new();
    let record = user(1, "a@x");

    let mut txn = store.begin().expect("begin");
    maintainer
        .update_index(None, Some(&record), &mut txn)
        .expect("insert");
    txn.commit().expect("commit");

    let expected = maintainer
        .compute_index_keys(&record, &tuple![1i64])
        .expect("compute");
    assert_eq!(stored_keys(&store, maintainer.subspace()), expected);
    assert_eq!(
        maintainer.subspace().unpack(&expected[0]).expect("decode"),
        tuple!["a@x", 1i64]
    );
}

#[test]
fn unchanged_key_plans_a_single_set() {
    let maintainer = scalar(IndexDescriptor::new("by_email", ["email"], "scalar"));
    let store = MemoryStore::new();
    let mut txn = store.begin().expect("begin");

    let plan = maintainer
        .plan_update(Some(&user(1, "a@x")), Some(&user(1, "a@x")), &mut txn)
        .expect("plan");

    assert_eq!(plan.ops().len(), 1);
    assert!(matches!(plan.ops()[0], IndexOp::Set { .. }));
}

#[test]
fn changed_value_clears_old_key_and_sets_new_one() {
    let maintainer = scalar(IndexDescriptor::new("by_email", ["email"], "scalar"));
    let store = MemoryStore::new();

    let mut txn = store.begin().expect("begin");
    maintainer
        .update_index(None, Some(&user(1, "a@x")), &mut txn)
        .expect("insert");
    maintainer
        .update_index(Some(&user(1, "a@x")), Some(&user(1, "b@x")), &mut txn)
        .expect("update");
    txn.commit().expect("commit");

    let keys = stored_keys(&store, maintainer.subspace());
    assert_eq!(keys.len(), 1);
    assert_eq!(
        maintainer.subspace().unpack(&keys[0]).expect("decode"),
        tuple!["b@x", 1i64]
    );
}

#[test]
fn sparse_index_skips_null_values() {
    let maintainer = scalar(IndexDescriptor::new("by_email", ["email"], "scalar").sparse());
    let record = RecordData::new("user")
        .with("id", 1i64)
        .with("email", FieldValue::Null);

    let keys = maintainer
        .compute_index_keys(&record, &tuple![1i64])
        .expect("compute");

    assert!(keys.is_empty());
}

#[test]
fn dense_index_keeps_null_values() {
    let maintainer = scalar(IndexDescriptor::new("by_email", ["email"], "scalar"));
    let record = RecordData::new("user")
        .with("id", 1i64)
        .with("email", FieldValue::Null);

    let keys = maintainer
        .compute_index_keys(&record, &tuple![1i64])
        .expect("compute");

    assert_eq!(keys.len(), 1);
}

#[test]
fn missing_field_fails_before_any_write() {
    let maintainer = scalar(IndexDescriptor::new("by_email", ["email"], "scalar"));
    let store = MemoryStore::new();
    let mut txn = store.begin().expect("begin");

    let err = maintainer
        .update_index(None, Some(&RecordData::new("user").with("id", 1i64)), &mut txn)
        .expect_err("email is missing");
    txn.commit().expect("commit");

    assert_eq!(err.class, ErrorClass::Evaluation);
    assert!(stored_keys(&store, maintainer.subspace()).is_empty());
}

// ---- uniqueness -------------------------------------------------------

#[test]
fn unique_index_rejects_second_id_for_same_value() {
    let maintainer = scalar(IndexDescriptor::new("by_email", ["email"], "scalar").unique());
    let store = MemoryStore::new();
    let mut txn = store.begin().expect("begin");

    maintainer
        .update_index(None, Some(&user(1, "a@x")), &mut txn)
        .expect("first insert");

    let sink = Rc::new(RecordingSink::default());
    let err = with_metrics_sink(sink.clone(), || {
        maintainer.update_index(None, Some(&user(2, "a@x")), &mut txn)
    })
    .expect_err("duplicate email");

    assert_eq!(err.class, ErrorClass::Constraint);
    assert!(!err.is_conflict());
    match err.detail {
        Some(ErrorDetail::Maintainer(MaintainerError::UniqueViolation {
            values,
            existing_id,
            ..
        })) => {
            assert_eq!(values, tuple!["a@x"]);
            assert_eq!(existing_id, tuple![1i64]);
        }
        other => panic!("unexpected detail: {other:?}"),
    }
    assert_eq!(
        sink.events.borrow().as_slice(),
        [format!("{:?}", MetricsEvent::UniqueViolation { index: "by_email" })]
    );
}

#[test]
fn unique_index_allows_resaving_same_record() {
    let maintainer = scalar(IndexDescriptor::new("by_email", ["email"], "scalar").unique());
    let store = MemoryStore::new();
    let mut txn = store.begin().expect("begin");

    maintainer
        .update_index(None, Some(&user(1, "a@x")), &mut txn)
        .expect("insert");
    maintainer
        .update_index(Some(&user(1, "a@x")), Some(&user(1, "a@x")), &mut txn)
        .expect("resave");
}

#[test]
fn unique_index_frees_value_on_delete() {
    let maintainer = scalar(IndexDescriptor::new("by_email", ["email"], "scalar").unique());
    let store = MemoryStore::new();
    let mut txn = store.begin().expect("begin");

    maintainer
        .update_index(None, Some(&user(1, "a@x")), &mut txn)
        .expect("insert");
    maintainer
        .update_index(Some(&user(1, "a@x")), None, &mut txn)
        .expect("delete");
    maintainer
        .update_index(None, Some(&user(2, "a@x")), &mut txn)
        .expect("value is free again");
}

// ---- aggregation layout -----------------------------------------------

#[test]
fn count_moves_between_groups() {
    let maintainer = aggregate(
        IndexDescriptor::new("count_by_shop", ["shop"], "count"),
        AggregateFunction::Count,
    );
    let store = MemoryStore::new();
    let a = maintainer.subspace().pack(&tuple!["A"]);
    let b = maintainer.subspace().pack(&tuple!["B"]);

    let mut txn = store.begin().expect("begin");
    for id in 0..3 {
        maintainer
            .update_index(None, Some(&sale(id, "A", 1i64)), &mut txn)
            .expect("insert");
    }
    maintainer
        .update_index(Some(&sale(0, "A", 1i64)), Some(&sale(0, "B", 1i64)), &mut txn)
        .expect("move");
    txn.commit().expect("commit");

    assert_eq!(counter(&store, &a), Some(2));
    assert_eq!(counter(&store, &b), Some(1));
}

#[test]
fn sum_update_in_same_group_nets_to_one_add() {
    let maintainer = aggregate(
        IndexDescriptor::new("sum_by_shop", ["shop", "amount"], "sum"),
        AggregateFunction::Sum,
    );
    let store = MemoryStore::new();
    let mut txn = store.begin().expect("begin");

    let plan = maintainer
        .plan_update(Some(&sale(1, "A", 10i64)), Some(&sale(1, "A", 15i64)), &mut txn)
        .expect("plan");

    assert_eq!(
        plan.ops(),
        [IndexOp::Add {
            key: maintainer.subspace().pack(&tuple!["A"]),
            delta: 5,
        }]
    );
}

#[test]
fn zero_sum_insert_still_materializes_its_group() {
    let maintainer = aggregate(
        IndexDescriptor::new("sum_by_shop", ["shop", "amount"], "sum"),
        AggregateFunction::Sum,
    );
    let store = MemoryStore::new();
    let key = maintainer.subspace().pack(&tuple!["Z"]);
    let mut txn = store.begin().expect("begin");

    let insert = maintainer
        .plan_update(None, Some(&sale(1, "Z", 0i64)), &mut txn)
        .expect("plan");
    assert_eq!(
        insert.ops(),
        [IndexOp::Add {
            key: key.clone(),
            delta: 0,
        }]
    );

    let unchanged = maintainer
        .plan_update(Some(&sale(1, "Z", 0i64)), Some(&sale(1, "Z", 0i64)), &mut txn)
        .expect("plan");
    assert!(unchanged.is_empty());

    maintainer
        .update_index(None, Some(&sale(1, "Z", 0i64)), &mut txn)
        .expect("insert");
    txn.commit().expect("commit");

    assert_eq!(counter(&store, &key), Some(0));
    assert_eq!(stored_keys(&store, maintainer.subspace()), [key]);
}

#[test]
fn sum_accepts_integral_doubles_and_skips_null() {
    let maintainer = aggregate(
        IndexDescriptor::new("sum_by_shop", ["shop", "amount"], "sum"),
        AggregateFunction::Sum,
    );

    let entries = maintainer
        .compute_index_entries(&sale(1, "A", 4.0), &tuple![1i64])
        .expect("integral double");
    assert_eq!(entries[0].value, IndexEntryValue::Counter(4));

    let entries = maintainer
        .compute_index_entries(&sale(1, "A", FieldValue::Null), &tuple![1i64])
        .expect("null amount");
    assert!(entries.is_empty());
}

#[test]
fn sum_rejects_fractional_and_non_numeric_values() {
    let maintainer = aggregate(
        IndexDescriptor::new("sum_by_shop", ["shop", "amount"], "sum"),
        AggregateFunction::Sum,
    );

    let err = maintainer
        .compute_index_entries(&sale(1, "A", 1.5), &tuple![1i64])
        .expect_err("fractional");
    assert!(matches!(
        err.detail,
        Some(ErrorDetail::Evaluation(EvaluationError::NonIntegralSum { .. }))
    ));

    let err = maintainer
        .compute_index_entries(&sale(1, "A", "ten"), &tuple![1i64])
        .expect_err("string");
    assert!(matches!(
        err.detail,
        Some(ErrorDetail::Evaluation(EvaluationError::NonNumericSum { .. }))
    ));
}

#[test]
fn double_sum_writes_fail_on_fractional_values_without_touching_the_counter() {
    let maintainer = aggregate(
        IndexDescriptor::new("sum_by_shop", ["shop", "amount"], "sum"),
        AggregateFunction::Sum,
    );
    let store = MemoryStore::new();
    let key = maintainer.subspace().pack(&tuple!["A"]);

    let mut txn = store.begin().expect("begin");
    maintainer
        .update_index(None, Some(&sale(1, "A", 4.0)), &mut txn)
        .expect("integral double");
    let err = maintainer
        .update_index(None, Some(&sale(2, "A", 2.5)), &mut txn)
        .expect_err("fractional double");
    txn.commit().expect("commit");

    assert_eq!(err.class, ErrorClass::Evaluation);
    assert_eq!(counter(&store, &key), Some(4));
}

#[test]
fn apply_reports_index_and_atomic_deltas() {
    let flat = scalar(IndexDescriptor::new("by_email", ["email"], "scalar"));
    let count = aggregate(
        IndexDescriptor::new("count_by_shop", ["shop"], "count"),
        AggregateFunction::Count,
    );
    let store = MemoryStore::new();
    let mut txn = store.begin().expect("begin");
    let sink = Rc::new(RecordingSink::default());

    with_metrics_sink(sink.clone(), || {
        flat.update_index(Some(&user(1, "a@x")), Some(&user(1, "b@x")), &mut txn)
            .expect("flat");
        count
            .update_index(None, Some(&sale(1, "A", 1i64)), &mut txn)
            .expect("count");
    });

    assert_eq!(
        sink.events.borrow().as_slice(),
        [
            format!(
                "{:?}",
                MetricsEvent::IndexDelta {
                    index: "by_email",
                    inserts: 1,
                    removes: 1,
                }
            ),
            format!(
                "{:?}",
                MetricsEvent::AtomicDelta {
                    index: "count_by_shop",
                    adds: 1,
                }
            ),
        ]
    );
}

#[test]
fn scan_item_matches_insert() {
    let maintainer = aggregate(
        IndexDescriptor::new("sum_by_shop", ["shop", "amount"], "sum"),
        AggregateFunction::Sum,
    );
    let store = MemoryStore::new();
    let key = maintainer.subspace().pack(&tuple!["A"]);

    let mut txn = store.begin().expect("begin");
    let id: Tuple = tuple![1i64];
    maintainer
        .scan_item(&sale(1, "A", 7i64), &id, &mut txn)
        .expect("scan item");
    txn.commit().expect("commit");

    assert_eq!(counter(&store, &key), Some(7));
}
