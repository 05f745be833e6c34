#![allow(dead_code)]

use keyspan_core::{
    db::{
        IndexCatalog,
        index::{IndexKindRegistry, IndexMaintainer},
        key::{Subspace, Tuple},
        store::{MemoryStore, Transaction},
    },
    error::InternalError,
    model::{EntityKind, EntityModel, FieldModel, IndexDescriptor, Record, RecordData},
    schema::{Schema, SchemaVersion},
    tuple,
    value::FieldValue,
};

pub const RETRIES: u32 = 5;

///
/// Item
/// Grouped, valued record carrying one index of every built-in kind.
///

pub struct Item;

impl EntityKind for Item {
    const ENTITY_NAME: &'static str = "item";

    fn model() -> EntityModel {
        EntityModel::new("item", "id")
            .field(FieldModel::numeric::<i64>("id"))
            .field(FieldModel::orderable::<String>("group"))
            .field(FieldModel::numeric::<i64>("value"))
            .field(FieldModel::optional::<String>("note"))
            .index(IndexDescriptor::new("min_value", ["group", "value"], "min"))
            .index(IndexDescriptor::new("max_value", ["group", "value"], "max"))
            .index(IndexDescriptor::new("count_by_group", ["group"], "count"))
            .index(IndexDescriptor::new("sum_by_group", ["group", "value"], "sum"))
            .index(IndexDescriptor::new("by_note", ["note"], "scalar").sparse())
    }
}

pub fn item(id: i64, group: &str, value: i64) -> RecordData {
    RecordData::new("item")
        .with("id", id)
        .with("group", group)
        .with("value", value)
        .with("note", FieldValue::Null)
}

pub fn root() -> Subspace {
    Subspace::from_tuple(&tuple!["keyspan"])
}

pub fn catalog() -> IndexCatalog {
    let schema = Schema::new(vec![Item::model()], SchemaVersion::new(1, 0, 0), Vec::new());

    IndexCatalog::build(&schema, &IndexKindRegistry::new(), &root()).expect("valid catalog")
}

pub fn maintainer<'a>(catalog: &'a IndexCatalog, name: &str) -> &'a dyn IndexMaintainer {
    catalog.maintainer(name).expect("index is registered")
}

pub fn insert(store: &MemoryStore, catalog: &IndexCatalog, record: &RecordData) {
    write(store, catalog, None, Some(record)).expect("insert");
}

pub fn delete(store: &MemoryStore, catalog: &IndexCatalog, record: &RecordData) {
    write(store, catalog, Some(record), None).expect("delete");
}

pub fn update(store: &MemoryStore, catalog: &IndexCatalog, old: &RecordData, new: &RecordData) {
    write(store, catalog, Some(old), Some(new)).expect("update");
}

pub fn write(
    store: &MemoryStore,
    catalog: &IndexCatalog,
    old: Option<&RecordData>,
    new: Option<&RecordData>,
) -> Result<(), InternalError> {
    store.transact(RETRIES, |txn| {
        catalog.update_record(
            "item",
            old.map(|record| record as &dyn Record),
            new.map(|record| record as &dyn Record),
            txn,
        )
    })
}

/// Every key stored in the subspace of `name`, ascending.
pub fn index_keys(store: &MemoryStore, catalog: &IndexCatalog, name: &str) -> Vec<Vec<u8>> {
    let subspace = maintainer(catalog, name).subspace().clone();
    let mut txn = store.begin().expect("begin");

    txn.scan(&subspace.range(), None, false)
        .expect("scan")
        .into_iter()
        .map(|row| row.key)
        .collect()
}

pub fn id(value: i64) -> Tuple {
    tuple![value]
}
