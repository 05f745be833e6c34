use crate::{
    model::{EntityKind, EntityModel, FieldModel, IndexDescriptor},
    schema::{ManualIndexDescriptor, Schema, SchemaError, SchemaVersion},
};

struct Product;

impl EntityKind for Product {
    const ENTITY_NAME: &'static str = "product";

    fn model() -> EntityModel {
        EntityModel::new("product", "id")
            .field(FieldModel::numeric::<i64>("id"))
            .field(FieldModel::orderable::<String>("sku"))
            .field(FieldModel::orderable::<String>("shop"))
            .field(FieldModel::numeric::<f64>("price"))
            .index(IndexDescriptor::new("by_sku", ["sku"], "scalar").unique())
            .index(IndexDescriptor::new("max_price", ["shop", "price"], "max"))
    }
}

fn customer() -> EntityModel {
    EntityModel::new("customer", "id")
        .field(FieldModel::numeric::<i64>("id"))
        .field(FieldModel::orderable::<String>("email"))
        .index(IndexDescriptor::new("by_email", ["email"], "scalar"))
}

fn v1() -> SchemaVersion {
    SchemaVersion::new(1, 0, 0)
}

#[test]
fn lookups_agree_with_declaration_lists() {
    let schema = Schema::new(
        vec![Product::model(), customer()],
        v1(),
        vec![ManualIndexDescriptor::new(
            "customer",
            IndexDescriptor::new("count_all", Vec::<String>::new(), "count"),
        )],
    );

    assert_eq!(schema.index_descriptors().len(), 4);
    for index in schema.index_descriptors() {
        assert_eq!(
            schema.index_descriptor(&index.descriptor.name),
            Some(&index.descriptor)
        );
        assert_eq!(
            schema
                .entity_of_index(&index.descriptor.name)
                .map(|entity| entity.name.as_str()),
            Some(index.entity.as_str())
        );
    }

    let names: Vec<&str> = schema
        .index_descriptors_for("customer")
        .into_iter()
        .map(|descriptor| descriptor.name.as_str())
        .collect();
    assert_eq!(names, ["by_email", "count_all"]);

    assert_eq!(
        schema.entity_for::<Product>().map(|entity| entity.fields.len()),
        Some(4)
    );
    assert!(schema.entity("order").is_none());
    assert!(schema.index_descriptors_for("order").is_empty());
}

#[test]
fn duplicate_index_name_is_rejected_with_both_owners() {
    let clash = customer().index(IndexDescriptor::new("by_sku", ["email"], "scalar"));

    let err = Schema::try_new(vec![Product::model(), clash], v1(), Vec::new())
        .expect_err("by_sku is declared twice");

    assert_eq!(
        err,
        SchemaError::DuplicateIndexName {
            name: "by_sku".to_string(),
            first: "product".to_string(),
            second: "customer".to_string(),
        }
    );
}

#[test]
fn manual_descriptor_cannot_shadow_declared_one() {
    let err = Schema::try_new(
        vec![customer()],
        v1(),
        vec![ManualIndexDescriptor::new(
            "customer",
            IndexDescriptor::new("by_email", ["id"], "scalar"),
        )],
    )
    .expect_err("by_email already exists");

    assert!(matches!(err, SchemaError::DuplicateIndexName { .. }));
}

#[test]
#[should_panic(expected = "invalid schema")]
fn fatal_constructor_panics_on_duplicate_index() {
    let clash = customer().index(IndexDescriptor::new("by_email", ["id"], "scalar"));

    let _ = Schema::new(vec![clash], v1(), Vec::new());
}

#[test]
fn declaration_errors_are_reported() {
    let err = Schema::try_new(vec![customer(), customer()], v1(), Vec::new())
        .expect_err("duplicate entity");
    assert!(matches!(err, SchemaError::DuplicateEntityName { .. }));

    let err = Schema::try_new(
        vec![customer()],
        v1(),
        vec![ManualIndexDescriptor::new(
            "invoice",
            IndexDescriptor::new("by_total", ["total"], "scalar"),
        )],
    )
    .expect_err("unknown entity");
    assert_eq!(
        err,
        SchemaError::UnknownEntity {
            name: "invoice".to_string()
        }
    );

    let twice = customer().field(FieldModel::orderable::<String>("email"));
    let err = Schema::try_new(vec![twice], v1(), Vec::new()).expect_err("duplicate field");
    assert!(matches!(err, SchemaError::DuplicateFieldName { .. }));

    let no_key = EntityModel::new("customer", "uuid").field(FieldModel::numeric::<i64>("id"));
    let err = Schema::try_new(vec![no_key], v1(), Vec::new()).expect_err("undeclared key");
    assert!(matches!(err, SchemaError::InvalidPrimaryKey { .. }));
}

#[test]
fn fingerprint_tracks_declarations() {
    let base = Schema::new(vec![customer()], v1(), Vec::new());
    let same = Schema::new(vec![customer()], v1(), Vec::new());
    let sparse = Schema::new(
        vec![
            EntityModel::new("customer", "id")
                .field(FieldModel::numeric::<i64>("id"))
                .field(FieldModel::orderable::<String>("email"))
                .index(IndexDescriptor::new("by_email", ["email"], "scalar").sparse()),
        ],
        v1(),
        Vec::new(),
    );
    let bumped = Schema::new(vec![customer()], SchemaVersion::new(1, 0, 1), Vec::new());

    assert_eq!(base.fingerprint(), same.fingerprint());
    assert_ne!(base.fingerprint(), sparse.fingerprint());
    assert_ne!(base.fingerprint(), bumped.fingerprint());
}

#[test]
fn versions_order_lexicographically_and_parse() {
    assert!(SchemaVersion::new(1, 10, 0) > SchemaVersion::new(1, 9, 99));
    assert!(SchemaVersion::new(2, 0, 0) > SchemaVersion::new(1, 99, 99));

    let parsed: SchemaVersion = "3.1.4".parse().expect("valid version");
    assert_eq!(parsed, SchemaVersion::new(3, 1, 4));
    assert_eq!(parsed.to_string(), "3.1.4");

    for bad in ["3.1", "3.1.4.1", "a.b.c", ""] {
        assert!(bad.parse::<SchemaVersion>().is_err(), "{bad} should fail");
    }
}
