use crate::{
    db::{
        index::{
            kind::{
                BuiltinKind, IndexKind, IndexKindRegistry, KindValidationError, SubspaceStructure,
            },
            maintainer::{IndexMaintainer, ValueIndexMaintainer},
        },
        key::Subspace,
    },
    expr::KeyExpression,
    model::{FieldType, Index, IndexDescriptor},
};
use std::sync::Arc;

fn optional(ty: FieldType) -> FieldType {
    FieldType::Optional(Box::new(ty))
}

#[test]
fn scalar_requires_one_orderable_field() {
    let kind = BuiltinKind::Scalar;

    assert!(kind.validate_types(&[FieldType::String]).is_ok());
    assert!(kind.validate_types(&[optional(FieldType::Int64)]).is_ok());
    assert_eq!(
        kind.validate_types(&[]),
        Err(KindValidationError::TooFewFields {
            kind: "scalar".to_string(),
            expected: 1,
            actual: 0,
        })
    );
}

#[test]
fn non_orderable_position_is_reported() {
    let range = FieldType::Range(Box::new(FieldType::Int64));

    assert_eq!(
        BuiltinKind::Count.validate_types(&[FieldType::String, range.clone()]),
        Err(KindValidationError::NotOrderable {
            kind: "count".to_string(),
            position: 1,
            actual: range,
        })
    );
}

#[test]
fn sum_requires_numeric_last_field() {
    let kind = BuiltinKind::Sum;

    assert!(
        kind.validate_types(&[FieldType::String, FieldType::Int64])
            .is_ok()
    );
    assert!(
        kind.validate_types(&[FieldType::String, optional(FieldType::Double)])
            .is_ok()
    );
    assert_eq!(
        kind.validate_types(&[FieldType::String, FieldType::String]),
        Err(KindValidationError::NotNumeric {
            kind: "sum".to_string(),
            position: 1,
            actual: FieldType::String,
        })
    );
}

#[test]
fn min_and_max_need_grouping_and_value() {
    for kind in [BuiltinKind::Min, BuiltinKind::Max] {
        assert!(matches!(
            kind.validate_types(&[FieldType::Int64]),
            Err(KindValidationError::TooFewFields { expected: 2, .. })
        ));
        assert!(
            kind.validate_types(&[FieldType::String, FieldType::Double])
                .is_ok()
        );
    }
}

#[test]
fn only_scalar_supports_unique() {
    let unique = Index::from_descriptor(&IndexDescriptor::new("u", ["a"], "count").unique())
        .expect("valid paths");

    for kind in BuiltinKind::ALL {
        let result = kind.validate(&unique, &[FieldType::String, FieldType::Int64]);
        if kind == BuiltinKind::Scalar {
            assert!(result.is_ok());
        } else {
            assert!(matches!(
                result,
                Err(KindValidationError::UniqueNotSupported { .. })
            ));
        }
    }
}

#[test]
fn builtin_layouts() {
    assert_eq!(
        BuiltinKind::Scalar.subspace_structure(),
        SubspaceStructure::Flat
    );
    assert_eq!(BuiltinKind::Max.subspace_structure(), SubspaceStructure::Flat);
    assert_eq!(
        BuiltinKind::Sum.subspace_structure(),
        SubspaceStructure::Aggregation
    );
    assert_eq!(SubspaceStructure::Aggregation.to_string(), "aggregation");
}

// ---- registry ---------------------------------------------------------

/// Scalar layout under another name; only accepts string fields.
struct TagKind;

impl IndexKind for TagKind {
    fn identifier(&self) -> &str {
        "tag"
    }

    fn subspace_structure(&self) -> SubspaceStructure {
        SubspaceStructure::Flat
    }

    fn validate_types(&self, field_types: &[FieldType]) -> Result<(), KindValidationError> {
        match field_types.iter().position(|ty| *ty != FieldType::String) {
            Some(position) => Err(KindValidationError::NotOrderable {
                kind: "tag".to_string(),
                position,
                actual: field_types[position].clone(),
            }),
            None => Ok(()),
        }
    }

    fn create_maintainer(
        &self,
        index: Arc<Index>,
        subspace: Subspace,
        id_expression: KeyExpression,
    ) -> Box<dyn IndexMaintainer> {
        Box::new(ValueIndexMaintainer::new(index, subspace, id_expression))
    }
}

#[test]
fn registry_resolves_builtins_and_custom_kinds() {
    let mut registry = IndexKindRegistry::new();
    registry.register(Arc::new(TagKind)).expect("new identifier");

    assert_eq!(
        registry.resolve("sum").expect("builtin").identifier(),
        "sum"
    );
    assert!(
        registry
            .resolve("tag")
            .expect("custom")
            .validate_types(&[FieldType::Int64])
            .is_err()
    );
    assert_eq!(
        registry.identifiers(),
        vec!["scalar", "count", "sum", "min", "max", "tag"]
    );
}

#[test]
fn registry_rejects_duplicates_and_unknown_identifiers() {
    let mut registry = IndexKindRegistry::new();
    registry.register(Arc::new(TagKind)).expect("first registration");

    assert_eq!(
        registry.register(Arc::new(TagKind)),
        Err(KindValidationError::DuplicateKind {
            identifier: "tag".to_string(),
        })
    );
    assert_eq!(
        registry.resolve("rank").map(|kind| kind.identifier().to_string()),
        Err(KindValidationError::UnknownKind {
            identifier: "rank".to_string(),
        })
    );
}

#[test]
fn builtin_identifier_cannot_be_shadowed() {
    struct Shadow;

    impl IndexKind for Shadow {
        fn identifier(&self) -> &str {
            "count"
        }

        fn subspace_structure(&self) -> SubspaceStructure {
            SubspaceStructure::Flat
        }

        fn validate_types(&self, _: &[FieldType]) -> Result<(), KindValidationError> {
            Ok(())
        }

        fn create_maintainer(
            &self,
            index: Arc<Index>,
            subspace: Subspace,
            id_expression: KeyExpression,
        ) -> Box<dyn IndexMaintainer> {
            Box::new(ValueIndexMaintainer::new(index, subspace, id_expression))
        }
    }

    let mut registry = IndexKindRegistry::new();

    assert!(matches!(
        registry.register(Arc::new(Shadow)),
        Err(KindValidationError::DuplicateKind { .. })
    ));
}
