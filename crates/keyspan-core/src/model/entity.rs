use crate::{
    expr::KeyExpression,
    model::{FieldModel, IndexDescriptor},
};

///
/// EntityModel
/// Runtime model for one entity: fields, primary key and declared indexes.
///

#[derive(Clone, Debug, PartialEq)]
pub struct EntityModel {
    /// Stable external name used in routing and diagnostics.
    pub name: String,
    /// Ordered field list (authoritative for registration-time validation).
    pub fields: Vec<FieldModel>,
    /// Expression producing the record's identifying tuple.
    pub primary_key: KeyExpression,
    /// Index definitions declared by the entity itself.
    pub indexes: Vec<IndexDescriptor>,
}

impl EntityModel {
    /// Start an entity whose primary key is the named field.
    #[must_use]
    pub fn new(name: impl Into<String>, primary_key: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: Vec::new(),
            primary_key: KeyExpression::field(primary_key),
            indexes: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_primary_key(mut self, primary_key: KeyExpression) -> Self {
        self.primary_key = primary_key;
        self
    }

    #[must_use]
    pub fn field(mut self, field: FieldModel) -> Self {
        self.fields.push(field);
        self
    }

    #[must_use]
    pub fn index(mut self, descriptor: IndexDescriptor) -> Self {
        self.indexes.push(descriptor);
        self
    }
}

///
/// EntityKind
///
/// Static registration hook for a Rust record type. The model is built once
/// at startup and handed to the schema.
///

pub trait EntityKind {
    const ENTITY_NAME: &'static str;

    fn model() -> EntityModel;
}
