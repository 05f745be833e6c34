use crate::value::FieldValue;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

///
/// Record
///
/// Read access to one stored record. Key expressions resolve fields through
/// this accessor instead of reflection.
///

pub trait Record {
    /// Name of the entity this record belongs to.
    fn entity_name(&self) -> &str;

    /// Look up one field; `None` when the record has no such field.
    fn field(&self, name: &str) -> Option<RecordField<'_>>;
}

///
/// RecordField
/// Borrowed view of one field as seen by the expression evaluator.
///

pub enum RecordField<'a> {
    Value(FieldValue),
    Record(&'a dyn Record),
    Range(RangeValue),
    /// The field exists but its payload could not be decoded.
    Unreadable(String),
}

///
/// RangeValue
/// Stored range with inclusive-or-exclusive semantics owned by the caller.
///

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct RangeValue {
    pub lower: FieldValue,
    pub upper: FieldValue,
}

impl RangeValue {
    #[must_use]
    pub fn new(lower: impl Into<FieldValue>, upper: impl Into<FieldValue>) -> Self {
        Self {
            lower: lower.into(),
            upper: upper.into(),
        }
    }
}

///
/// RecordData
///
/// Owned, schema-less record. Useful for callers that keep records as
/// field maps and for tests.
///

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct RecordData {
    entity: String,
    fields: BTreeMap<String, DataField>,
}

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
enum DataField {
    Value(FieldValue),
    Record(RecordData),
    Range(RangeValue),
    Unreadable(String),
}

impl RecordData {
    #[must_use]
    pub fn new(entity: impl Into<String>) -> Self {
        Self {
            entity: entity.into(),
            fields: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn with(mut self, name: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.set(name, value);
        self
    }

    #[must_use]
    pub fn with_record(mut self, name: impl Into<String>, record: Self) -> Self {
        self.fields.insert(name.into(), DataField::Record(record));
        self
    }

    #[must_use]
    pub fn with_range(mut self, name: impl Into<String>, range: RangeValue) -> Self {
        self.fields.insert(name.into(), DataField::Range(range));
        self
    }

    /// Mark a field as present but undecodable.
    #[must_use]
    pub fn with_unreadable(mut self, name: impl Into<String>, reason: impl Into<String>) -> Self {
        self.fields
            .insert(name.into(), DataField::Unreadable(reason.into()));
        self
    }

    pub fn set(&mut self, name: impl Into<String>, value: impl Into<FieldValue>) {
        self.fields
            .insert(name.into(), DataField::Value(value.into()));
    }

    pub fn remove(&mut self, name: &str) {
        self.fields.remove(name);
    }

    /// Scalar value of a field, if it holds one.
    #[must_use]
    pub fn value(&self, name: &str) -> Option<&FieldValue> {
        match self.fields.get(name) {
            Some(DataField::Value(value)) => Some(value),
            _ => None,
        }
    }
}

impl Record for RecordData {
    fn entity_name(&self) -> &str {
        &self.entity
    }

    fn field(&self, name: &str) -> Option<RecordField<'_>> {
        let field = match self.fields.get(name)? {
            DataField::Value(value) => RecordField::Value(value.clone()),
            DataField::Record(record) => RecordField::Record(record),
            DataField::Range(range) => RecordField::Range(range.clone()),
            DataField::Unreadable(reason) => RecordField::Unreadable(reason.clone()),
        };

        Some(field)
    }
}
