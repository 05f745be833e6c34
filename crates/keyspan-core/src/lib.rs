//! Core engine for keyspan: secondary-index maintenance over an ordered,
//! transactional key-value store.
//!
//! Records change through a caller-owned [`db::store::Transaction`]; the
//! [`db::IndexCatalog`] fans each change out to the maintainers of every
//! index the [`schema::Schema`] declares for that entity.

// public exports are one module level down
pub mod config;
pub mod db;
pub mod error;
pub mod expr;
pub mod model;
pub mod obs;
pub mod schema;
pub mod value;

// test
#[cfg(test)]
pub(crate) mod test_support;

///
/// Prelude
///
/// Prelude contains only domain vocabulary.
/// No errors, stores, maintainers, or helpers are re-exported here.
///

pub mod prelude {
    pub use crate::{
        db::key::Tuple,
        expr::KeyExpression,
        model::{
            EntityKind, EntityModel, FieldModel, FieldType, IndexDescriptor, RangeValue, Record,
            RecordData, RecordField,
        },
        value::FieldValue,
    };
}
