//! Runtime data model definitions.
//!
//! Types here describe what an application registers (entities, fields,
//! index descriptors) and how the engine reads a record. They carry no
//! storage behavior of their own.

mod entity;
mod field;
mod index;
mod record;

pub use entity::{EntityKind, EntityModel};
pub use field::{FieldModel, FieldType, Numeric, Orderable, find_field};
pub use index::{Index, IndexDescriptor};
pub use record::{RangeValue, Record, RecordData, RecordField};
