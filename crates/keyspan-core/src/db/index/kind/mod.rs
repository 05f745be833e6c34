//! Module: db::index::kind
//! Responsibility: index-kind metadata, registration-time type validation,
//! and maintainer construction.
//! Does not own: runtime key layouts (see `maintainer`).

mod builtin;
mod registry;

#[cfg(test)]
mod tests;

pub use builtin::BuiltinKind;
pub use registry::IndexKindRegistry;

use crate::{
    db::{index::maintainer::IndexMaintainer, key::Subspace},
    expr::KeyExpression,
    model::{FieldType, Index},
};
use std::{
    fmt::{self, Display},
    sync::Arc,
};
use thiserror::Error as ThisError;

///
/// KindValidationError
///
/// Registration-time rejection of an index declaration. Carries the kind,
/// the violated constraint and the offending value.
///

#[derive(Clone, Debug, Eq, PartialEq, ThisError)]
pub enum KindValidationError {
    #[error("index kind '{kind}' requires at least {expected} fields, got {actual}")]
    TooFewFields {
        kind: String,
        expected: usize,
        actual: usize,
    },

    #[error("index kind '{kind}' requires an orderable field at position {position}, got {actual}")]
    NotOrderable {
        kind: String,
        position: usize,
        actual: FieldType,
    },

    #[error("index kind '{kind}' requires a numeric field at position {position}, got {actual}")]
    NotNumeric {
        kind: String,
        position: usize,
        actual: FieldType,
    },

    #[error("index kind '{kind}' does not support unique indexes")]
    UniqueNotSupported { kind: String },

    #[error("unknown index kind '{identifier}'")]
    UnknownKind { identifier: String },

    #[error("index kind '{identifier}' is already registered")]
    DuplicateKind { identifier: String },
}

///
/// SubspaceStructure
/// Physical layout family an index kind writes.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum SubspaceStructure {
    /// One key per (grouping..., value, id) tuple; empty values.
    Flat,
    /// One key per grouping tuple holding an atomically updated i64.
    Aggregation,
    /// Reserved for composite structures; no built-in kind uses it.
    Hierarchical,
}

impl Display for SubspaceStructure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Flat => "flat",
            Self::Aggregation => "aggregation",
            Self::Hierarchical => "hierarchical",
        };
        write!(f, "{label}")
    }
}

///
/// IndexKind
///
/// Pure validation rule plus a fixed layout. Kinds hold no runtime state;
/// the maintainers they create are stateless too.
///

pub trait IndexKind: Send + Sync {
    fn identifier(&self) -> &str;

    fn subspace_structure(&self) -> SubspaceStructure;

    /// Check the declared types of the values the root expression produces.
    fn validate_types(&self, field_types: &[FieldType]) -> Result<(), KindValidationError>;

    fn supports_unique(&self) -> bool {
        false
    }

    fn create_maintainer(
        &self,
        index: Arc<Index>,
        subspace: Subspace,
        id_expression: KeyExpression,
    ) -> Box<dyn IndexMaintainer>;

    /// Full registration check: structural options, then field types.
    fn validate(&self, index: &Index, field_types: &[FieldType]) -> Result<(), KindValidationError> {
        if index.unique && !self.supports_unique() {
            return Err(KindValidationError::UniqueNotSupported {
                kind: self.identifier().to_string(),
            });
        }

        self.validate_types(field_types)
    }
}

///
/// VALIDATION HELPERS
///

/// Reject fewer than `min` fields.
pub fn require_min_fields(
    kind: &str,
    field_types: &[FieldType],
    min: usize,
) -> Result<(), KindValidationError> {
    if field_types.len() < min {
        return Err(KindValidationError::TooFewFields {
            kind: kind.to_string(),
            expected: min,
            actual: field_types.len(),
        });
    }

    Ok(())
}

/// Reject any non-orderable field among `field_types`, reporting positions
/// offset by `start`.
pub fn require_orderable(
    kind: &str,
    field_types: &[FieldType],
    start: usize,
) -> Result<(), KindValidationError> {
    match field_types.iter().position(|ty| !ty.is_orderable()) {
        Some(offset) => Err(KindValidationError::NotOrderable {
            kind: kind.to_string(),
            position: start + offset,
            actual: field_types[offset].clone(),
        }),
        None => Ok(()),
    }
}

/// Reject a non-numeric field at `position`.
pub fn require_numeric(
    kind: &str,
    ty: &FieldType,
    position: usize,
) -> Result<(), KindValidationError> {
    if ty.is_numeric() {
        Ok(())
    } else {
        Err(KindValidationError::NotNumeric {
            kind: kind.to_string(),
            position,
            actual: ty.clone(),
        })
    }
}
