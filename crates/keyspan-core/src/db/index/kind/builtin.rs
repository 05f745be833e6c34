use crate::{
    db::{
        index::{
            kind::{
                IndexKind, KindValidationError, SubspaceStructure, require_min_fields,
                require_numeric, require_orderable,
            },
            maintainer::{
                AggregateFunction, AggregateIndexMaintainer, IndexMaintainer,
                ValueIndexMaintainer,
            },
        },
        key::Subspace,
    },
    expr::KeyExpression,
    model::{FieldType, Index},
};
use std::sync::Arc;

///
/// BuiltinKind
///
/// Closed set of index kinds shipped with the engine.
///
/// | kind    | layout      | min fields | rule                                 |
/// |---------|-------------|------------|--------------------------------------|
/// | scalar  | flat        | 1          | every field orderable                |
/// | count   | aggregation | 1          | every (grouping) field orderable     |
/// | sum     | aggregation | 2          | grouping orderable, last numeric     |
/// | min/max | flat        | 2          | every field orderable, last is value |
///
/// A `sum` over a double field registers, but the counter is an i64: every
/// written value must be integral and inside the i64 range, otherwise the
/// write fails with `NonIntegralSum`.
///

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum BuiltinKind {
    Scalar,
    Count,
    Sum,
    Min,
    Max,
}

impl BuiltinKind {
    pub const ALL: [Self; 5] = [Self::Scalar, Self::Count, Self::Sum, Self::Min, Self::Max];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Scalar => "scalar",
            Self::Count => "count",
            Self::Sum => "sum",
            Self::Min => "min",
            Self::Max => "max",
        }
    }

    #[must_use]
    pub fn from_identifier(identifier: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.as_str() == identifier)
    }

    const fn min_fields(self) -> usize {
        match self {
            Self::Scalar | Self::Count => 1,
            Self::Sum | Self::Min | Self::Max => 2,
        }
    }
}

impl IndexKind for BuiltinKind {
    fn identifier(&self) -> &str {
        self.as_str()
    }

    fn subspace_structure(&self) -> SubspaceStructure {
        match self {
            Self::Scalar | Self::Min | Self::Max => SubspaceStructure::Flat,
            Self::Count | Self::Sum => SubspaceStructure::Aggregation,
        }
    }

    fn validate_types(&self, field_types: &[FieldType]) -> Result<(), KindValidationError> {
        let kind = self.as_str();
        require_min_fields(kind, field_types, self.min_fields())?;

        match self {
            Self::Scalar | Self::Count | Self::Min | Self::Max => {
                require_orderable(kind, field_types, 0)
            }
            Self::Sum => {
                let (value, grouping) = field_types
                    .split_last()
                    .ok_or_else(|| KindValidationError::TooFewFields {
                        kind: kind.to_string(),
                        expected: 2,
                        actual: 0,
                    })?;

                require_orderable(kind, grouping, 0)?;
                require_numeric(kind, value, grouping.len())
            }
        }
    }

    fn supports_unique(&self) -> bool {
        matches!(self, Self::Scalar)
    }

    fn create_maintainer(
        &self,
        index: Arc<Index>,
        subspace: Subspace,
        id_expression: KeyExpression,
    ) -> Box<dyn IndexMaintainer> {
        match self {
            Self::Scalar | Self::Min | Self::Max => {
                Box::new(ValueIndexMaintainer::new(index, subspace, id_expression))
            }
            Self::Count => Box::new(AggregateIndexMaintainer::new(
                index,
                subspace,
                id_expression,
                AggregateFunction::Count,
            )),
            Self::Sum => Box::new(AggregateIndexMaintainer::new(
                index,
                subspace,
                id_expression,
                AggregateFunction::Sum,
            )),
        }
    }
}
