//! Module: expr
//! Responsibility: key expressions and their evaluation against records.
//! Does not own: index layouts or the meaning of the extracted values.
//! Boundary: maintainers call `evaluate`; registration calls `resolve_field_types`.

mod evaluate;
mod resolve;


pub use evaluate::{evaluate, extract_id};
pub use resolve::resolve_field_types;

use crate::value::FieldValue;
use serde::{Deserialize, Serialize};
use std::fmt::{self, Display};
use thiserror::Error as ThisError;

///
/// EvaluationError
///
/// A key expression could not be resolved against a concrete record.
/// Raised at mutation time; the enclosing record update issues no writes.
///

#[derive(Clone, Debug, PartialEq, ThisError)]
pub enum EvaluationError {
    #[error("field '{field}' is missing from record")]
    MissingField { field: String },

    #[error("field '{field}' could not be read: {reason}")]
    Unreadable { field: String, reason: String },

    #[error("field '{field}' is not a nested record")]
    NotARecord { field: String },

    #[error("field '{field}' is not a scalar value")]
    NotAValue { field: String },

    #[error("field '{field}' is not a range")]
    NotARange { field: String },

    #[error("id expression produced no values")]
    EmptyIdentifier,

    #[error("sum value {value} is not an integer in i64 range")]
    NonIntegralSum { value: f64 },

    #[error("sum value {value} is not numeric")]
    NonNumericSum { value: FieldValue },

    #[error("sum delta overflowed i64")]
    SumOverflow,
}

///
/// ExpressionError
/// Static (registration-time) problems with an expression or path.
///

#[derive(Clone, Debug, Eq, PartialEq, ThisError)]
pub enum ExpressionError {
    #[error("field path '{path}' is empty or has an empty segment")]
    InvalidPath { path: String },

    #[error("field '{field}' is not declared")]
    UnknownField { field: String },

    #[error("field '{field}' is not a nested record")]
    NotARecord { field: String },

    #[error("field '{field}' is not a range")]
    NotARange { field: String },

    #[error("null literal has no field type")]
    UntypedLiteral,
}

///
/// RangeComponent
///

#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub enum RangeComponent {
    LowerBound,
    UpperBound,
}

///
/// KeyExpression
///
/// Tree that extracts an ordered sequence of values from a record.
/// Arity is static: every evaluation of one expression yields the same
/// number of values.
///

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub enum KeyExpression {
    Empty,
    Field(String),
    Literal(FieldValue),
    Concatenate(Vec<Self>),
    Nest {
        parent: String,
        child: Box<Self>,
    },
    Range {
        field: String,
        component: RangeComponent,
    },
}

impl KeyExpression {
    #[must_use]
    pub fn field(name: impl Into<String>) -> Self {
        Self::Field(name.into())
    }

    #[must_use]
    pub fn literal(value: impl Into<FieldValue>) -> Self {
        Self::Literal(value.into())
    }

    #[must_use]
    pub fn nest(parent: impl Into<String>, child: Self) -> Self {
        Self::Nest {
            parent: parent.into(),
            child: Box::new(child),
        }
    }

    #[must_use]
    pub fn range(field: impl Into<String>, component: RangeComponent) -> Self {
        Self::Range {
            field: field.into(),
            component,
        }
    }

    /// Concatenate children; a single child is returned unwrapped and no
    /// children yield `Empty`.
    #[must_use]
    pub fn concat(mut children: Vec<Self>) -> Self {
        match children.len() {
            0 => Self::Empty,
            1 => children.remove(0),
            _ => Self::Concatenate(children),
        }
    }

    /// Desugar `a.b.c` into `Nest(a, Nest(b, Field(c)))`.
    pub fn from_path(path: &str) -> Result<Self, ExpressionError> {
        let segments: Vec<&str> = path.split('.').collect();
        if segments.iter().any(|segment| segment.is_empty()) {
            return Err(ExpressionError::InvalidPath {
                path: path.to_string(),
            });
        }

        let mut segments = segments.into_iter().rev();
        let leaf = segments.next().ok_or_else(|| ExpressionError::InvalidPath {
            path: path.to_string(),
        })?;

        Ok(segments.fold(Self::field(leaf), |child, parent| {
            Self::nest(parent, child)
        }))
    }

    /// Desugar a list of paths into their concatenation.
    pub fn from_paths<S: AsRef<str>>(paths: &[S]) -> Result<Self, ExpressionError> {
        let children = paths
            .iter()
            .map(|path| Self::from_path(path.as_ref()))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self::concat(children))
    }

    /// Number of values every evaluation produces.
    #[must_use]
    pub fn arity(&self) -> usize {
        match self {
            Self::Empty => 0,
            Self::Field(_) | Self::Literal(_) | Self::Range { .. } => 1,
            Self::Concatenate(children) => children.iter().map(Self::arity).sum(),
            Self::Nest { child, .. } => child.arity(),
        }
    }
}

impl Display for KeyExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => write!(f, "()"),
            Self::Field(name) => write!(f, "{name}"),
            Self::Literal(value) => write!(f, "{value}"),
            Self::Concatenate(children) => {
                write!(f, "(")?;
                for (i, child) in children.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{child}")?;
                }
                write!(f, ")")
            }
            Self::Nest { parent, child } => write!(f, "{parent}.{child}"),
            Self::Range { field, component } => match component {
                RangeComponent::LowerBound => write!(f, "{field}.lower"),
                RangeComponent::UpperBound => write!(f, "{field}.upper"),
            },
        }
    }
}
