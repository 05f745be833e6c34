use crate::{
    config::ConfigError,
    db::{
        index::{kind::KindValidationError, maintainer::MaintainerError},
        key::TupleDecodeError,
        store::StoreError,
    },
    expr::{EvaluationError, ExpressionError},
    schema::SchemaError,
    value::FieldValueError,
};
use std::fmt;
use thiserror::Error as ThisError;

///
/// InternalError
///
/// Structured runtime error with a stable classification.
/// Every layer-local error converts into this type at the crate boundary.
///

#[derive(Debug, ThisError)]
#[error("{message}")]
pub struct InternalError {
    pub class: ErrorClass,
    pub origin: ErrorOrigin,
    pub message: String,

    /// Optional structured error detail.
    /// The variant (if present) must correspond to `origin`.
    pub detail: Option<ErrorDetail>,
}

impl InternalError {
    /// Construct an InternalError without structured detail.
    pub fn new(class: ErrorClass, origin: ErrorOrigin, message: impl Into<String>) -> Self {
        Self {
            class,
            origin,
            message: message.into(),
            detail: None,
        }
    }

    /// Attach structured detail to an existing error.
    #[must_use]
    pub fn with_detail(mut self, detail: ErrorDetail) -> Self {
        self.detail = Some(detail);
        self
    }

    /// Construct a maintainer-origin invariant failure.
    pub(crate) fn maintainer_internal(message: impl Into<String>) -> Self {
        Self::new(ErrorClass::Internal, ErrorOrigin::Maintainer, message)
    }

    /// Construct a maintainer-origin unsupported-operation error.
    pub(crate) fn maintainer_unsupported(message: impl Into<String>) -> Self {
        Self::new(ErrorClass::Unsupported, ErrorOrigin::Maintainer, message)
    }

    /// True when the store reported an optimistic-concurrency conflict and the
    /// caller should re-run the enclosing transaction.
    #[must_use]
    pub const fn is_conflict(&self) -> bool {
        matches!(self.class, ErrorClass::Conflict)
    }

    /// True for registration-time configuration failures.
    #[must_use]
    pub const fn is_configuration(&self) -> bool {
        matches!(self.class, ErrorClass::Configuration)
    }

    #[must_use]
    pub fn display_with_class(&self) -> String {
        format!("{}:{}: {}", self.origin, self.class, self.message)
    }
}

///
/// ErrorDetail
///
/// Structured, origin-specific error detail carried by [`InternalError`].
///

#[derive(Debug, ThisError)]
pub enum ErrorDetail {
    #[error("{0}")]
    Evaluation(EvaluationError),

    #[error("{0}")]
    Kind(KindValidationError),

    #[error("{0}")]
    Maintainer(MaintainerError),

    #[error("{0}")]
    Schema(SchemaError),

    #[error("{0}")]
    Store(StoreError),
}

impl From<EvaluationError> for InternalError {
    fn from(err: EvaluationError) -> Self {
        Self::new(ErrorClass::Evaluation, ErrorOrigin::Expression, err.to_string())
            .with_detail(ErrorDetail::Evaluation(err))
    }
}

impl From<ExpressionError> for InternalError {
    fn from(err: ExpressionError) -> Self {
        Self::new(
            ErrorClass::Configuration,
            ErrorOrigin::Expression,
            err.to_string(),
        )
    }
}

impl From<KindValidationError> for InternalError {
    fn from(err: KindValidationError) -> Self {
        Self::new(ErrorClass::Configuration, ErrorOrigin::Kind, err.to_string())
            .with_detail(ErrorDetail::Kind(err))
    }
}

impl From<FieldValueError> for InternalError {
    fn from(err: FieldValueError) -> Self {
        Self::new(ErrorClass::Evaluation, ErrorOrigin::Value, err.to_string())
    }
}

impl From<MaintainerError> for InternalError {
    fn from(err: MaintainerError) -> Self {
        let class = match err {
            MaintainerError::UniqueViolation { .. } => ErrorClass::Constraint,
            MaintainerError::CorruptEntry { .. } => ErrorClass::Corruption,
        };

        Self::new(class, ErrorOrigin::Maintainer, err.to_string())
            .with_detail(ErrorDetail::Maintainer(err))
    }
}

impl From<SchemaError> for InternalError {
    fn from(err: SchemaError) -> Self {
        Self::new(
            ErrorClass::Configuration,
            ErrorOrigin::Schema,
            err.to_string(),
        )
        .with_detail(ErrorDetail::Schema(err))
    }
}

impl From<StoreError> for InternalError {
    fn from(err: StoreError) -> Self {
        let class = match err {
            StoreError::Conflict | StoreError::TransactionTooOld => ErrorClass::Conflict,
            StoreError::Backend(_) => ErrorClass::Internal,
        };

        Self::new(class, ErrorOrigin::Store, err.to_string()).with_detail(ErrorDetail::Store(err))
    }
}

impl From<TupleDecodeError> for InternalError {
    fn from(err: TupleDecodeError) -> Self {
        Self::new(
            ErrorClass::Corruption,
            ErrorOrigin::Codec,
            format!("index key is not decodable: {err}"),
        )
    }
}

impl From<ConfigError> for InternalError {
    fn from(err: ConfigError) -> Self {
        Self::new(
            ErrorClass::Configuration,
            ErrorOrigin::Config,
            err.to_string(),
        )
    }
}

///
/// ErrorClass
/// Error taxonomy for runtime classification.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ErrorClass {
    /// Registration-time rejection; never retryable.
    Configuration,
    /// A key expression could not be resolved against a record.
    Evaluation,
    /// The store refused to commit; the caller re-runs the transaction.
    Conflict,
    /// A unique index already holds the evaluated values for another id.
    Constraint,
    Corruption,
    Unsupported,
    Internal,
}

impl fmt::Display for ErrorClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Configuration => "configuration",
            Self::Evaluation => "evaluation",
            Self::Conflict => "conflict",
            Self::Constraint => "constraint",
            Self::Corruption => "corruption",
            Self::Unsupported => "unsupported",
            Self::Internal => "internal",
        };
        write!(f, "{label}")
    }
}

///
/// ErrorOrigin
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ErrorOrigin {
    Value,
    Codec,
    Expression,
    Kind,
    Maintainer,
    Schema,
    Store,
    Config,
}

impl fmt::Display for ErrorOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Value => "value",
            Self::Codec => "codec",
            Self::Expression => "expression",
            Self::Kind => "kind",
            Self::Maintainer => "maintainer",
            Self::Schema => "schema",
            Self::Store => "store",
            Self::Config => "config",
        };
        write!(f, "{label}")
    }
}

///
/// TESTS
///
