use crate::expr::{ExpressionError, KeyExpression};
use serde::{Deserialize, Serialize};
use std::fmt::{self, Display};

///
/// IndexDescriptor
///
/// Declared index: name, field paths, kind identifier and options.
/// Created once at entity registration and immutable afterwards.
///

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct IndexDescriptor {
    pub name: String,
    pub key_paths: Vec<String>,
    pub kind: String,

    #[serde(default)]
    pub unique: bool,

    #[serde(default)]
    pub sparse: bool,
}

impl IndexDescriptor {
    #[must_use]
    pub fn new<S: Into<String>>(
        name: impl Into<String>,
        key_paths: impl IntoIterator<Item = S>,
        kind: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            key_paths: key_paths.into_iter().map(Into::into).collect(),
            kind: kind.into(),
            unique: false,
            sparse: false,
        }
    }

    #[must_use]
    pub const fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    #[must_use]
    pub const fn sparse(mut self) -> Self {
        self.sparse = true;
        self
    }
}

impl Display for IndexDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let paths = self.key_paths.join(", ");

        if self.unique {
            write!(f, "UNIQUE {} {}({})", self.kind, self.name, paths)
        } else {
            write!(f, "{} {}({})", self.kind, self.name, paths)
        }
    }
}

///
/// Index
/// Runtime index: the descriptor's options plus its resolved root expression.
///

#[derive(Clone, Debug, PartialEq)]
pub struct Index {
    pub name: String,
    pub root_expression: KeyExpression,
    pub subspace_key: String,
    pub kind: String,
    pub unique: bool,
    pub sparse: bool,
}

impl Index {
    /// Build the runtime index; the root expression comes from the key paths.
    pub fn from_descriptor(descriptor: &IndexDescriptor) -> Result<Self, ExpressionError> {
        let root = KeyExpression::from_paths(&descriptor.key_paths)?;

        Ok(Self::with_expression(descriptor, root))
    }

    /// Build the runtime index around an explicit root expression.
    #[must_use]
    pub fn with_expression(descriptor: &IndexDescriptor, root_expression: KeyExpression) -> Self {
        Self {
            name: descriptor.name.clone(),
            root_expression,
            subspace_key: descriptor.name.clone(),
            kind: descriptor.kind.clone(),
            unique: descriptor.unique,
            sparse: descriptor.sparse,
        }
    }
}

impl Display for Index {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} on {}", self.kind, self.name, self.root_expression)
    }
}

///
/// TESTS
///
