use crate::db::index::kind::{BuiltinKind, IndexKind, KindValidationError};
use std::{collections::BTreeMap, sync::Arc};

static BUILTIN_KINDS: [BuiltinKind; 5] = BuiltinKind::ALL;

///
/// IndexKindRegistry
///
/// Resolves kind identifiers. Built-ins are always present; custom kinds are
/// registered once at startup as trait objects.
///

#[derive(Clone, Default)]
pub struct IndexKindRegistry {
    custom: BTreeMap<String, Arc<dyn IndexKind>>,
}

impl IndexKindRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a custom kind; its identifier must be new.
    pub fn register(&mut self, kind: Arc<dyn IndexKind>) -> Result<(), KindValidationError> {
        let identifier = kind.identifier().to_string();
        if BuiltinKind::from_identifier(&identifier).is_some()
            || self.custom.contains_key(&identifier)
        {
            return Err(KindValidationError::DuplicateKind { identifier });
        }

        self.custom.insert(identifier, kind);

        Ok(())
    }

    pub fn resolve(&self, identifier: &str) -> Result<&dyn IndexKind, KindValidationError> {
        if let Some(kind) = BUILTIN_KINDS.iter().find(|kind| kind.as_str() == identifier) {
            return Ok(kind);
        }

        self.custom
            .get(identifier)
            .map(|kind| kind.as_ref())
            .ok_or_else(|| KindValidationError::UnknownKind {
                identifier: identifier.to_string(),
            })
    }

    /// Every resolvable identifier, built-ins first.
    #[must_use]
    pub fn identifiers(&self) -> Vec<&str> {
        BUILTIN_KINDS
            .iter()
            .map(|kind| kind.as_str())
            .chain(self.custom.keys().map(String::as_str))
            .collect()
    }
}
