//! Module: schema
//! Responsibility: the validated, read-only set of entities and index
//! descriptors a process runs with.
//! Does not own: index-kind validation (see `db::catalog`).

mod version;

#[cfg(test)]
mod tests;

pub use version::SchemaVersion;

use crate::{
    expr::resolve_field_types,
    model::{EntityKind, EntityModel, IndexDescriptor},
};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::{HashMap, HashSet};
use thiserror::Error as ThisError;

///
/// SchemaError
///
/// Programmer errors found while assembling a schema. None of them is
/// recoverable at runtime.
///

#[derive(Clone, Debug, Eq, PartialEq, ThisError)]
pub enum SchemaError {
    #[error("index name '{name}' is declared by both '{first}' and '{second}'")]
    DuplicateIndexName {
        name: String,
        first: String,
        second: String,
    },

    #[error("entity '{name}' is declared twice")]
    DuplicateEntityName { name: String },

    #[error("index descriptor targets unknown entity '{name}'")]
    UnknownEntity { name: String },

    #[error("entity '{entity}' declares field '{field}' twice")]
    DuplicateFieldName { entity: String, field: String },

    #[error("entity name is empty")]
    EmptyEntityName,

    #[error("entity '{entity}' has an invalid primary key: {reason}")]
    InvalidPrimaryKey { entity: String, reason: String },

    #[error("entity '{entity}' declares an index with an empty name")]
    EmptyIndexName { entity: String },

    #[error("'{value}' is not a major.minor.patch version")]
    InvalidVersion { value: String },
}

///
/// ManualIndexDescriptor
/// Descriptor supplied outside an entity declaration (for example from config).
///

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct ManualIndexDescriptor {
    pub entity: String,

    #[serde(flatten)]
    pub descriptor: IndexDescriptor,
}

impl ManualIndexDescriptor {
    #[must_use]
    pub fn new(entity: impl Into<String>, descriptor: IndexDescriptor) -> Self {
        Self {
            entity: entity.into(),
            descriptor,
        }
    }
}

///
/// SchemaIndex
/// One merged descriptor and the entity that owns it.
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SchemaIndex {
    pub entity: String,
    pub descriptor: IndexDescriptor,
}

///
/// Schema
///
/// Entities plus every index descriptor, entity-declared and manual, merged
/// into one list. The lookup maps are derived from the two lists once and
/// never change afterwards.
///

#[derive(Clone, Debug)]
pub struct Schema {
    version: SchemaVersion,
    entities: Vec<EntityModel>,
    indexes: Vec<SchemaIndex>,

    entity_by_name: HashMap<String, usize>,
    index_by_name: HashMap<String, usize>,
    indexes_by_entity: HashMap<String, Vec<usize>>,
}

impl Schema {
    /// Build a schema, panicking on any [`SchemaError`].
    ///
    /// # Panics
    ///
    /// Panics when the declarations are inconsistent, for example when two
    /// descriptors share an index name. These are programming errors that
    /// must be fixed before the process can run.
    #[must_use]
    pub fn new(
        entities: Vec<EntityModel>,
        version: SchemaVersion,
        extra: Vec<ManualIndexDescriptor>,
    ) -> Self {
        match Self::try_new(entities, version, extra) {
            Ok(schema) => schema,
            Err(err) => panic!("invalid schema: {err}"),
        }
    }

    pub fn try_new(
        entities: Vec<EntityModel>,
        version: SchemaVersion,
        extra: Vec<ManualIndexDescriptor>,
    ) -> Result<Self, SchemaError> {
        let mut entity_by_name = HashMap::with_capacity(entities.len());
        for (position, entity) in entities.iter().enumerate() {
            validate_entity(entity)?;

            if entity_by_name
                .insert(entity.name.clone(), position)
                .is_some()
            {
                return Err(SchemaError::DuplicateEntityName {
                    name: entity.name.clone(),
                });
            }
        }

        let declared = entities.iter().flat_map(|entity| {
            entity.indexes.iter().map(|descriptor| SchemaIndex {
                entity: entity.name.clone(),
                descriptor: descriptor.clone(),
            })
        });
        let manual = extra.into_iter().map(|manual| SchemaIndex {
            entity: manual.entity,
            descriptor: manual.descriptor,
        });

        let mut indexes: Vec<SchemaIndex> = Vec::new();
        let mut index_by_name: HashMap<String, usize> = HashMap::new();
        let mut indexes_by_entity: HashMap<String, Vec<usize>> = HashMap::new();

        for index in declared.chain(manual) {
            if !entity_by_name.contains_key(&index.entity) {
                return Err(SchemaError::UnknownEntity { name: index.entity });
            }
            if index.descriptor.name.is_empty() {
                return Err(SchemaError::EmptyIndexName {
                    entity: index.entity,
                });
            }
            if let Some(&first) = index_by_name.get(&index.descriptor.name) {
                return Err(SchemaError::DuplicateIndexName {
                    name: index.descriptor.name,
                    first: indexes[first].entity.clone(),
                    second: index.entity,
                });
            }

            let position = indexes.len();
            index_by_name.insert(index.descriptor.name.clone(), position);
            indexes_by_entity
                .entry(index.entity.clone())
                .or_default()
                .push(position);
            indexes.push(index);
        }

        Ok(Self {
            version,
            entities,
            indexes,
            entity_by_name,
            index_by_name,
            indexes_by_entity,
        })
    }

    #[must_use]
    pub const fn version(&self) -> SchemaVersion {
        self.version
    }

    #[must_use]
    pub fn entities(&self) -> &[EntityModel] {
        &self.entities
    }

    /// Every merged descriptor, entity-declared first, in declaration order.
    #[must_use]
    pub fn index_descriptors(&self) -> &[SchemaIndex] {
        &self.indexes
    }

    #[must_use]
    pub fn entity(&self, name: &str) -> Option<&EntityModel> {
        self.entity_by_name
            .get(name)
            .map(|&position| &self.entities[position])
    }

    #[must_use]
    pub fn entity_for<E: EntityKind>(&self) -> Option<&EntityModel> {
        self.entity(E::ENTITY_NAME)
    }

    #[must_use]
    pub fn index_descriptor(&self, name: &str) -> Option<&IndexDescriptor> {
        self.index_by_name
            .get(name)
            .map(|&position| &self.indexes[position].descriptor)
    }

    /// Entity that owns the named index.
    #[must_use]
    pub fn entity_of_index(&self, name: &str) -> Option<&EntityModel> {
        let position = *self.index_by_name.get(name)?;

        self.entity(&self.indexes[position].entity)
    }

    #[must_use]
    pub fn index_descriptors_for(&self, entity: &str) -> Vec<&IndexDescriptor> {
        self.indexes_by_entity
            .get(entity)
            .map(|positions| {
                positions
                    .iter()
                    .map(|&position| &self.indexes[position].descriptor)
                    .collect()
            })
            .unwrap_or_default()
    }

    /// SHA-256 over the version and every declaration, in order. Two
    /// processes agree on the fingerprint only if they index identically.
    #[must_use]
    pub fn fingerprint(&self) -> [u8; 32] {
        let mut hasher = Sha256::new();
        hasher.update(self.version.to_string().as_bytes());

        for entity in &self.entities {
            feed_str(&mut hasher, &entity.name);
            feed_str(&mut hasher, &entity.primary_key.to_string());
            for field in &entity.fields {
                feed_str(&mut hasher, &field.name);
                feed_str(&mut hasher, &field.ty.to_string());
            }
        }

        for index in &self.indexes {
            feed_str(&mut hasher, &index.entity);
            feed_str(&mut hasher, &index.descriptor.to_string());
            hasher.update([u8::from(index.descriptor.sparse)]);
        }

        hasher.finalize().into()
    }
}

// Length-prefixed so adjacent strings cannot run together.
fn feed_str(hasher: &mut Sha256, value: &str) {
    hasher.update((value.len() as u64).to_be_bytes());
    hasher.update(value.as_bytes());
}

fn validate_entity(entity: &EntityModel) -> Result<(), SchemaError> {
    if entity.name.is_empty() {
        return Err(SchemaError::EmptyEntityName);
    }

    let mut seen = HashSet::with_capacity(entity.fields.len());
    for field in &entity.fields {
        if !seen.insert(field.name.as_str()) {
            return Err(SchemaError::DuplicateFieldName {
                entity: entity.name.clone(),
                field: field.name.clone(),
            });
        }
    }

    let invalid = |reason: String| SchemaError::InvalidPrimaryKey {
        entity: entity.name.clone(),
        reason,
    };
    if entity.primary_key.arity() == 0 {
        return Err(invalid("primary key produces no values".to_string()));
    }
    resolve_field_types(&entity.primary_key, &entity.fields)
        .map_err(|err| invalid(err.to_string()))?;

    Ok(())
}
