use crate::{
    db::{
        index::{IndexKindRegistry, IndexMaintainer, IndexUpdatePlan},
        key::Subspace,
        store::Transaction,
    },
    error::{ErrorClass, ErrorOrigin, InternalError},
    expr::resolve_field_types,
    model::{Index, Record},
    schema::Schema,
};
use std::{collections::HashMap, sync::Arc};
use tracing::info;

///
/// IndexCatalog
///
/// Validated maintainers for every index of a schema, grouped by entity.
/// Built once at startup; registration failures surface here, before any
/// data is written.
///

pub struct IndexCatalog {
    maintainers: Vec<Box<dyn IndexMaintainer>>,
    by_entity: HashMap<String, Vec<usize>>,
    by_name: HashMap<String, usize>,
}

impl IndexCatalog {
    /// Validate every descriptor of `schema` and create its maintainer under
    /// `root/<index name>`.
    pub fn build(
        schema: &Schema,
        registry: &IndexKindRegistry,
        root: &Subspace,
    ) -> Result<Self, InternalError> {
        let mut maintainers: Vec<Box<dyn IndexMaintainer>> = Vec::new();
        let mut by_entity: HashMap<String, Vec<usize>> = schema
            .entities()
            .iter()
            .map(|entity| (entity.name.clone(), Vec::new()))
            .collect();
        let mut by_name = HashMap::new();

        for declared in schema.index_descriptors() {
            let entity = schema.entity(&declared.entity).ok_or_else(|| {
                InternalError::new(
                    ErrorClass::Internal,
                    ErrorOrigin::Schema,
                    format!("index '{}' has no entity", declared.descriptor.name),
                )
            })?;

            let kind = registry.resolve(&declared.descriptor.kind)?;
            let index = Index::from_descriptor(&declared.descriptor)?;
            let field_types = resolve_field_types(&index.root_expression, &entity.fields)?;
            kind.validate(&index, &field_types)?;

            let subspace = root.child(index.subspace_key.as_str());
            info!(entity = %entity.name, index = %index, %subspace, "registered index");

            let maintainer =
                kind.create_maintainer(Arc::new(index), subspace, entity.primary_key.clone());

            let position = maintainers.len();
            by_entity
                .entry(entity.name.clone())
                .or_default()
                .push(position);
            by_name.insert(declared.descriptor.name.clone(), position);
            maintainers.push(maintainer);
        }

        info!(indexes = maintainers.len(), "index catalog built");

        Ok(Self {
            maintainers,
            by_entity,
            by_name,
        })
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.maintainers.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.maintainers.is_empty()
    }

    #[must_use]
    pub fn maintainer(&self, name: &str) -> Option<&dyn IndexMaintainer> {
        self.by_name
            .get(name)
            .map(|&position| self.maintainers[position].as_ref())
    }

    /// Maintainers of `entity`, in declaration order.
    pub fn maintainers_for(&self, entity: &str) -> impl Iterator<Item = &dyn IndexMaintainer> {
        self.by_entity
            .get(entity)
            .into_iter()
            .flatten()
            .map(|&position| self.maintainers[position].as_ref())
    }

    /// Apply one record change to every index of `entity`.
    ///
    /// Every maintainer plans before the first write, so a failure in any
    /// index leaves `txn` without index writes from this call.
    pub fn update_record(
        &self,
        entity: &str,
        old: Option<&dyn Record>,
        new: Option<&dyn Record>,
        txn: &mut dyn Transaction,
    ) -> Result<(), InternalError> {
        let positions = self.by_entity.get(entity).ok_or_else(|| {
            InternalError::new(
                ErrorClass::Configuration,
                ErrorOrigin::Schema,
                format!("entity '{entity}' is not registered"),
            )
        })?;

        let plans = positions
            .iter()
            .map(|&position| self.maintainers[position].plan_update(old, new, &mut *txn))
            .collect::<Result<Vec<IndexUpdatePlan>, _>>()?;

        for plan in &plans {
            plan.apply(txn);
        }

        Ok(())
    }
}
