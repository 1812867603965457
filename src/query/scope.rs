use std::sync::Arc;

use super::{Predicate, Relation};
use crate::core::{Record, Result, Value};
use crate::registry::EntityType;
use crate::storage::Backend;

/// Which tombstone filter a [`Query`] applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scoping {
    /// Hide tombstoned rows. What every query starts with.
    Default,
    /// Default scope bypassed; no tombstone filter at all.
    IncludeTombstoned,
    /// Default scope bypassed; tombstoned rows only.
    OnlyTombstoned,
}

/// Query over one entity type that carries its default scope with it.
///
/// For a tombstone-enabled type the relation produced by
/// [`Query::to_relation`] always ends in `deleted_at IS NULL` unless the
/// query was built through one of the bypass constructors. Types without a
/// tombstone ignore the scoping entirely.
#[derive(Debug, Clone)]
pub struct Query {
    entity_type: Arc<EntityType>,
    scoping: Scoping,
    filters: Vec<Predicate>,
}

impl Query {
    pub fn default_scoped(entity_type: Arc<EntityType>) -> Self {
        Self::with_scoping(entity_type, Scoping::Default)
    }

    pub fn with_tombstoned(entity_type: Arc<EntityType>) -> Self {
        Self::with_scoping(entity_type, Scoping::IncludeTombstoned)
    }

    /// Tombstoned rows only. Fails for a type without a tombstone column,
    /// where no row can ever be tombstoned.
    pub fn only_tombstoned(entity_type: Arc<EntityType>) -> Result<Self> {
        entity_type.require_tombstone_column()?;
        Ok(Self::with_scoping(entity_type, Scoping::OnlyTombstoned))
    }

    fn with_scoping(entity_type: Arc<EntityType>, scoping: Scoping) -> Self {
        Self {
            entity_type,
            scoping,
            filters: Vec::new(),
        }
    }

    /// Drop the default scope, keeping any filters added so far.
    pub fn unscoped(mut self) -> Self {
        self.scoping = Scoping::IncludeTombstoned;
        self
    }

    pub fn filter(mut self, predicate: Predicate) -> Self {
        self.filters.push(predicate);
        self
    }

    pub fn where_eq(self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.filter(Predicate::eq(column, value))
    }

    pub fn scoping(&self) -> Scoping {
        self.scoping
    }

    pub fn entity_type(&self) -> &Arc<EntityType> {
        &self.entity_type
    }

    pub fn to_relation(&self) -> Relation {
        let relation = self
            .filters
            .iter()
            .cloned()
            .fold(Relation::unscoped(self.entity_type.name()), Relation::and);

        match (self.entity_type.tombstone_column(), self.scoping) {
            (Some(column), Scoping::Default) => relation.and(Predicate::is_null(column)),
            (Some(column), Scoping::OnlyTombstoned) => {
                relation.and(Predicate::is_not_null(column))
            }
            _ => relation,
        }
    }

    pub async fn exists(&self, backend: &dyn Backend) -> Result<bool> {
        backend.exists(&self.to_relation()).await
    }

    pub async fn count(&self, backend: &dyn Backend) -> Result<usize> {
        backend.count(&self.to_relation()).await
    }

    pub async fn load(&self, backend: &dyn Backend) -> Result<Vec<Record>> {
        let rows = backend.select(&self.to_relation()).await?;
        Ok(rows
            .into_iter()
            .map(|(id, row)| Record::from_row(Arc::clone(&self.entity_type), id, row))
            .collect())
    }

    pub async fn first(&self, backend: &dyn Backend) -> Result<Option<Record>> {
        Ok(self.load(backend).await?.into_iter().next())
    }
}
