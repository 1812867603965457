//! Soft-delete transitions.
//!
//! ```text
//! New --save--> Active --delete--> Tombstoned --restore--> Active
//! ```
//!
//! Deleting a tombstoned record and restoring an active one are no-ops.
//! Nothing here erases a row of a tombstone-enabled type.

use std::sync::Arc;

use tracing::debug;

use crate::core::{Clock, Record, Result, Value};
use crate::query::Query;
use crate::registry::EntityType;
use crate::storage::Backend;

pub struct LifecycleManager {
    backend: Arc<dyn Backend>,
    clock: Arc<dyn Clock>,
}

impl LifecycleManager {
    pub fn new(backend: Arc<dyn Backend>, clock: Arc<dyn Clock>) -> Self {
        Self { backend, clock }
    }

    /// Tombstone the record with a single column write.
    ///
    /// New and already tombstoned records are returned untouched. The check
    /// uses the in-memory state, so two callers holding stale copies both
    /// write and the later timestamp wins.
    ///
    /// For a type without a tombstone this is a plain row delete.
    pub async fn delete<'r>(&self, record: &'r mut Record) -> Result<&'r mut Record> {
        if record.is_deleted() || record.is_destroyed() {
            return Ok(record);
        }
        let Some(id) = record.id() else {
            return Ok(record);
        };

        let entity_type = Arc::clone(record.entity_type());
        match entity_type.tombstone_column() {
            Some(column) => {
                let now = self.clock.now();
                self.backend
                    .update_column(entity_type.name(), id, column, Value::Timestamp(now))
                    .await?;
                record.set_deleted_at(Some(now));
                debug!(entity_type = entity_type.name(), id, "record tombstoned");
            }
            None => {
                self.backend.delete(entity_type.name(), id).await?;
                record.mark_destroyed();
                debug!(entity_type = entity_type.name(), id, "record destroyed");
            }
        }

        Ok(record)
    }

    /// Run the type's destroy callbacks around [`LifecycleManager::delete`].
    ///
    /// A failing `before_destroy` callback stops everything before any write.
    pub async fn destroy_with_callbacks<'r>(&self, record: &'r mut Record) -> Result<&'r mut Record> {
        let entity_type = Arc::clone(record.entity_type());

        for callback in entity_type.before_destroy() {
            callback(&*record)?;
        }

        let record = self.delete(record).await?;

        for callback in entity_type.after_destroy() {
            callback(&*record)?;
        }

        Ok(record)
    }

    /// Clear the tombstone. Always writes, even when the record is active.
    pub async fn restore<'r>(&self, record: &'r mut Record) -> Result<&'r mut Record> {
        let entity_type = Arc::clone(record.entity_type());
        let column = entity_type.require_tombstone_column()?;

        let Some(id) = record.id() else {
            return Ok(record);
        };

        self.backend
            .update_column(entity_type.name(), id, column, Value::Null)
            .await?;
        record.set_deleted_at(None);
        debug!(entity_type = entity_type.name(), id, "record restored");

        Ok(record)
    }

    pub fn is_deleted(&self, record: &Record) -> bool {
        record.is_deleted()
    }

    /// Default-scoped query: tombstoned rows hidden.
    pub fn default_scope(&self, entity_type: Arc<EntityType>) -> Query {
        Query::default_scoped(entity_type)
    }

    /// Only tombstoned rows, default scope bypassed.
    pub fn only_tombstoned(&self, entity_type: Arc<EntityType>) -> Result<Query> {
        Query::only_tombstoned(entity_type)
    }

    pub fn deleted(&self, entity_type: Arc<EntityType>) -> Result<Query> {
        self.only_tombstoned(entity_type)
    }

    /// Every row, default scope bypassed.
    pub fn all_including_tombstoned(&self, entity_type: Arc<EntityType>) -> Query {
        Query::with_tombstoned(entity_type)
    }

    pub fn with_deleted(&self, entity_type: Arc<EntityType>) -> Query {
        self.all_including_tombstoned(entity_type)
    }
}
