use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};

use super::{Row, Value};
use crate::registry::EntityType;
use crate::validation::ValidationErrors;

/// Where a record sits in the soft-delete lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordState {
    /// Never saved, no id assigned.
    New,
    Active,
    Tombstoned,
    /// Physically removed. Only reachable for types without a tombstone.
    Destroyed,
}

/// In-memory image of one row of a registered entity type.
#[derive(Debug, Clone)]
pub struct Record {
    entity_type: Arc<EntityType>,
    id: Option<i64>,
    attributes: BTreeMap<String, Value>,
    deleted_at: Option<DateTime<Utc>>,
    destroyed: bool,
    pub errors: ValidationErrors,
}

impl Record {
    pub fn new(entity_type: Arc<EntityType>) -> Self {
        Self {
            entity_type,
            id: None,
            attributes: BTreeMap::new(),
            deleted_at: None,
            destroyed: false,
            errors: ValidationErrors::default(),
        }
    }

    /// Rebuild a record from a stored row. The tombstone column, when the type
    /// has one, is lifted out of the attributes.
    pub fn from_row(entity_type: Arc<EntityType>, id: i64, mut values: Row) -> Self {
        let deleted_at = entity_type
            .tombstone_column()
            .and_then(|column| values.remove(column))
            .and_then(|value| value.as_timestamp());

        Self {
            entity_type,
            id: Some(id),
            attributes: values,
            deleted_at,
            destroyed: false,
            errors: ValidationErrors::default(),
        }
    }

    pub fn entity_type(&self) -> &Arc<EntityType> {
        &self.entity_type
    }

    pub fn type_name(&self) -> &str {
        self.entity_type.name()
    }

    pub fn id(&self) -> Option<i64> {
        self.id
    }

    pub fn deleted_at(&self) -> Option<DateTime<Utc>> {
        self.deleted_at
    }

    /// Set an attribute value. Builder form of [`Record::set`].
    pub fn with(mut self, attribute: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set(attribute, value);
        self
    }

    pub fn set(&mut self, attribute: impl Into<String>, value: impl Into<Value>) {
        self.attributes.insert(attribute.into(), value.into());
    }

    /// Current value of an attribute; unset attributes read as NULL.
    pub fn get(&self, attribute: &str) -> Value {
        if attribute == self.entity_type.primary_key() {
            return self.id.into();
        }
        if let Some(column) = self.entity_type.tombstone_column()
            && attribute == column
        {
            return self.deleted_at.into();
        }
        self.attributes.get(attribute).cloned().unwrap_or(Value::Null)
    }

    pub fn attributes(&self) -> &BTreeMap<String, Value> {
        &self.attributes
    }

    pub fn is_tombstone_enabled(&self) -> bool {
        self.entity_type.is_tombstone_enabled()
    }

    pub fn is_new_record(&self) -> bool {
        self.id.is_none()
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }

    pub fn is_destroyed(&self) -> bool {
        self.destroyed
    }

    /// Whether the record exists for insert-vs-update purposes.
    ///
    /// A tombstoned record still counts as persisted; only a missing id
    /// makes it new.
    pub fn is_persisted(&self) -> bool {
        if self.is_tombstone_enabled() {
            !self.is_new_record()
        } else {
            !self.is_new_record() && !self.destroyed
        }
    }

    pub fn state(&self) -> RecordState {
        if self.destroyed {
            RecordState::Destroyed
        } else if self.is_new_record() {
            RecordState::New
        } else if self.is_deleted() {
            RecordState::Tombstoned
        } else {
            RecordState::Active
        }
    }

    /// Column values to write for this record, tombstone column included.
    pub fn to_row(&self) -> Row {
        let mut row = self.attributes.clone();
        if let Some(column) = self.entity_type.tombstone_column() {
            row.insert(column.to_string(), self.deleted_at.into());
        }
        row
    }

    /// Columns an update may write: the attributes only. The tombstone
    /// column moves through delete and restore, never through a save.
    pub fn to_changes(&self) -> Row {
        self.attributes.clone()
    }

    pub(crate) fn mark_saved(&mut self, id: i64) {
        self.id = Some(id);
    }

    pub(crate) fn set_deleted_at(&mut self, deleted_at: Option<DateTime<Utc>>) {
        self.deleted_at = deleted_at;
    }

    pub(crate) fn mark_destroyed(&mut self) {
        self.destroyed = true;
    }
}
