//! Per-type configuration and the registry that hands it out.
//!
//! An [`EntityType`] is built once, at registration time, and never mutated
//! afterwards. Tombstone behaviour is opted into by attaching a
//! [`TombstoneCapability`] to the type; there is no other switch.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, RwLock};

use tracing::debug;

use crate::coder::AttributeCoder;
use crate::core::{Record, Result, StoreError};
use crate::validation::{NullEquality, UniquenessRule};

pub const DEFAULT_PRIMARY_KEY: &str = "id";
pub const DEFAULT_TOMBSTONE_COLUMN: &str = "deleted_at";

/// Hook run around `destroy_with_callbacks`. Returning an error halts the chain.
pub type DestroyCallback = Arc<dyn Fn(&Record) -> Result<()> + Send + Sync>;

/// Marks a type as soft-deletable and names the column holding the tombstone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TombstoneCapability {
    column: String,
}

impl TombstoneCapability {
    pub fn new(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
        }
    }

    pub fn column(&self) -> &str {
        &self.column
    }
}

impl Default for TombstoneCapability {
    fn default() -> Self {
        Self::new(DEFAULT_TOMBSTONE_COLUMN)
    }
}

pub struct EntityType {
    name: String,
    primary_key: String,
    attributes: Vec<String>,
    tombstone: Option<TombstoneCapability>,
    coders: HashMap<String, Arc<dyn AttributeCoder>>,
    uniqueness_rules: Vec<UniquenessRule>,
    before_destroy: Vec<DestroyCallback>,
    after_destroy: Vec<DestroyCallback>,
}

impl EntityType {
    pub fn builder(name: impl Into<String>) -> EntityTypeBuilder {
        EntityTypeBuilder::new(name)
    }

    /// Type name, also used as the table name.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn primary_key(&self) -> &str {
        &self.primary_key
    }

    pub fn attributes(&self) -> &[String] {
        &self.attributes
    }

    pub fn has_attribute(&self, name: &str) -> bool {
        self.attributes.iter().any(|attr| attr == name)
    }

    pub fn tombstone(&self) -> Option<&TombstoneCapability> {
        self.tombstone.as_ref()
    }

    pub fn is_tombstone_enabled(&self) -> bool {
        self.tombstone.is_some()
    }

    pub fn tombstone_column(&self) -> Option<&str> {
        self.tombstone.as_ref().map(TombstoneCapability::column)
    }

    /// Tombstone column, or `UnsupportedOperation` for a plain type.
    pub fn require_tombstone_column(&self) -> Result<&str> {
        self.tombstone_column().ok_or_else(|| {
            StoreError::UnsupportedOperation(format!(
                "entity type '{}' has no tombstone column",
                self.name
            ))
        })
    }

    /// Coder registered for a serialized attribute, if any.
    pub fn coder(&self, attribute: &str) -> Option<Arc<dyn AttributeCoder>> {
        self.coders.get(attribute).cloned()
    }

    pub fn uniqueness_rules(&self) -> &[UniquenessRule] {
        &self.uniqueness_rules
    }

    pub fn before_destroy(&self) -> &[DestroyCallback] {
        &self.before_destroy
    }

    pub fn after_destroy(&self) -> &[DestroyCallback] {
        &self.after_destroy
    }

    /// Every non-key column a row of this type carries.
    pub fn columns(&self) -> Vec<String> {
        let mut columns = self.attributes.clone();
        if let Some(column) = self.tombstone_column() {
            columns.push(column.to_string());
        }
        columns
    }
}

impl fmt::Debug for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntityType")
            .field("name", &self.name)
            .field("primary_key", &self.primary_key)
            .field("attributes", &self.attributes)
            .field("tombstone", &self.tombstone)
            .field("serialized", &self.coders.keys().collect::<Vec<_>>())
            .field("uniqueness_rules", &self.uniqueness_rules)
            .field("before_destroy", &self.before_destroy.len())
            .field("after_destroy", &self.after_destroy.len())
            .finish()
    }
}

pub struct EntityTypeBuilder {
    name: String,
    primary_key: String,
    attributes: Vec<String>,
    default_tombstone_column: String,
    default_null_equality: NullEquality,
    tombstone: Option<TombstoneCapability>,
    coders: HashMap<String, Arc<dyn AttributeCoder>>,
    uniqueness_rules: Vec<UniquenessRule>,
    before_destroy: Vec<DestroyCallback>,
    after_destroy: Vec<DestroyCallback>,
}

impl EntityTypeBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            primary_key: DEFAULT_PRIMARY_KEY.to_string(),
            attributes: Vec::new(),
            default_tombstone_column: DEFAULT_TOMBSTONE_COLUMN.to_string(),
            default_null_equality: NullEquality::default(),
            tombstone: None,
            coders: HashMap::new(),
            uniqueness_rules: Vec::new(),
            before_destroy: Vec::new(),
            after_destroy: Vec::new(),
        }
    }

    pub fn primary_key(mut self, column: impl Into<String>) -> Self {
        self.primary_key = column.into();
        self
    }

    /// Column used by [`EntityTypeBuilder::tombstoned`].
    pub fn default_tombstone_column(mut self, column: impl Into<String>) -> Self {
        self.default_tombstone_column = column.into();
        self
    }

    /// Null handling for uniqueness rules that don't set their own.
    pub fn default_null_equality(mut self, nulls: NullEquality) -> Self {
        self.default_null_equality = nulls;
        self
    }

    pub fn attribute(mut self, name: impl Into<String>) -> Self {
        self.attributes.push(name.into());
        self
    }

    pub fn attributes<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.attributes.extend(names.into_iter().map(Into::into));
        self
    }

    /// Enable soft deletes on the default tombstone column.
    pub fn tombstoned(self) -> Self {
        let capability = TombstoneCapability::new(self.default_tombstone_column.clone());
        self.tombstone(capability)
    }

    pub fn tombstone(mut self, capability: TombstoneCapability) -> Self {
        self.tombstone = Some(capability);
        self
    }

    pub fn serialize(mut self, attribute: impl Into<String>, coder: Arc<dyn AttributeCoder>) -> Self {
        self.coders.insert(attribute.into(), coder);
        self
    }

    pub fn validates_uniqueness_of(mut self, rule: UniquenessRule) -> Self {
        self.uniqueness_rules.push(rule);
        self
    }

    pub fn before_destroy<F>(mut self, callback: F) -> Self
    where
        F: Fn(&Record) -> Result<()> + Send + Sync + 'static,
    {
        self.before_destroy.push(Arc::new(callback));
        self
    }

    pub fn after_destroy<F>(mut self, callback: F) -> Self
    where
        F: Fn(&Record) -> Result<()> + Send + Sync + 'static,
    {
        self.after_destroy.push(Arc::new(callback));
        self
    }

    pub fn build(mut self) -> Result<EntityType> {
        let undeclared = |attr: &str| {
            StoreError::ColumnNotFound(attr.to_string(), self.name.clone())
        };

        if self.has_attribute(&self.primary_key) {
            return Err(StoreError::TypeMismatch(format!(
                "Primary key '{}' cannot also be declared as an attribute",
                self.primary_key
            )));
        }

        if let Some(column) = self.tombstone.as_ref().map(TombstoneCapability::column)
            && (self.has_attribute(column) || column == self.primary_key)
        {
            return Err(StoreError::TypeMismatch(format!(
                "Tombstone column '{}' clashes with a declared column of '{}'",
                column, self.name
            )));
        }

        for attribute in self.coders.keys() {
            if !self.has_attribute(attribute) {
                return Err(undeclared(attribute));
            }
        }

        for rule in &self.uniqueness_rules {
            if !self.has_attribute(rule.attribute()) {
                return Err(undeclared(rule.attribute()));
            }
            if let Some(scope) = rule.scope_attributes().iter().find(|s| !self.has_attribute(s)) {
                return Err(undeclared(scope));
            }
        }

        for rule in &mut self.uniqueness_rules {
            rule.default_nulls(self.default_null_equality);
        }

        Ok(EntityType {
            name: self.name,
            primary_key: self.primary_key,
            attributes: self.attributes,
            tombstone: self.tombstone,
            coders: self.coders,
            uniqueness_rules: self.uniqueness_rules,
            before_destroy: self.before_destroy,
            after_destroy: self.after_destroy,
        })
    }

    fn has_attribute(&self, name: &str) -> bool {
        self.attributes.iter().any(|attr| attr == name)
    }
}

/// Registered entity types keyed by name.
#[derive(Default)]
pub struct TypeRegistry {
    types: RwLock<HashMap<String, Arc<EntityType>>>,
}

impl TypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, entity_type: EntityType) -> Result<Arc<EntityType>> {
        let mut types = self.types.write()?;
        if types.contains_key(entity_type.name()) {
            return Err(StoreError::EntityTypeExists(entity_type.name().to_string()));
        }

        debug!(
            entity_type = entity_type.name(),
            tombstone = entity_type.is_tombstone_enabled(),
            rules = entity_type.uniqueness_rules().len(),
            "registered entity type"
        );

        let entity_type = Arc::new(entity_type);
        types.insert(entity_type.name().to_string(), Arc::clone(&entity_type));
        Ok(entity_type)
    }

    pub fn get(&self, name: &str) -> Result<Arc<EntityType>> {
        self.types
            .read()?
            .get(name)
            .cloned()
            .ok_or_else(|| StoreError::UnknownEntityType(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> Result<bool> {
        Ok(self.types.read()?.contains_key(name))
    }

    /// Drop a registration. Returns the removed type, if any.
    pub fn remove(&self, name: &str) -> Result<Option<Arc<EntityType>>> {
        let removed = self.types.write()?.remove(name);
        if removed.is_some() {
            debug!(entity_type = name, "unregistered entity type");
        }
        Ok(removed)
    }

    pub fn names(&self) -> Result<Vec<String>> {
        let mut names: Vec<String> = self.types.read()?.keys().cloned().collect();
        names.sort();
        Ok(names)
    }
}
