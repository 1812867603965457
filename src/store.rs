use std::sync::Arc;

use tracing::debug;

use crate::config::StoreConfig;
use crate::core::{Clock, Record, Result, StoreError, SystemClock};
use crate::lifecycle::LifecycleManager;
use crate::query::{Predicate, Query};
use crate::registry::{EntityType, EntityTypeBuilder, TypeRegistry};
use crate::storage::{Backend, TableSchema};
use crate::validation::{UniquenessValidator, Validator, run_validators};

/// Entry point tying a backend, the type registry and the lifecycle together.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use tombstone::{InMemoryBackend, Store, UniquenessRule};
///
/// # #[tokio::main]
/// # async fn main() -> tombstone::Result<()> {
/// let store = Store::new(Arc::new(InMemoryBackend::new()));
/// let users = store
///     .define("users")
///     .attribute("email")
///     .tombstoned()
///     .validates_uniqueness_of(UniquenessRule::new("email"))
///     .build()?;
/// store.register(users).await?;
///
/// let mut user = store.new_record("users")?.with("email", "a@x.com");
/// assert!(store.save(&mut user).await?);
///
/// store.delete(&mut user).await?;
/// assert_eq!(store.all("users")?.count(store.backend().as_ref()).await?, 0);
/// # Ok(())
/// # }
/// ```
pub struct Store {
    backend: Arc<dyn Backend>,
    registry: Arc<TypeRegistry>,
    lifecycle: LifecycleManager,
    config: StoreConfig,
}

impl Store {
    pub fn new(backend: Arc<dyn Backend>) -> Self {
        let lifecycle = LifecycleManager::new(Arc::clone(&backend), Arc::new(SystemClock));
        Self {
            backend,
            registry: Arc::new(TypeRegistry::new()),
            lifecycle,
            config: StoreConfig::default(),
        }
    }

    pub fn with_config(mut self, config: StoreConfig) -> Result<Self> {
        config.validate().map_err(StoreError::Config)?;
        self.config = config;
        Ok(self)
    }

    /// Replace the clock used for tombstone timestamps
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.lifecycle = LifecycleManager::new(Arc::clone(&self.backend), clock);
        self
    }

    pub fn backend(&self) -> &Arc<dyn Backend> {
        &self.backend
    }

    pub fn registry(&self) -> &Arc<TypeRegistry> {
        &self.registry
    }

    pub fn lifecycle(&self) -> &LifecycleManager {
        &self.lifecycle
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Start a type definition using this store's defaults
    pub fn define(&self, name: &str) -> EntityTypeBuilder {
        self.config.entity_type(name)
    }

    /// Register a type and create its table.
    ///
    /// The name is claimed in the registry first, so a second registration of
    /// the same name fails with `EntityTypeExists`. If the table can't be
    /// created the claim is released again.
    pub async fn register(&self, entity_type: EntityType) -> Result<Arc<EntityType>> {
        let schema = TableSchema::for_entity_type(&entity_type);
        let entity_type = self.registry.register(entity_type)?;

        if let Err(err) = self.backend.create_table(schema).await {
            self.registry.remove(entity_type.name())?;
            return Err(err);
        }

        Ok(entity_type)
    }

    pub fn entity_type(&self, name: &str) -> Result<Arc<EntityType>> {
        self.registry.get(name)
    }

    pub fn new_record(&self, name: &str) -> Result<Record> {
        Ok(Record::new(self.entity_type(name)?))
    }

    pub fn validators_for(&self, entity_type: &EntityType) -> Vec<Box<dyn Validator>> {
        entity_type
            .uniqueness_rules()
            .iter()
            .map(|rule| {
                Box::new(UniquenessValidator::new(rule.clone(), Arc::clone(&self.backend)))
                    as Box<dyn Validator>
            })
            .collect()
    }

    /// Run every declared rule; failures land in `record.errors`
    pub async fn validate(&self, record: &mut Record) -> Result<bool> {
        let validators = self.validators_for(record.entity_type());
        run_validators(record, &validators).await
    }

    /// Validate, then insert a new record or write its attributes back.
    ///
    /// Updates never touch the tombstone column, so saving a stale copy can't
    /// undo a delete made elsewhere. Returns `Ok(false)` without writing when
    /// validation fails.
    pub async fn save(&self, record: &mut Record) -> Result<bool> {
        if record.is_destroyed() {
            return Err(StoreError::UnsupportedOperation(format!(
                "cannot save destroyed {} record",
                record.type_name()
            )));
        }

        if !self.validate(record).await? {
            debug!(
                entity_type = record.type_name(),
                errors = record.errors.len(),
                "save rejected by validation"
            );
            return Ok(false);
        }

        let entity_type = Arc::clone(record.entity_type());
        match record.id() {
            Some(id) => {
                self.backend
                    .update(entity_type.name(), id, record.to_changes())
                    .await?
            }
            None => {
                let id = self.backend.insert(entity_type.name(), record.to_row()).await?;
                record.mark_saved(id);
                debug!(entity_type = entity_type.name(), id, "record created");
            }
        }

        Ok(true)
    }

    /// [`Store::save`], but an invalid record is an error
    pub async fn save_strict(&self, record: &mut Record) -> Result<()> {
        if self.save(record).await? {
            Ok(())
        } else {
            Err(StoreError::RecordInvalid(record.errors.to_string()))
        }
    }

    /// Default-scoped query over a type
    pub fn all(&self, name: &str) -> Result<Query> {
        Ok(self.lifecycle.default_scope(self.entity_type(name)?))
    }

    /// Query bypassing the default scope
    pub fn with_tombstoned(&self, name: &str) -> Result<Query> {
        Ok(self.lifecycle.all_including_tombstoned(self.entity_type(name)?))
    }

    pub fn only_tombstoned(&self, name: &str) -> Result<Query> {
        self.lifecycle.only_tombstoned(self.entity_type(name)?)
    }

    /// Alias of [`Store::only_tombstoned`]
    pub fn deleted(&self, name: &str) -> Result<Query> {
        self.only_tombstoned(name)
    }

    /// Alias of [`Store::with_tombstoned`]
    pub fn with_deleted(&self, name: &str) -> Result<Query> {
        self.with_tombstoned(name)
    }

    /// Raw query over a type's table, no tombstone filter
    pub fn unscoped(&self, name: &str) -> Result<Query> {
        Ok(self.all(name)?.unscoped())
    }

    /// Look up a visible record by id
    pub async fn find(&self, name: &str, id: i64) -> Result<Option<Record>> {
        let entity_type = self.entity_type(name)?;
        let pk = entity_type.primary_key().to_string();
        Query::default_scoped(entity_type)
            .filter(Predicate::eq(pk, id))
            .first(self.backend.as_ref())
            .await
    }

    pub async fn delete<'r>(&self, record: &'r mut Record) -> Result<&'r mut Record> {
        self.lifecycle.delete(record).await
    }

    /// Destroy with callbacks; tombstones when the type supports it
    pub async fn destroy<'r>(&self, record: &'r mut Record) -> Result<&'r mut Record> {
        self.lifecycle.destroy_with_callbacks(record).await
    }

    pub async fn restore<'r>(&self, record: &'r mut Record) -> Result<&'r mut Record> {
        self.lifecycle.restore(record).await
    }
}
