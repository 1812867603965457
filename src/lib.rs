// ============================================================================
// Tombstone: soft deletes and scope-aware uniqueness
// ============================================================================

pub mod coder;
pub mod config;
pub mod core;
pub mod lifecycle;
pub mod query;
pub mod registry;
pub mod storage;
pub mod store;
pub mod validation;

pub use coder::{AttributeCoder, JsonCoder};
pub use config::StoreConfig;
pub use crate::core::{
    Clock, FixedClock, Record, RecordState, Result, Row, StoreError, SystemClock, Value,
};
pub use lifecycle::LifecycleManager;
pub use query::{Predicate, Query, Relation, Scoping};
pub use registry::{EntityType, EntityTypeBuilder, TombstoneCapability, TypeRegistry};
pub use storage::{Backend, InMemoryBackend, TableSchema};
pub use store::Store;
pub use validation::{
    ErrorContext, ErrorKind, NullEquality, UniquenessRule, UniquenessValidator, ValidationError,
    ValidationErrors, Validator,
};
