use async_trait::async_trait;

use super::table::TableSchema;
use crate::core::{Result, Row, Value};
use crate::query::Relation;

/// Storage collaborator the lifecycle and validation layers run against.
///
/// Implementations decide how relations are executed. Errors are returned
/// as-is to the caller; nothing above this trait retries or wraps them.
#[async_trait]
pub trait Backend: Send + Sync {
    /// Create a table for the given schema
    async fn create_table(&self, schema: TableSchema) -> Result<()>;

    /// Insert a row and return the id assigned to it
    async fn insert(&self, table: &str, row: Row) -> Result<i64>;

    /// Overwrite the given columns of an existing row, leaving the rest as stored
    async fn update(&self, table: &str, id: i64, changes: Row) -> Result<()>;

    /// Write a single column, skipping validation of the rest of the row
    async fn update_column(&self, table: &str, id: i64, column: &str, value: Value) -> Result<()>;

    /// Physically remove a row. Returns false when it was already gone
    async fn delete(&self, table: &str, id: i64) -> Result<bool>;

    /// Rows matching the relation, as `(id, columns)`
    async fn select(&self, relation: &Relation) -> Result<Vec<(i64, Row)>>;

    /// Number of rows matching the relation
    async fn count(&self, relation: &Relation) -> Result<usize>;

    /// Whether at least one row matches, without materializing rows
    async fn exists(&self, relation: &Relation) -> Result<bool>;
}
