use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::trace;

use super::{Backend, Table, TableSchema};
use crate::core::{Result, Row, StoreError, Value};
use crate::query::Relation;

/// Reference [`Backend`] keeping every table in process memory.
///
/// Each table sits behind its own lock; the table map is only write-locked
/// while tables are created.
pub struct InMemoryBackend {
    tables: RwLock<HashMap<String, Arc<RwLock<Table>>>>,
}

impl InMemoryBackend {
    pub fn new() -> Self {
        Self {
            tables: RwLock::new(HashMap::new()),
        }
    }

    /// Handle on a table for concurrent access
    pub async fn get_table(&self, name: &str) -> Result<Arc<RwLock<Table>>> {
        self.tables
            .read()
            .await
            .get(name)
            .cloned()
            .ok_or_else(|| StoreError::TableNotFound(name.to_string()))
    }

    pub async fn table_exists(&self, name: &str) -> bool {
        self.tables.read().await.contains_key(name)
    }

    pub async fn list_tables(&self) -> Vec<String> {
        let mut names: Vec<String> = self.tables.read().await.keys().cloned().collect();
        names.sort();
        names
    }

    /// Raw row count, tombstoned rows included
    pub async fn row_count(&self, table_name: &str) -> Result<usize> {
        let handle = self.get_table(table_name).await?;
        let table = handle.read().await;
        Ok(table.row_count())
    }

    /// Raw stored row, bypassing every scope
    pub async fn raw_row(&self, table_name: &str, id: i64) -> Result<Option<Row>> {
        let handle = self.get_table(table_name).await?;
        let table = handle.read().await;
        Ok(table.get(id).cloned())
    }
}

impl Default for InMemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Backend for InMemoryBackend {
    async fn create_table(&self, schema: TableSchema) -> Result<()> {
        let mut tables = self.tables.write().await;
        let name = schema.name().to_string();

        if tables.contains_key(&name) {
            return Err(StoreError::TableExists(name));
        }

        tables.insert(name, Arc::new(RwLock::new(Table::new(schema))));
        Ok(())
    }

    async fn insert(&self, table_name: &str, row: Row) -> Result<i64> {
        let handle = self.get_table(table_name).await?;
        let mut table = handle.write().await;
        table.insert(row)
    }

    async fn update(&self, table_name: &str, id: i64, changes: Row) -> Result<()> {
        let handle = self.get_table(table_name).await?;
        let mut table = handle.write().await;
        table.update(id, changes)
    }

    async fn update_column(&self, table_name: &str, id: i64, column: &str, value: Value) -> Result<()> {
        let handle = self.get_table(table_name).await?;
        let mut table = handle.write().await;
        table.update_column(id, column, value)
    }

    async fn delete(&self, table_name: &str, id: i64) -> Result<bool> {
        let handle = self.get_table(table_name).await?;
        let mut table = handle.write().await;
        Ok(table.delete(id))
    }

    async fn select(&self, relation: &Relation) -> Result<Vec<(i64, Row)>> {
        let handle = self.get_table(relation.table()).await?;
        let table = handle.read().await;
        trace!(%relation, "select");

        table
            .scan(relation)
            .map(|entry| entry.map(|(id, row)| (id, row.clone())))
            .collect()
    }

    async fn count(&self, relation: &Relation) -> Result<usize> {
        let handle = self.get_table(relation.table()).await?;
        let table = handle.read().await;
        trace!(%relation, "count");

        let mut count = 0;
        for entry in table.scan(relation) {
            entry?;
            count += 1;
        }
        Ok(count)
    }

    async fn exists(&self, relation: &Relation) -> Result<bool> {
        let handle = self.get_table(relation.table()).await?;
        let table = handle.read().await;
        trace!(%relation, "exists");

        // Stops at the first match.
        match table.scan(relation).next() {
            Some(entry) => entry.map(|_| true),
            None => Ok(false),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::Predicate;

    fn schema() -> TableSchema {
        TableSchema::new("users", "id", vec!["email".into(), "deleted_at".into()])
    }

    fn row(email: &str) -> Row {
        let mut row = Row::new();
        row.insert("email".into(), Value::from(email));
        row
    }

    #[test]
    fn test_create_table_twice_fails() {
        tokio_test::block_on(async {
            let backend = InMemoryBackend::new();
            backend.create_table(schema()).await.unwrap();
            let result = backend.create_table(schema()).await;
            assert!(matches!(result, Err(StoreError::TableExists(_))));
            assert_eq!(backend.list_tables().await, vec!["users".to_string()]);
        });
    }

    #[test]
    fn test_missing_table() {
        tokio_test::block_on(async {
            let backend = InMemoryBackend::new();
            let result = backend.exists(&Relation::unscoped("ghosts")).await;
            assert!(matches!(result, Err(StoreError::TableNotFound(_))));
            assert!(!backend.table_exists("ghosts").await);
        });
    }

    #[tokio::test]
    async fn test_exists_count_select() {
        let backend = InMemoryBackend::new();
        backend.create_table(schema()).await.unwrap();
        let a = backend.insert("users", row("a")).await.unwrap();
        backend.insert("users", row("b")).await.unwrap();

        backend
            .update_column("users", a, "deleted_at", Value::from(chrono::Utc::now()))
            .await
            .unwrap();

        let live = Relation::unscoped("users").and(Predicate::is_null("deleted_at"));
        assert_eq!(backend.count(&live).await.unwrap(), 1);
        assert_eq!(backend.row_count("users").await.unwrap(), 2);

        let rel = live.clone().and(Predicate::eq("email", "a"));
        assert!(!backend.exists(&rel).await.unwrap());

        let rows = backend.select(&live).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].1.get("email"), Some(&Value::from("b")));
    }

    #[tokio::test]
    async fn test_delete_removes_row() {
        let backend = InMemoryBackend::new();
        backend.create_table(schema()).await.unwrap();
        let id = backend.insert("users", row("a")).await.unwrap();

        assert!(backend.delete("users", id).await.unwrap());
        assert!(!backend.delete("users", id).await.unwrap());
        assert!(backend.raw_row("users", id).await.unwrap().is_none());
    }
}
