use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::core::{Result, Row, StoreError, Value};
use crate::query::Relation;
use crate::registry::EntityType;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableSchema {
    name: String,
    primary_key: String,
    columns: Vec<String>,
}

impl TableSchema {
    pub fn new(name: impl Into<String>, primary_key: impl Into<String>, columns: Vec<String>) -> Self {
        Self {
            name: name.into(),
            primary_key: primary_key.into(),
            columns,
        }
    }

    /// Schema holding every column of an entity type, tombstone included.
    pub fn for_entity_type(entity_type: &EntityType) -> Self {
        Self::new(
            entity_type.name(),
            entity_type.primary_key(),
            entity_type.columns(),
        )
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn primary_key(&self) -> &str {
        &self.primary_key
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|col| col == name)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Table {
    schema: TableSchema,
    rows: BTreeMap<i64, Row>,
    next_row_id: i64,
}

impl Table {
    pub fn new(schema: TableSchema) -> Self {
        Self {
            schema,
            rows: BTreeMap::new(),
            next_row_id: 1,
        }
    }

    pub fn schema(&self) -> &TableSchema {
        &self.schema
    }

    pub fn insert(&mut self, row: Row) -> Result<i64> {
        let row = self.normalize_row(row)?;

        let id = self.next_row_id;
        self.next_row_id += 1;
        self.rows.insert(id, row);
        Ok(id)
    }

    /// Overwrite the given columns; columns absent from `changes` keep their
    /// stored values.
    pub fn update(&mut self, id: i64, changes: Row) -> Result<()> {
        for column in changes.keys() {
            self.check_column(column)?;
        }
        let row = self.row_mut(id)?;
        row.extend(changes);
        Ok(())
    }

    pub fn update_column(&mut self, id: i64, column: &str, value: Value) -> Result<()> {
        self.check_column(column)?;
        let row = self.row_mut(id)?;
        row.insert(column.to_string(), value);
        Ok(())
    }

    pub fn delete(&mut self, id: i64) -> bool {
        self.rows.remove(&id).is_some()
    }

    pub fn get(&self, id: i64) -> Option<&Row> {
        self.rows.get(&id)
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Iterate rows that satisfy every predicate of the relation.
    pub fn scan<'a>(
        &'a self,
        relation: &'a Relation,
    ) -> impl Iterator<Item = Result<(i64, &'a Row)>> + 'a {
        self.rows.iter().filter_map(move |(id, row)| {
            match relation.matches(|column| self.column_value(*id, row, column)) {
                Ok(true) => Some(Ok((*id, row))),
                Ok(false) => None,
                Err(e) => Some(Err(e)),
            }
        })
    }

    fn column_value(&self, id: i64, row: &Row, column: &str) -> Result<Value> {
        if column == self.schema.primary_key {
            return Ok(Value::Integer(id));
        }
        self.check_column(column)?;
        Ok(row.get(column).cloned().unwrap_or(Value::Null))
    }

    fn row_mut(&mut self, id: i64) -> Result<&mut Row> {
        let table = self.schema.name.clone();
        self.rows
            .get_mut(&id)
            .ok_or(StoreError::RecordNotFound { table, id })
    }

    fn check_column(&self, column: &str) -> Result<()> {
        if self.schema.has_column(column) {
            Ok(())
        } else {
            Err(StoreError::ColumnNotFound(
                column.to_string(),
                self.schema.name.clone(),
            ))
        }
    }

    /// Reject unknown columns and fill missing ones with NULL.
    fn normalize_row(&self, mut row: Row) -> Result<Row> {
        if let Some(unknown) = row.keys().find(|col| !self.schema.has_column(col)) {
            return Err(StoreError::ColumnNotFound(
                unknown.clone(),
                self.schema.name.clone(),
            ));
        }
        for column in &self.schema.columns {
            row.entry(column.clone()).or_insert(Value::Null);
        }
        Ok(row)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::Predicate;

    fn table() -> Table {
        Table::new(TableSchema::new(
            "users",
            "id",
            vec!["email".into(), "deleted_at".into()],
        ))
    }

    fn row(email: &str) -> Row {
        let mut row = Row::new();
        row.insert("email".into(), Value::from(email));
        row
    }

    #[test]
    fn test_insert_assigns_sequential_ids() {
        let mut t = table();
        assert_eq!(t.insert(row("a")).unwrap(), 1);
        assert_eq!(t.insert(row("b")).unwrap(), 2);
        assert_eq!(t.get(1).unwrap().get("deleted_at"), Some(&Value::Null));
    }

    #[test]
    fn test_unknown_column_is_rejected() {
        let mut t = table();
        let mut bad = row("a");
        bad.insert("nickname".into(), Value::from("x"));
        assert!(matches!(t.insert(bad), Err(StoreError::ColumnNotFound(..))));

        let id = t.insert(row("a")).unwrap();
        let result = t.update_column(id, "nickname", Value::Null);
        assert!(matches!(result, Err(StoreError::ColumnNotFound(..))));
    }

    #[test]
    fn test_update_keeps_unmentioned_columns() {
        let mut t = table();
        let id = t.insert(row("a")).unwrap();
        t.update_column(id, "deleted_at", Value::Integer(1)).unwrap();

        t.update(id, row("b")).unwrap();
        let stored = t.get(id).unwrap();
        assert_eq!(stored.get("email"), Some(&Value::from("b")));
        assert_eq!(stored.get("deleted_at"), Some(&Value::Integer(1)));

        assert!(matches!(t.update(99, row("c")), Err(StoreError::RecordNotFound { .. })));
    }

    #[test]
    fn test_update_column_on_missing_row() {
        let mut t = table();
        let result = t.update_column(99, "email", Value::from("a"));
        assert!(matches!(result, Err(StoreError::RecordNotFound { id: 99, .. })));
    }

    #[test]
    fn test_scan_filters_by_primary_key_and_columns() {
        let mut t = table();
        t.insert(row("a")).unwrap();
        t.insert(row("a")).unwrap();
        t.insert(row("b")).unwrap();

        let rel = Relation::unscoped("users")
            .and(Predicate::eq("email", "a"))
            .and(Predicate::not_eq("id", 1i64));
        let ids: Vec<i64> = t.scan(&rel).map(|r| r.unwrap().0).collect();
        assert_eq!(ids, vec![2]);
    }

    #[test]
    fn test_scan_reports_unknown_predicate_column() {
        let mut t = table();
        t.insert(row("a")).unwrap();

        let rel = Relation::unscoped("users").and(Predicate::is_null("tenant_id"));
        let first = t.scan(&rel).next().unwrap();
        assert!(matches!(first, Err(StoreError::ColumnNotFound(..))));
    }
}
