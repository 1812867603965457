//! Predicates and relations handed to a [`Backend`](crate::storage::Backend).
//!
//! A [`Relation`] is a table plus a conjunction of predicates. It never adds
//! filters on its own; default scoping lives one layer up in [`scope`].

pub mod scope;

pub use scope::{Query, Scoping};

use std::fmt;

use crate::core::{Result, Value};

#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    /// `column = value`; never true when either side is NULL.
    Eq { column: String, value: Value },
    /// Case-insensitive `column = value`.
    EqIgnoreCase { column: String, value: Value },
    /// `column != value`; never true when either side is NULL.
    NotEq { column: String, value: Value },
    IsNull { column: String },
    IsNotNull { column: String },
}

impl Predicate {
    pub fn eq(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::Eq {
            column: column.into(),
            value: value.into(),
        }
    }

    pub fn eq_ignore_case(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::EqIgnoreCase {
            column: column.into(),
            value: value.into(),
        }
    }

    pub fn not_eq(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::NotEq {
            column: column.into(),
            value: value.into(),
        }
    }

    pub fn is_null(column: impl Into<String>) -> Self {
        Self::IsNull {
            column: column.into(),
        }
    }

    pub fn is_not_null(column: impl Into<String>) -> Self {
        Self::IsNotNull {
            column: column.into(),
        }
    }

    pub fn column(&self) -> &str {
        match self {
            Self::Eq { column, .. }
            | Self::EqIgnoreCase { column, .. }
            | Self::NotEq { column, .. }
            | Self::IsNull { column }
            | Self::IsNotNull { column } => column,
        }
    }

    /// Evaluate against the current value of the predicate's column.
    pub fn evaluate(&self, current: &Value) -> bool {
        match self {
            Self::Eq { value, .. } => current.sql_eq(value),
            Self::EqIgnoreCase { value, .. } => current.sql_eq_ignore_case(value),
            Self::NotEq { value, .. } => {
                !current.is_null() && !value.is_null() && !current.sql_eq(value)
            }
            Self::IsNull { .. } => current.is_null(),
            Self::IsNotNull { .. } => !current.is_null(),
        }
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Eq { column, value } => write!(f, "{} = {}", column, quoted(value)),
            Self::EqIgnoreCase { column, value } => {
                write!(f, "LOWER({}) = LOWER({})", column, quoted(value))
            }
            Self::NotEq { column, value } => write!(f, "{} != {}", column, quoted(value)),
            Self::IsNull { column } => write!(f, "{} IS NULL", column),
            Self::IsNotNull { column } => write!(f, "{} IS NOT NULL", column),
        }
    }
}

fn quoted(value: &Value) -> String {
    match value {
        Value::Text(s) => format!("'{}'", s.replace('\'', "''")),
        Value::Timestamp(ts) => format!("'{}'", ts.to_rfc3339()),
        other => other.to_string(),
    }
}

/// A table and the predicates every matching row must satisfy.
#[derive(Debug, Clone, PartialEq)]
pub struct Relation {
    table: String,
    predicates: Vec<Predicate>,
}

impl Relation {
    /// Relation over every row of `table`, with no implicit filters.
    pub fn unscoped(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            predicates: Vec::new(),
        }
    }

    pub fn and(mut self, predicate: Predicate) -> Self {
        self.predicates.push(predicate);
        self
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn predicates(&self) -> &[Predicate] {
        &self.predicates
    }

    /// True when every predicate holds. `lookup` resolves a column name to
    /// the row's current value.
    pub fn matches<F>(&self, mut lookup: F) -> Result<bool>
    where
        F: FnMut(&str) -> Result<Value>,
    {
        for predicate in &self.predicates {
            let current = lookup(predicate.column())?;
            if !predicate.evaluate(&current) {
                return Ok(false);
            }
        }
        Ok(true)
    }
}

impl fmt::Display for Relation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.table)?;
        for (i, predicate) in self.predicates.iter().enumerate() {
            let joiner = if i == 0 { " WHERE " } else { " AND " };
            write!(f, "{}{}", joiner, predicate)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_relation_display() {
        let rel = Relation::unscoped("users")
            .and(Predicate::eq("email", "o'neil@x.com"))
            .and(Predicate::not_eq("id", 4i64))
            .and(Predicate::is_null("deleted_at"));

        assert_eq!(
            rel.to_string(),
            "users WHERE email = 'o''neil@x.com' AND id != 4 AND deleted_at IS NULL"
        );
    }

    #[test]
    fn test_not_eq_with_null_is_false() {
        let pred = Predicate::not_eq("tenant", 1i64);
        assert!(!pred.evaluate(&Value::Null));
        assert!(pred.evaluate(&Value::Integer(2)));
        assert!(!pred.evaluate(&Value::Integer(1)));
    }

    #[test]
    fn test_matches_conjoins() {
        let rel = Relation::unscoped("users")
            .and(Predicate::eq("email", "a"))
            .and(Predicate::is_null("deleted_at"));

        let row = |col: &str| -> Result<Value> {
            Ok(match col {
                "email" => Value::from("a"),
                _ => Value::Null,
            })
        };
        assert!(rel.matches(row).unwrap());

        let tombstoned = |col: &str| -> Result<Value> {
            Ok(match col {
                "email" => Value::from("a"),
                _ => Value::Integer(1),
            })
        };
        assert!(!rel.matches(tombstoned).unwrap());
    }
}
