use crate::registry::{DEFAULT_PRIMARY_KEY, DEFAULT_TOMBSTONE_COLUMN, EntityTypeBuilder};
use crate::validation::NullEquality;

/// Store-wide defaults applied to entity types defined through
/// [`Store::define`](crate::Store::define).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    /// Column holding the tombstone timestamp
    pub tombstone_column: String,

    /// Primary key column name
    pub primary_key: String,

    /// Null handling for uniqueness rules that don't choose one
    pub default_null_equality: NullEquality,
}

impl StoreConfig {
    pub fn new() -> Self {
        Self {
            tombstone_column: DEFAULT_TOMBSTONE_COLUMN.to_string(),
            primary_key: DEFAULT_PRIMARY_KEY.to_string(),
            default_null_equality: NullEquality::Distinct,
        }
    }

    /// Set the tombstone column
    pub fn tombstone_column(mut self, column: &str) -> Self {
        self.tombstone_column = column.to_string();
        self
    }

    /// Set the primary key column
    pub fn primary_key(mut self, column: &str) -> Self {
        self.primary_key = column.to_string();
        self
    }

    /// Set the null handling inherited by uniqueness rules
    pub fn default_null_equality(mut self, nulls: NullEquality) -> Self {
        self.default_null_equality = nulls;
        self
    }

    /// Start an entity type definition carrying these defaults
    pub fn entity_type(&self, name: &str) -> EntityTypeBuilder {
        EntityTypeBuilder::new(name)
            .primary_key(self.primary_key.as_str())
            .default_tombstone_column(self.tombstone_column.as_str())
            .default_null_equality(self.default_null_equality)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.tombstone_column.trim().is_empty() {
            return Err("tombstone_column cannot be empty".to_string());
        }

        if self.primary_key.trim().is_empty() {
            return Err("primary_key cannot be empty".to_string());
        }

        if self.tombstone_column == self.primary_key {
            return Err("tombstone_column cannot be the primary key".to_string());
        }

        Ok(())
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = StoreConfig::default();
        assert_eq!(config.tombstone_column, "deleted_at");
        assert_eq!(config.primary_key, "id");
        assert_eq!(config.default_null_equality, NullEquality::Distinct);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_builder_pattern() {
        let config = StoreConfig::new()
            .tombstone_column("archived_at")
            .primary_key("uid")
            .default_null_equality(NullEquality::Equal);

        let ty = config
            .entity_type("notes")
            .attribute("body")
            .tombstoned()
            .validates_uniqueness_of(crate::UniquenessRule::new("body"))
            .build()
            .unwrap();

        assert_eq!(ty.primary_key(), "uid");
        assert_eq!(ty.tombstone_column(), Some("archived_at"));
        assert_eq!(ty.uniqueness_rules()[0].null_equality(), NullEquality::Equal);
    }

    #[test]
    fn test_validate() {
        assert!(StoreConfig::new().tombstone_column("").validate().is_err());
        assert!(StoreConfig::new().primary_key("  ").validate().is_err());
        assert!(
            StoreConfig::new()
                .tombstone_column("id")
                .validate()
                .is_err()
        );
    }
}
