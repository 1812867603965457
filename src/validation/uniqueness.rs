use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use super::{ErrorContext, ErrorKind, Validator};
use crate::core::{Record, Result, Value};
use crate::query::{Predicate, Relation};
use crate::storage::Backend;

/// How a NULL candidate (or NULL scope value) compares against stored NULLs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NullEquality {
    /// SQL semantics: `NULL = NULL` is not a match, so any number of records
    /// may leave the attribute empty.
    #[default]
    Distinct,
    /// NULL matches NULL (`IS NULL`), so at most one record may be empty.
    Equal,
}

/// Declared uniqueness constraint on one attribute.
#[derive(Debug, Clone, PartialEq)]
pub struct UniquenessRule {
    attribute: String,
    scope: Vec<String>,
    case_sensitive: bool,
    without_tombstoned: bool,
    nulls: Option<NullEquality>,
    message: Option<String>,
}

impl UniquenessRule {
    pub fn new(attribute: impl Into<String>) -> Self {
        Self {
            attribute: attribute.into(),
            scope: Vec::new(),
            case_sensitive: true,
            without_tombstoned: true,
            nulls: None,
            message: None,
        }
    }

    /// Attributes partitioning the uniqueness universe
    pub fn scope<I, S>(mut self, attributes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.scope.extend(attributes.into_iter().map(Into::into));
        self
    }

    pub fn case_sensitive(mut self, case_sensitive: bool) -> Self {
        self.case_sensitive = case_sensitive;
        self
    }

    /// `false` makes tombstoned rows count as conflicts.
    pub fn without_tombstoned(mut self, without_tombstoned: bool) -> Self {
        self.without_tombstoned = without_tombstoned;
        self
    }

    pub fn include_tombstoned(self) -> Self {
        self.without_tombstoned(false)
    }

    /// Null handling for this rule. Unset rules take the type's default.
    pub fn nulls(mut self, nulls: NullEquality) -> Self {
        self.nulls = Some(nulls);
        self
    }

    /// Custom failure message; `{value}` expands to the rejected value.
    pub fn message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn attribute(&self) -> &str {
        &self.attribute
    }

    pub fn scope_attributes(&self) -> &[String] {
        &self.scope
    }

    pub fn is_case_sensitive(&self) -> bool {
        self.case_sensitive
    }

    pub fn excludes_tombstoned(&self) -> bool {
        self.without_tombstoned
    }

    pub fn null_equality(&self) -> NullEquality {
        self.nulls.unwrap_or_default()
    }

    pub(crate) fn default_nulls(&mut self, nulls: NullEquality) {
        self.nulls.get_or_insert(nulls);
    }
}

/// Checks a [`UniquenessRule`] with a single existence query.
///
/// The check is advisory: nothing stops a concurrent writer from inserting
/// the same value between the check and the caller's insert. A unique index
/// in the storage engine (partial on `deleted_at IS NULL` when tombstoned
/// rows are excluded) is what actually guarantees uniqueness.
pub struct UniquenessValidator {
    rule: UniquenessRule,
    backend: Arc<dyn Backend>,
}

impl UniquenessValidator {
    pub fn new(rule: UniquenessRule, backend: Arc<dyn Backend>) -> Self {
        Self { rule, backend }
    }

    pub fn rule(&self) -> &UniquenessRule {
        &self.rule
    }

    /// Bring the candidate into stored form. NULL is never encoded.
    pub fn encode(&self, record: &Record, attribute: &str, value: Value) -> Result<Value> {
        match record.entity_type().coder(attribute) {
            Some(coder) if !value.is_null() => coder.dump(&value),
            _ => Ok(value),
        }
    }

    /// The conflict query for an already encoded candidate value.
    ///
    /// Starts from the raw table so the tombstone filter is added exactly
    /// once, here, and only when the rule asks for it.
    pub fn build_relation(&self, record: &Record, attribute: &str, value: &Value) -> Relation {
        let entity_type = record.entity_type();

        let nulls = self.rule.null_equality();
        let base = match (value.is_null(), nulls) {
            (true, NullEquality::Equal) => Predicate::is_null(attribute),
            _ if !self.rule.case_sensitive => Predicate::eq_ignore_case(attribute, value.clone()),
            _ => Predicate::eq(attribute, value.clone()),
        };
        let mut relation = Relation::unscoped(entity_type.name()).and(base);

        if record.is_persisted()
            && let Some(id) = record.id()
        {
            relation = relation.and(Predicate::not_eq(entity_type.primary_key(), id));
        }

        if let Some(column) = entity_type.tombstone_column()
            && self.rule.without_tombstoned
        {
            relation = relation.and(Predicate::is_null(column));
        }

        for scope in &self.rule.scope {
            let scope_value = record.get(scope);
            let predicate = match (scope_value.is_null(), nulls) {
                (true, NullEquality::Equal) => Predicate::is_null(scope.as_str()),
                _ => Predicate::eq(scope.as_str(), scope_value),
            };
            relation = relation.and(predicate);
        }

        relation
    }
}

#[async_trait]
impl Validator for UniquenessValidator {
    fn attribute(&self) -> &str {
        &self.rule.attribute
    }

    async fn validate_each(&self, record: &mut Record, attribute: &str, value: Value) -> Result<()> {
        let value = self.encode(record, attribute, value)?;
        let relation = self.build_relation(record, attribute, &value);

        if self.backend.exists(&relation).await? {
            debug!(
                entity_type = record.type_name(),
                id = ?record.id(),
                attribute,
                "uniqueness check failed"
            );
            record.errors.add(
                attribute,
                ErrorKind::Taken,
                ErrorContext {
                    value: Some(value),
                    message: self.rule.message.clone(),
                },
            );
        }

        Ok(())
    }
}
