//! Record validation.
//!
//! Validators push failures into [`Record::errors`](crate::Record) and keep
//! going; only storage errors end a validation pass early.

pub mod errors;
pub mod uniqueness;

pub use errors::{ErrorContext, ErrorKind, ValidationError, ValidationErrors};
pub use uniqueness::{NullEquality, UniquenessRule, UniquenessValidator};

use async_trait::async_trait;

use crate::core::{Record, Result, Value};

/// One declared rule, invoked once per validation pass.
#[async_trait]
pub trait Validator: Send + Sync {
    /// Attribute the rule is declared on
    fn attribute(&self) -> &str;

    /// Check a single attribute value and record any failure on `record`
    async fn validate_each(&self, record: &mut Record, attribute: &str, value: Value) -> Result<()>;

    /// Read the attribute off the record and validate it
    async fn validate(&self, record: &mut Record) -> Result<()> {
        let attribute = self.attribute().to_string();
        let value = record.get(&attribute);
        self.validate_each(record, &attribute, value).await
    }
}

/// Run every validator against the record, accumulating failures.
///
/// Clears previous errors first. Returns whether the record ended up valid.
pub async fn run_validators(record: &mut Record, validators: &[Box<dyn Validator>]) -> Result<bool> {
    record.errors.clear();
    for validator in validators {
        validator.validate(record).await?;
    }
    Ok(record.errors.is_empty())
}
