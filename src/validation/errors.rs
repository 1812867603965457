use std::fmt;

use crate::core::Value;

/// Kind of validation failure recorded against an attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Another visible record already holds the value.
    Taken,
}

impl ErrorKind {
    pub fn default_message(&self) -> &'static str {
        match self {
            Self::Taken => "has already been taken",
        }
    }
}

/// Data carried alongside an error for message formatting.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ErrorContext {
    /// The rejected value.
    pub value: Option<Value>,
    /// Custom message; `{value}` is replaced by the rejected value.
    pub message: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ValidationError {
    pub attribute: String,
    pub kind: ErrorKind,
    pub context: ErrorContext,
}

impl ValidationError {
    pub fn message(&self) -> String {
        let template = self
            .context
            .message
            .as_deref()
            .unwrap_or_else(|| self.kind.default_message());

        match &self.context.value {
            Some(value) => template.replace("{value}", &value.to_string()),
            None => template.to_string(),
        }
    }

    pub fn full_message(&self) -> String {
        format!("{} {}", self.attribute, self.message())
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.full_message())
    }
}

/// Error collection attached to a record. Failures accumulate; nothing here
/// short-circuits.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValidationErrors {
    errors: Vec<ValidationError>,
}

impl ValidationErrors {
    pub fn add(&mut self, attribute: impl Into<String>, kind: ErrorKind, context: ErrorContext) {
        self.errors.push(ValidationError {
            attribute: attribute.into(),
            kind,
            context,
        });
    }

    pub fn on(&self, attribute: &str) -> Vec<&ValidationError> {
        self.errors
            .iter()
            .filter(|err| err.attribute == attribute)
            .collect()
    }

    pub fn has(&self, attribute: &str, kind: ErrorKind) -> bool {
        self.errors
            .iter()
            .any(|err| err.attribute == attribute && err.kind == kind)
    }

    pub fn full_messages(&self) -> Vec<String> {
        self.errors.iter().map(ValidationError::full_message).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ValidationError> {
        self.errors.iter()
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn clear(&mut self) {
        self.errors.clear();
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.full_messages().join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_taken_message() {
        let mut errors = ValidationErrors::default();
        errors.add(
            "email",
            ErrorKind::Taken,
            ErrorContext {
                value: Some(Value::from("a@x.com")),
                message: None,
            },
        );

        assert!(errors.has("email", ErrorKind::Taken));
        assert_eq!(errors.full_messages(), vec!["email has already been taken"]);
    }

    #[test]
    fn test_custom_message_interpolates_value() {
        let mut errors = ValidationErrors::default();
        errors.add(
            "email",
            ErrorKind::Taken,
            ErrorContext {
                value: Some(Value::from("a@x.com")),
                message: Some("{value} is in use".into()),
            },
        );

        assert_eq!(errors.on("email")[0].message(), "a@x.com is in use");
        assert_eq!(errors.to_string(), "email a@x.com is in use");
    }

    #[test]
    fn test_errors_accumulate() {
        let mut errors = ValidationErrors::default();
        errors.add("email", ErrorKind::Taken, ErrorContext::default());
        errors.add("login", ErrorKind::Taken, ErrorContext::default());

        assert_eq!(errors.len(), 2);
        assert_eq!(errors.on("login").len(), 1);

        errors.clear();
        assert!(errors.is_empty());
    }
}
