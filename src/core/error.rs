use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Entity type '{0}' is not registered")]
    UnknownEntityType(String),

    #[error("Entity type '{0}' is already registered")]
    EntityTypeExists(String),

    #[error("Table '{0}' already exists")]
    TableExists(String),

    #[error("Table '{0}' not found")]
    TableNotFound(String),

    #[error("Column '{0}' not found in table '{1}'")]
    ColumnNotFound(String, String),

    #[error("Record {id} not found in table '{table}'")]
    RecordNotFound { table: String, id: i64 },

    #[error("Type mismatch: {0}")]
    TypeMismatch(String),

    #[error("Callback halted '{0}'")]
    CallbackHalted(String),

    #[error("Validation failed: {0}")]
    RecordInvalid(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Unsupported operation: {0}")]
    UnsupportedOperation(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Lock error: {0}")]
    LockError(String),

    #[error("Storage error: {0}")]
    Storage(String),
}

pub type Result<T> = std::result::Result<T, StoreError>;

impl<T> From<std::sync::PoisonError<T>> for StoreError {
    fn from(err: std::sync::PoisonError<T>) -> Self {
        Self::LockError(err.to_string())
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}
