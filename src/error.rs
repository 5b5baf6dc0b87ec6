use thiserror::Error;

#[cfg(feature = "sqlite")]
use rusqlite;

/// Failure while scanning SQL text for named placeholders.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScanError {
    #[error("Failed to process query: unterminated ' literal starting at byte {position}")]
    UnterminatedLiteral { position: usize },

    #[error("Invalid ordinal placeholder at byte {position}: ordinals start at 1")]
    InvalidOrdinal { position: usize },
}

/// Caller arguments that do not line up with a binding plan.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BindError {
    #[error("Invalid argument index {index}, should be in range 1..{len}")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("Property '{property}' not found on argument {index}")]
    PropertyNotFound { index: usize, property: String },

    #[error("Parameter {position} is a model object and cannot be bound directly")]
    ModelNotBindable { position: usize },
}

#[derive(Debug, Error)]
pub enum SqlFacadeError {
    #[cfg(feature = "sqlite")]
    #[error(transparent)]
    SqliteError(#[from] rusqlite::Error),

    #[error(transparent)]
    Scan(#[from] ScanError),

    #[error(transparent)]
    Bind(#[from] BindError),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Connection error: {0}")]
    ConnectionError(String),

    #[error("SQL execution error: {0}")]
    ExecutionError(String),

    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Unimplemented feature: {0}")]
    Unimplemented(String),

    #[error("Other database error: {0}")]
    Other(String),
}

impl SqlFacadeError {
    /// True for failures raised before any database interaction took place.
    #[must_use]
    pub fn is_caller_error(&self) -> bool {
        matches!(self, Self::Scan(_) | Self::Bind(_))
    }
}

impl<T> From<std::sync::PoisonError<T>> for SqlFacadeError {
    fn from(err: std::sync::PoisonError<T>) -> Self {
        SqlFacadeError::ExecutionError(format!("mutex poisoned: {err}"))
    }
}
