//! Error types for the empresa registry.

/// Top-level error type for the service.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// Database-related errors.
#[derive(Debug, thiserror::Error)]
pub enum DatabaseError {
    #[error("Connection pool error: {0}")]
    Pool(String),

    #[error("Query failed: {0}")]
    Query(String),

    #[error("Constraint violation: {0}")]
    Constraint(String),

    #[error("Migration failed: {0}")]
    Migration(String),
}

impl DatabaseError {
    /// Classify a libsql error raised by `op`.
    ///
    /// SQLite reports uniqueness and foreign-key failures only through the
    /// message text, so any message containing `constraint failed` is treated
    /// as a constraint violation.
    pub fn from_libsql(op: &str, err: libsql::Error) -> Self {
        let msg = err.to_string();
        if msg.contains("constraint failed") {
            DatabaseError::Constraint(format!("{op}: {msg}"))
        } else {
            DatabaseError::Query(format!("{op}: {msg}"))
        }
    }
}

/// Result type alias for the service.
pub type Result<T> = std::result::Result<T, Error>;
