//! Storage error types
//!
//! Errors raised by the file and PostgreSQL adapters. Adapters translate them
//! into `PortError` at the port boundary so the engine never sees storage
//! details.

use std::path::PathBuf;

use thiserror::Error;

use core_kernel::PortError;

/// Errors that can occur in the storage adapters
#[derive(Debug, Error)]
pub enum StoreError {
    /// Filesystem operation failed
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A persisted line or document could not be decoded
    #[error("Corrupt record in {path} at line {line}: {message}")]
    Corrupt {
        path: PathBuf,
        line: usize,
        message: String,
    },

    /// A failed append could not be rolled back, so the file holds
    /// unacknowledged bytes until it is reopened
    #[error("Log {path} refuses appends after a failed rollback; reopen to recover")]
    Poisoned { path: PathBuf },

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A stored row does not map onto a domain type
    #[error("Invalid row: {0}")]
    InvalidRow(String),

    /// Entity not found
    #[error("{entity} with id '{id}' not found")]
    NotFound { entity: &'static str, id: String },

    /// The write would break a state rule, e.g. resolving a reviewed record
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Failed to establish a database connection
    #[error("Failed to connect to database: {0}")]
    ConnectionFailed(String),

    /// Pool exhaustion - no available connections
    #[error("Connection pool exhausted")]
    PoolExhausted,

    /// Unique constraint violation
    #[error("Duplicate entry: {0}")]
    DuplicateEntry(String),

    /// Query execution failed
    #[error("Query failed: {0}")]
    QueryFailed(String),

    #[error("Migration failed: {0}")]
    MigrationFailed(#[from] sqlx::migrate::MigrateError),
}

impl StoreError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        StoreError::Io {
            path: path.into(),
            source,
        }
    }

    pub fn not_found(entity: &'static str, id: impl std::fmt::Display) -> Self {
        StoreError::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound { .. })
    }

    /// Checks if this error is a connection-related issue
    pub fn is_connection_error(&self) -> bool {
        matches!(
            self,
            StoreError::ConnectionFailed(_) | StoreError::PoolExhausted
        )
    }
}

/// Maps SQLx errors onto the PostgreSQL error codes the adapters care about
impl From<sqlx::Error> for StoreError {
    fn from(error: sqlx::Error) -> Self {
        match &error {
            sqlx::Error::PoolTimedOut => StoreError::PoolExhausted,
            sqlx::Error::Io(_) | sqlx::Error::Tls(_) | sqlx::Error::PoolClosed => {
                StoreError::ConnectionFailed(error.to_string())
            }
            sqlx::Error::Database(db_err) => {
                // https://www.postgresql.org/docs/current/errcodes-appendix.html
                match db_err.code().as_deref() {
                    Some("23505") => StoreError::DuplicateEntry(db_err.message().to_string()),
                    _ => StoreError::QueryFailed(db_err.message().to_string()),
                }
            }
            _ => StoreError::QueryFailed(error.to_string()),
        }
    }
}

impl From<StoreError> for PortError {
    fn from(error: StoreError) -> Self {
        match error {
            StoreError::NotFound { entity, id } => PortError::not_found(entity, id),
            StoreError::Conflict(msg) | StoreError::DuplicateEntry(msg) => PortError::conflict(msg),
            StoreError::ConnectionFailed(_) | StoreError::PoolExhausted => {
                PortError::connection(error.to_string())
            }
            StoreError::Serialization(_) | StoreError::Corrupt { .. } | StoreError::InvalidRow(_) => {
                PortError::transformation(error.to_string())
            }
            other => PortError::internal_with_source("storage failure", other),
        }
    }
}
