//! Structured error types for easycrud-core.
//!
//! Uses `thiserror` so library consumers can match on the failure class
//! (pool, query, shutdown) while the original driver error stays reachable
//! through `source()`.

use std::io;
use thiserror::Error;

use crate::connection::TransactionState;

/// Main error type for easycrud-core operations
#[derive(Error, Debug)]
pub enum Error {
    /// Checking a connection out of the pool failed
    #[error("Pool error: {0}")]
    Pool(#[source] sqlx::Error),

    /// `acquire` was called before `create`
    #[error("Pool has not been created (call create() first)")]
    PoolNotCreated,

    /// The driver rejected or failed to execute a statement
    #[error("Query failed: {source}")]
    Query {
        sql: String,
        #[source]
        source: sqlx::Error,
    },

    /// A where/data mapping contained an empty column name
    #[error("Invalid column name at position {position}: column names must be non-empty")]
    InvalidColumn { position: usize },

    /// INSERT or UPDATE issued without any columns to set
    #[error("{operation} requires at least one column to set")]
    EmptyData { operation: &'static str },

    /// A result column could not be mapped to a JSON value
    #[error("Failed to decode column '{column}': {reason}")]
    Decode { column: String, reason: String },

    /// begin/commit/rollback issued out of order
    #[error("Cannot {action} while {state}")]
    Transaction {
        action: &'static str,
        state: TransactionState,
    },

    /// Closing the pool failed
    #[error("Shutdown error: {0}")]
    Shutdown(#[from] ShutdownError),

    /// Configuration error
    #[error("Configuration error: {reason}")]
    Config { reason: String },

    /// I/O operation failed (reading config files)
    #[error("I/O error: {source}")]
    Io {
        #[from]
        source: io::Error,
    },
}

/// Reasons `DbPool::end` can refuse to close the pool
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ShutdownError {
    #[error("{active} connection(s) still checked out")]
    ActiveConnections { active: u32 },

    #[error("pool was never created")]
    NotCreated,
}

/// Result type alias for easycrud-core operations
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Create a query error carrying the statement that failed
    pub fn query(sql: impl Into<String>, source: sqlx::Error) -> Self {
        Self::Query {
            sql: sql.into(),
            source,
        }
    }

    /// Create a decode error
    pub fn decode(column: impl Into<String>, reason: impl ToString) -> Self {
        Self::Decode {
            column: column.into(),
            reason: reason.to_string(),
        }
    }

    /// Create a config error
    pub fn config(reason: impl Into<String>) -> Self {
        Self::Config {
            reason: reason.into(),
        }
    }

    /// The underlying driver error, if this failure came from the driver.
    pub fn driver_error(&self) -> Option<&sqlx::Error> {
        match self {
            Self::Pool(source) | Self::Query { source, .. } => Some(source),
            _ => None,
        }
    }
}
