// SPDX-License-Identifier: Apache-2.0

//! Normalized error types for the catalog engine
//!
//! Driver errors (sqlx) and storage errors are mapped to these unified
//! variants so callers can tell transient I/O failures apart from logical
//! ones without inspecting driver-specific types.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Unified error type for all catalog operations
#[derive(Debug, Error, Serialize, Deserialize)]
pub enum EngineError {
    #[error("Connection failed: {message}")]
    ConnectionFailed { message: String },

    #[error("Operation timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    #[error("Query execution error: {message}")]
    ExecutionError { message: String },

    #[error("Unsupported engine type: {engine}")]
    UnsupportedEngine { engine: String },

    #[error("Data source not found: {data_source_id}")]
    DataSourceNotFound { data_source_id: String },

    #[error("Table not found: {schema}.{table} (data source {data_source_id})")]
    TableNotFound {
        data_source_id: String,
        schema: String,
        table: String,
    },

    #[error("Storage error: {message}")]
    StorageError { message: String },

    #[error("Validation error: {message}")]
    ValidationError { message: String },

    #[error("Internal error: {message}")]
    Internal { message: String },

    #[error("Metadata fetch failed for data source {data_source_id}: {cause}")]
    FetchFailed {
        data_source_id: String,
        schema: Option<String>,
        table: Option<String>,
        #[source]
        cause: Box<EngineError>,
    },
}

impl EngineError {
    pub fn connection_failed(msg: impl Into<String>) -> Self {
        Self::ConnectionFailed { message: msg.into() }
    }

    pub fn execution_error(msg: impl Into<String>) -> Self {
        Self::ExecutionError { message: msg.into() }
    }

    pub fn unsupported_engine(engine: impl Into<String>) -> Self {
        Self::UnsupportedEngine { engine: engine.into() }
    }

    pub fn data_source_not_found(id: impl Into<String>) -> Self {
        Self::DataSourceNotFound { data_source_id: id.into() }
    }

    pub fn table_not_found(
        data_source_id: impl Into<String>,
        schema: impl Into<String>,
        table: impl Into<String>,
    ) -> Self {
        Self::TableNotFound {
            data_source_id: data_source_id.into(),
            schema: schema.into(),
            table: table.into(),
        }
    }

    pub fn storage(msg: impl Into<String>) -> Self {
        Self::StorageError { message: msg.into() }
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::ValidationError { message: msg.into() }
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal { message: msg.into() }
    }

    /// Wraps an orchestration failure, keeping the original error as cause.
    pub fn fetch_failed(
        data_source_id: impl Into<String>,
        schema: Option<&str>,
        table: Option<&str>,
        cause: EngineError,
    ) -> Self {
        Self::FetchFailed {
            data_source_id: data_source_id.into(),
            schema: schema.map(str::to_string),
            table: table.map(str::to_string),
            cause: Box::new(cause),
        }
    }

    /// Returns true for failures that are likely to succeed when retried
    /// (dropped connections, timeouts).
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::ConnectionFailed { .. } | Self::Timeout { .. })
    }

    /// Maps a driver error coming from a catalog source connection.
    pub fn from_sqlx(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::Io(e) => Self::connection_failed(e.to_string()),
            sqlx::Error::Tls(e) => Self::connection_failed(e.to_string()),
            sqlx::Error::PoolClosed => Self::connection_failed("Connection pool closed"),
            sqlx::Error::WorkerCrashed => Self::connection_failed("Connection worker crashed"),
            sqlx::Error::PoolTimedOut => Self::Timeout { timeout_ms: 0 },
            other => Self::execution_error(other.to_string()),
        }
    }
}

/// Result type alias for catalog operations
pub type EngineResult<T> = Result<T, EngineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transient_classification() {
        assert!(EngineError::connection_failed("reset by peer").is_transient());
        assert!(EngineError::Timeout { timeout_ms: 10 }.is_transient());
        assert!(!EngineError::execution_error("syntax").is_transient());
        assert!(!EngineError::table_not_found("ds", "app", "users").is_transient());
        assert!(!EngineError::unsupported_engine("ORACLE").is_transient());
    }

    #[test]
    fn sqlx_errors_are_classified() {
        let io = sqlx::Error::Io(std::io::Error::new(
            std::io::ErrorKind::ConnectionReset,
            "reset",
        ));
        assert!(EngineError::from_sqlx(io).is_transient());
        assert!(EngineError::from_sqlx(sqlx::Error::PoolTimedOut).is_transient());
        assert!(!EngineError::from_sqlx(sqlx::Error::RowNotFound).is_transient());
    }

    #[test]
    fn fetch_failed_keeps_cause() {
        let err = EngineError::fetch_failed(
            "ds-1",
            Some("app"),
            Some("users"),
            EngineError::connection_failed("refused"),
        );
        let source = std::error::Error::source(&err).map(|s| s.to_string());
        assert_eq!(source.as_deref(), Some("Connection failed: refused"));
        assert!(err.to_string().contains("ds-1"));
    }
}
