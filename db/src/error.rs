//! Errors returned by the query engine.

use thiserror::Error;

use crate::connection::ConnectionError;
use crate::descriptor::PathError;
use crate::filter::FilterError;

/// Coarse classification of an [`EngineError`], for callers that map
/// failures onto transport status codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed caller input: filter JSON, resource path, traversal.
    Input,
    /// The requested table could not be determined.
    Resolution,
    /// The database file could not be opened.
    Connection,
    /// SQL execution failed.
    Query,
    /// The caller cancelled the operation or its deadline passed.
    Cancelled,
}

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Error building filter: {0}")]
    Filter(#[from] FilterError),

    #[error("Error parsing resource path: {0}")]
    Path(#[from] PathError),

    #[error("Error opening database: {0}")]
    Connection(#[from] ConnectionError),

    #[error("No tables found in database '{path}'")]
    NoTables { path: String },

    #[error("Table name required. Available tables: {}", candidates.join(", "))]
    AmbiguousTable { candidates: Vec<String> },

    #[error("Query failed: {message} (sql: {sql})")]
    QueryFailed { sql: String, message: String },

    #[error("Failed to read directory '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Query cancelled")]
    Cancelled,
}

impl EngineError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            EngineError::Filter(_) | EngineError::Path(_) | EngineError::Io { .. } => {
                ErrorKind::Input
            }
            EngineError::NoTables { .. } | EngineError::AmbiguousTable { .. } => {
                ErrorKind::Resolution
            }
            EngineError::Connection(_) => ErrorKind::Connection,
            EngineError::QueryFailed { .. } => ErrorKind::Query,
            EngineError::Cancelled => ErrorKind::Cancelled,
        }
    }

    pub(crate) fn query_failed(sql: &str, err: impl std::fmt::Display) -> Self {
        EngineError::QueryFailed {
            sql: sql.to_string(),
            message: err.to_string(),
        }
    }
}
