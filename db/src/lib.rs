//! Query core for serving SQLite files as tabular resources.
//!
//! Translates grid filter models into SQL predicates, composes SELECT
//! statements from decoded resource paths, caches one connection per
//! database file and executes queries in batch or streaming mode.

pub mod backend;
pub mod config;
pub mod connection;
pub mod descriptor;
pub mod engine;
pub mod error;
pub mod filter;
pub mod query_builders;
pub mod types;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

// Re-export commonly used items
pub use backend::{ConnectionOpener, QueryParams, SqliteOpener, ValueType};
pub use config::EngineConfig;
pub use connection::{ConnectionError, ConnectionManager};
pub use descriptor::{PathError, PathParser, QueryDescriptor, SegmentPathParser};
pub use engine::{Cancellation, Engine};
pub use error::{EngineError, ErrorKind};
pub use filter::{build_where_clause, FilterClause, FilterError, FilterModel};
pub use query_builders::QueryComposer;
pub use types::{
    EntryKind, FileEntry, QueryOptions, QueryResult, QueryResultChunk, RowValues, StreamStats,
    TableInfo,
};
