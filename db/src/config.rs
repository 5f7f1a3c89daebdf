//! Engine configuration.
//!
//! All fields have defaults so a partial JSON document (or none at all)
//! yields a usable configuration.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Table name substituted when a descriptor carries no table and none could
/// be inferred upstream. Matches the naming used by the tools that convert
/// spreadsheets and CSV files into single-table databases.
pub const DEFAULT_TABLE: &str = "tb0";

/// Configuration for the query engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Folder containing the SQLite files to serve. Every dataset path is
    /// resolved relative to it.
    pub serve_folder: PathBuf,
    /// Table used in `FROM` when a descriptor names none.
    pub default_table: String,
    /// Rows buffered before a streaming chunk is emitted.
    pub stream_batch_size: usize,
    /// Maximum time between streaming emissions, in milliseconds.
    pub stream_flush_interval_ms: u64,
    /// SQLite busy timeout applied to each physical handle, in milliseconds.
    pub busy_timeout_ms: u64,
    /// SQLite `cache_size` pragma applied to each physical handle.
    pub cache_size: i64,
    /// File suffixes listed as databases by `list_files` and recognised as
    /// the end of the dataset part of a resource path.
    pub database_extensions: Vec<String>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            serve_folder: PathBuf::from("sample_data"),
            default_table: DEFAULT_TABLE.to_string(),
            stream_batch_size: 1000,
            stream_flush_interval_ms: 100,
            busy_timeout_ms: 10_000,
            cache_size: 10_000,
            database_extensions: vec![".db".into(), ".sqlite".into(), ".sqlite3".into()],
        }
    }
}

impl EngineConfig {
    pub fn new(serve_folder: impl AsRef<Path>) -> Self {
        Self {
            serve_folder: serve_folder.as_ref().to_path_buf(),
            ..Self::default()
        }
    }

    pub fn flush_interval(&self) -> Duration {
        Duration::from_millis(self.stream_flush_interval_ms)
    }

    pub fn busy_timeout(&self) -> Duration {
        Duration::from_millis(self.busy_timeout_ms)
    }

    /// Whether `name` ends with one of the configured database extensions.
    pub fn is_database_file(&self, name: &str) -> bool {
        let lower = name.to_ascii_lowercase();
        self.database_extensions
            .iter()
            .any(|ext| lower.ends_with(&ext.to_ascii_lowercase()))
    }
}
