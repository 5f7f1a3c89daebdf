//! Configuration file handling.
//!
//! Loads `.sqliter.json` (or a file given with `--config`). The file holds
//! an `engine` object whose fields are all optional:
//!
//! ```json
//! {
//!   "engine": {
//!     "serve_folder": "./sample_data",
//!     "default_table": "tb0",
//!     "stream_batch_size": 1000,
//!     "stream_flush_interval_ms": 100,
//!     "busy_timeout_ms": 10000,
//!     "cache_size": 10000,
//!     "database_extensions": [".db", ".sqlite", ".sqlite3"]
//!   }
//! }
//! ```

use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fs;
use std::path::{Path, PathBuf};

use db::EngineConfig;

pub const DEFAULT_CONFIG_FILE: &str = ".sqliter.json";

/// Top-level configuration file structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConfigFile {
    #[serde(default)]
    pub engine: EngineConfig,
}

impl ConfigFile {
    /// Load configuration.
    ///
    /// An explicit path must exist. Without one, `.sqliter.json` in the
    /// current directory is read if present; otherwise defaults apply.
    ///
    /// # Errors
    ///
    /// Returns an error if the explicit file is missing, a file cannot be
    /// read, or its JSON is invalid.
    pub fn load(explicit: Option<&Path>) -> Result<Self, Box<dyn Error>> {
        let path = match explicit {
            Some(path) => {
                if !path.exists() {
                    return Err(format!("Configuration file not found: {}", path.display()).into());
                }
                path.to_path_buf()
            }
            None => {
                let local = PathBuf::from(DEFAULT_CONFIG_FILE);
                if !local.exists() {
                    return Ok(Self::default());
                }
                local
            }
        };
        Self::load_from(&path)
    }

    /// Load configuration from a specific path.
    pub fn load_from(path: &Path) -> Result<Self, Box<dyn Error>> {
        let contents = fs::read_to_string(path)
            .map_err(|e| format!("Failed to read {}: {}", path.display(), e))?;
        serde_json::from_str(&contents)
            .map_err(|e| format!("Invalid JSON in {}: {}", path.display(), e).into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use tempfile::tempdir;

    fn write_config(contents: &str) -> (tempfile::TempDir, PathBuf) {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, contents).unwrap();
        (dir, path)
    }

    #[rstest]
    fn test_partial_engine_section_keeps_defaults() {
        let (_dir, path) = write_config(r#"{"engine": {"serve_folder": "/data"}}"#);
        let config = ConfigFile::load_from(&path).unwrap();
        assert_eq!(config.engine.serve_folder, PathBuf::from("/data"));
        assert_eq!(config.engine.stream_batch_size, 1000);
        assert_eq!(config.engine.default_table, "tb0");
    }

    #[rstest]
    fn test_empty_object_is_default() {
        let (_dir, path) = write_config("{}");
        let config = ConfigFile::load_from(&path).unwrap();
        assert_eq!(config.engine, EngineConfig::default());
    }

    #[rstest]
    fn test_invalid_json_rejected() {
        let (_dir, path) = write_config("{ not json");
        let err = ConfigFile::load_from(&path).unwrap_err();
        assert!(err.to_string().contains("Invalid JSON"));
    }

    #[rstest]
    fn test_missing_explicit_file_rejected() {
        let err = ConfigFile::load(Some(Path::new("/nonexistent/sqliter.json"))).unwrap_err();
        assert!(err.to_string().contains("Configuration file not found"));
    }
}
