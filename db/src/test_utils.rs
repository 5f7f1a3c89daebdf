//! Shared test utilities for engine and integration tests.
//!
//! Builds throwaway serve roots populated with small SQLite files.

use std::path::{Path, PathBuf};

use rusqlite::Connection;
use tempfile::TempDir;

use crate::config::EngineConfig;
use crate::engine::Engine;

/// Four people, ages 25 to 40. Used by most execution tests.
pub const PEOPLE_SQL: &str = "
    CREATE TABLE people (name TEXT, age INTEGER);
    INSERT INTO people VALUES ('Alice', 30), ('Bob', 25), ('Charlie', 35), ('Eve', 40);
";

/// A temporary serve root. Removed when dropped.
pub struct TestRoot {
    dir: TempDir,
}

impl TestRoot {
    pub fn new() -> Self {
        Self {
            dir: TempDir::new().expect("Failed to create temp dir"),
        }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Create `name` below the root (parent directories included) and run
    /// `sql` against it.
    pub fn create_db(&self, name: &str, sql: &str) -> PathBuf {
        let path = self.dir.path().join(name);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("Failed to create parent dir");
        }
        let conn = Connection::open(&path).expect("Failed to create database");
        conn.execute_batch(sql).expect("Failed to seed database");
        path
    }

    /// Create an empty regular file below the root.
    pub fn touch(&self, name: &str) -> PathBuf {
        let path = self.dir.path().join(name);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("Failed to create parent dir");
        }
        std::fs::write(&path, b"").expect("Failed to write file");
        path
    }

    pub fn config(&self) -> EngineConfig {
        EngineConfig::new(self.dir.path())
    }

    /// Engine serving this root with default settings.
    pub fn engine(&self) -> Engine {
        Engine::new(self.config())
    }
}

impl Default for TestRoot {
    fn default() -> Self {
        Self::new()
    }
}

/// Serve root holding `people.db` seeded with [`PEOPLE_SQL`].
pub fn people_root() -> TestRoot {
    let root = TestRoot::new();
    root.create_db("people.db", PEOPLE_SQL);
    root
}
