//! SQLite opener applying the per-handle pragmas.
//!
//! Every physical handle gets write-ahead logging, a busy timeout long enough
//! that concurrent readers wait instead of failing with "database is locked",
//! and a page cache size. Handles are opened without `SQLITE_OPEN_CREATE`, so
//! a path that does not name an existing file is an open failure instead of a
//! freshly created empty database.

use std::path::Path;
use std::time::Duration;

use rusqlite::{Connection, OpenFlags};
use tracing::debug;

use super::ConnectionOpener;
use crate::config::EngineConfig;

/// Default opener used by the engine.
#[derive(Debug, Clone)]
pub struct SqliteOpener {
    busy_timeout: Duration,
    cache_size: i64,
}

impl SqliteOpener {
    pub fn new(busy_timeout: Duration, cache_size: i64) -> Self {
        Self {
            busy_timeout,
            cache_size,
        }
    }

    pub fn from_config(config: &EngineConfig) -> Self {
        Self::new(config.busy_timeout(), config.cache_size)
    }
}

impl Default for SqliteOpener {
    fn default() -> Self {
        Self::from_config(&EngineConfig::default())
    }
}

impl ConnectionOpener for SqliteOpener {
    fn open(&self, path: &Path) -> rusqlite::Result<Connection> {
        let flags = OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_NO_MUTEX;
        let conn = Connection::open_with_flags(path, flags)?;

        conn.busy_timeout(self.busy_timeout)?;

        // journal_mode answers with the mode actually in effect.
        let mode: String = conn.query_row("PRAGMA journal_mode=WAL", [], |row| row.get(0))?;
        if !mode.eq_ignore_ascii_case("wal") {
            debug!(path = %path.display(), mode = %mode, "WAL mode unavailable");
        }

        conn.pragma_update(None, "cache_size", self.cache_size)?;
        Ok(conn)
    }
}
