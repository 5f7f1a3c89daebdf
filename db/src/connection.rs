//! Per-file connection cache.
//!
//! One physical SQLite handle is kept per canonical database path for the
//! lifetime of the manager (or until `close_all`). The cache mutex guards
//! only lookup and insert; queries run outside it, serialized per file by
//! the handle's own lock. SQLite allows a single writer per file, so the
//! per-path pool is capped at that one handle.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::{Mutex, MutexGuard};
use rusqlite::Connection;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::backend::{ConnectionOpener, SqliteOpener};
use crate::config::EngineConfig;

#[derive(Error, Debug)]
pub enum ConnectionError {
    #[error("Failed to open database '{path}': {message}")]
    OpenFailed { path: String, message: String },
}

/// A cached physical handle.
///
/// Holding the guard returned by [`DbHandle::lock`] gives exclusive use of
/// the connection; every other caller on the same file waits for it.
pub struct DbHandle {
    path: PathBuf,
    conn: Mutex<Connection>,
}

impl DbHandle {
    fn new(path: PathBuf, conn: Connection) -> Self {
        Self {
            path,
            conn: Mutex::new(conn),
        }
    }

    pub fn lock(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock()
    }
}

impl std::fmt::Debug for DbHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DbHandle").field("path", &self.path).finish()
    }
}

pub type SharedHandle = Arc<DbHandle>;

/// Caches one live handle per database path.
pub struct ConnectionManager {
    opener: Box<dyn ConnectionOpener>,
    conns: Mutex<HashMap<PathBuf, SharedHandle>>,
}

impl ConnectionManager {
    pub fn new(opener: impl ConnectionOpener + 'static) -> Self {
        Self {
            opener: Box::new(opener),
            conns: Mutex::new(HashMap::new()),
        }
    }

    pub fn from_config(config: &EngineConfig) -> Self {
        Self::new(SqliteOpener::from_config(config))
    }

    /// Return the cached handle for `path`, opening it on first use.
    ///
    /// Creation happens under the cache mutex so concurrent callers never
    /// open the same path twice. Failed opens are not cached.
    pub fn get(&self, path: &Path) -> Result<SharedHandle, ConnectionError> {
        let mut conns = self.conns.lock();

        if let Some(handle) = conns.get(path) {
            return Ok(Arc::clone(handle));
        }

        let conn = self
            .opener
            .open(path)
            .map_err(|e| ConnectionError::OpenFailed {
                path: path.display().to_string(),
                message: e.to_string(),
            })?;

        info!(path = %path.display(), "opened database handle");
        let handle = Arc::new(DbHandle::new(path.to_path_buf(), conn));
        conns.insert(path.to_path_buf(), Arc::clone(&handle));
        Ok(handle)
    }

    /// Close and evict every cached handle.
    ///
    /// Handles still borrowed by in-flight queries are evicted immediately
    /// and closed when their last user drops them.
    pub fn close_all(&self) {
        let mut conns = self.conns.lock();
        let count = conns.len();

        for (path, handle) in conns.drain() {
            match Arc::try_unwrap(handle) {
                Ok(handle) => {
                    if let Err((_, e)) = handle.conn.into_inner().close() {
                        warn!(path = %path.display(), error = %e, "failed to close database handle");
                    }
                }
                Err(_) => {
                    debug!(path = %path.display(), "handle still in use; closing on last release");
                }
            }
        }

        info!(count, "closed cached database handles");
    }

    pub fn len(&self) -> usize {
        self.conns.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for ConnectionManager {
    fn default() -> Self {
        Self::new(SqliteOpener::default())
    }
}
