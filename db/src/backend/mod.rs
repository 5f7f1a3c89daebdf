//! Backend abstraction layer for SQLite access.
//!
//! This module holds the two seams between the query core and the driver:
//! positional bound parameters that travel alongside generated SQL, and the
//! `ConnectionOpener` trait used by the connection cache to create physical
//! handles.

use std::path::Path;

use rusqlite::types::ToSqlOutput;
use rusqlite::{Connection, ToSql};

pub mod sqlite;

pub use sqlite::SqliteOpener;

/// Values bound to `?` placeholders.
///
/// Only numbers are bound; text filter values are quoted inline.
#[derive(Clone, Debug, PartialEq)]
pub enum ValueType {
    /// Integer value
    Int(i64),
    /// Float value
    Float(f64),
}

impl ValueType {
    /// Render the value as a SQL literal, as shown in the inline form of a
    /// filter. Floats use fixed-point formatting with six fractional digits.
    pub fn to_literal(&self) -> String {
        match self {
            ValueType::Int(i) => i.to_string(),
            ValueType::Float(f) => format!("{:.6}", f),
        }
    }
}

impl ToSql for ValueType {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(match self {
            ValueType::Int(i) => ToSqlOutput::from(*i),
            ValueType::Float(f) => ToSqlOutput::from(*f),
        })
    }
}

/// Container for positional query parameters.
///
/// Values are bound to `?` placeholders in the order they were inserted,
/// so builders must push them in the same order they emit placeholders.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct QueryParams {
    params: Vec<ValueType>,
}

impl QueryParams {
    /// Creates a new empty parameter container.
    pub fn new() -> Self {
        Self { params: Vec::new() }
    }

    pub fn push(&mut self, value: ValueType) {
        self.params.push(value);
    }

    /// Appends every parameter of `other`, preserving order.
    pub fn extend(&mut self, other: QueryParams) {
        self.params.extend(other.params);
    }

    /// Returns the parameters in placeholder order.
    pub fn params(&self) -> &[ValueType] {
        &self.params
    }

    pub fn len(&self) -> usize {
        self.params.len()
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    /// Adapter for `rusqlite` statement execution.
    pub fn as_sql(&self) -> impl rusqlite::Params + '_ {
        rusqlite::params_from_iter(self.params.iter())
    }
}

/// Opens physical SQLite handles for the connection cache.
///
/// Implementations apply whatever per-handle pragmas they need exactly once,
/// at open time. All implementations must be thread-safe (Send + Sync).
pub trait ConnectionOpener: Send + Sync {
    /// Opens a new handle to the database file at `path`.
    fn open(&self, path: &Path) -> rusqlite::Result<Connection>;
}
