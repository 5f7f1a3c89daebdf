use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One result row, cells in column order.
pub type RowValues = Vec<Value>;

/// Fully materialized query result.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryResult {
    pub columns: Vec<String>,
    pub rows: Vec<RowValues>,
    /// Rows matching the predicate before pagination, or -1 when skipped or
    /// when counting failed.
    pub total_count: i64,
    /// The executed statement; numeric filter values appear as `?`.
    pub sql: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// One streaming emission.
///
/// The first chunk of a stream carries `columns`, `total_count` and `sql`
/// and no rows; later chunks carry rows only. A chunk with `error` set is
/// the last one.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryResultChunk {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub columns: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_count: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sql: Option<String>,
    pub values: Vec<RowValues>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl QueryResultChunk {
    pub(crate) fn metadata(columns: Vec<String>, total_count: i64, sql: String) -> Self {
        Self {
            columns: Some(columns),
            total_count: Some(total_count),
            sql: Some(sql),
            ..Self::default()
        }
    }

    pub(crate) fn rows(values: Vec<RowValues>) -> Self {
        Self {
            values,
            ..Self::default()
        }
    }

    pub(crate) fn failure(message: String) -> Self {
        Self {
            error: Some(message),
            ..Self::default()
        }
    }

    pub fn is_metadata(&self) -> bool {
        self.columns.is_some()
    }
}

/// Totals reported when a stream finishes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamStats {
    /// Rows delivered across all data chunks.
    pub rows: usize,
    /// Data chunks delivered, excluding the metadata chunk.
    pub chunks: usize,
    /// Rows dropped because a cell could not be decoded.
    pub skipped_rows: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    Directory,
    Database,
}

/// A browsable entry below the serve root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileEntry {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: EntryKind,
}

/// A table or view inside a database.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableInfo {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
}
