//! Shared request and result types for the query engine.

mod results;

use serde::{Deserialize, Serialize};

pub use results::{EntryKind, FileEntry, QueryResult, QueryResultChunk, RowValues, StreamStats, TableInfo};

/// Caller-supplied request for `Engine::query` / `Engine::query_stream`.
///
/// `filter_where` is an ad hoc SQL fragment embedded verbatim; it is trusted
/// input. `filter_model_json` is a grid filter model and is translated with
/// validation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct QueryOptions {
    /// Resource path decoded by the engine's path parser.
    pub resource_path: String,
    pub filter_where: String,
    pub filter_model_json: String,
    pub sort_col: String,
    pub sort_dir: String,
    pub offset: u64,
    pub limit: u64,
    /// With `allow_override` and no positive `limit`, fetch columns and
    /// count only.
    pub force_zero_limit: bool,
    /// Let `limit`/`offset`/`force_zero_limit` replace the pagination
    /// carried by the resource path.
    pub allow_override: bool,
    /// Skip the `COUNT(*)` query; `total_count` is then -1.
    pub skip_total_count: bool,
}

impl QueryOptions {
    pub fn new(resource_path: impl Into<String>) -> Self {
        Self {
            resource_path: resource_path.into(),
            ..Self::default()
        }
    }

    /// Override pagination with an explicit page.
    pub fn with_page(mut self, offset: u64, limit: u64) -> Self {
        self.allow_override = true;
        self.offset = offset;
        self.limit = limit;
        self
    }

    pub fn with_sort(mut self, column: impl Into<String>, direction: impl Into<String>) -> Self {
        self.sort_col = column.into();
        self.sort_dir = direction.into();
        self
    }

    pub fn with_filter_model(mut self, json: impl Into<String>) -> Self {
        self.filter_model_json = json.into();
        self
    }

    pub fn with_where(mut self, fragment: impl Into<String>) -> Self {
        self.filter_where = fragment.into();
        self
    }
}
