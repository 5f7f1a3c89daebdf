//! Query execution over the files below a serve root.
//!
//! The engine exposes four operations: [`Engine::list_files`],
//! [`Engine::list_tables`], [`Engine::query`] and [`Engine::query_stream`].
//! A query goes through the same preparation in both modes:
//!
//! 1. decode the resource path into a [`QueryDescriptor`];
//! 2. apply caller overrides (pagination, sort, extra predicates);
//! 3. resolve the dataset below the serve root and fetch its cached handle;
//! 4. infer the table when the descriptor names none;
//! 5. compose the SQL;
//! 6. count matching rows unless skipped;
//! 7. execute, then either collect every row or stream them in chunks.
//!
//! Each call is independent and may run on its own thread; the only shared
//! state is the connection cache. The engine is transport-agnostic: callers
//! own presentation.

mod rows;
mod stream;

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use rusqlite::Connection;
use tracing::{debug, warn};

use crate::backend::QueryParams;
use crate::config::EngineConfig;
use crate::connection::{ConnectionError, ConnectionManager, SharedHandle};
use crate::descriptor::{PathError, PathParser, QueryDescriptor, SegmentPathParser};
use crate::error::EngineError;
use crate::filter::build_where_clause;
use crate::query_builders::{combine_predicates, QueryComposer};
use crate::types::{
    EntryKind, FileEntry, QueryOptions, QueryResult, QueryResultChunk, RowValues, StreamStats,
    TableInfo,
};

pub use rows::{cell_value, column_names, decode_row};
pub use stream::{Cancellation, ChunkBatcher};

const LIST_TABLES_SQL: &str = "SELECT name, type FROM sqlite_master \
     WHERE type IN ('table', 'view') AND name NOT LIKE 'sqlite\\_%' ESCAPE '\\' \
     ORDER BY name";

/// Apply caller overrides to a freshly parsed descriptor.
///
/// Returns the bound parameters introduced by the grid filter. The grid
/// filter is always the last conjunct of the resulting predicate, so its
/// parameters are the only ones the statement needs.
pub fn apply_overrides(
    desc: &mut QueryDescriptor,
    opts: &QueryOptions,
) -> Result<QueryParams, EngineError> {
    if opts.allow_override {
        if opts.limit > 0 {
            desc.limit = opts.limit.to_string();
            desc.offset = opts.offset.to_string();
        } else if opts.force_zero_limit {
            desc.limit = "0".to_string();
            desc.offset = opts.offset.to_string();
        }
    }

    if !opts.sort_col.is_empty() {
        desc.order_by = opts.sort_col.clone();
        if !opts.sort_dir.is_empty() {
            desc.sort_direction = opts.sort_dir.clone();
        }
    }

    let mut extra = opts.filter_where.clone();
    let mut params = QueryParams::new();
    if !opts.filter_model_json.is_empty() {
        let clause = build_where_clause(&opts.filter_model_json)?;
        if !clause.is_empty() {
            debug!(filter = %clause.inline, "grid filter translated");
            extra = combine_predicates(&extra, &clause.sql);
            params = clause.params;
        }
    }
    desc.where_clause = combine_predicates(&desc.where_clause, &extra);

    Ok(params)
}

/// Pick the table to query from the tables and views of a database.
///
/// Exactly one candidate is selected; none, or more than one, is an error
/// (the latter lists every candidate rather than guessing).
pub fn resolve_table(path: &str, candidates: Vec<String>) -> Result<String, EngineError> {
    match candidates.len() {
        0 => Err(EngineError::NoTables {
            path: path.to_string(),
        }),
        1 => Ok(candidates.into_iter().next().unwrap_or_default()),
        _ => Err(EngineError::AmbiguousTable { candidates }),
    }
}

/// Trim a caller-relative path and reject traversal sequences.
fn relative_path(raw: &str) -> Result<&str, PathError> {
    let rel = raw.trim().trim_start_matches('/');
    if rel.contains("..") {
        return Err(PathError::Traversal {
            path: raw.to_string(),
        });
    }
    Ok(rel)
}

fn query_tables(conn: &Connection) -> rusqlite::Result<Vec<TableInfo>> {
    let mut stmt = conn.prepare(LIST_TABLES_SQL)?;
    let rows = stmt.query_map([], |row| {
        Ok(TableInfo {
            name: row.get(0)?,
            kind: row.get(1)?,
        })
    })?;

    let mut tables = Vec::new();
    for row in rows {
        match row {
            Ok(table) => tables.push(table),
            Err(e) => warn!(error = %e, "skipping unreadable sqlite_master row"),
        }
    }
    Ok(tables)
}

/// Everything needed to execute one request.
struct PreparedQuery {
    handle: SharedHandle,
    sql: String,
    count_sql: String,
    params: QueryParams,
}

impl PreparedQuery {
    /// Count rows matching the predicate, before pagination. Failure is
    /// logged and reported as -1.
    fn total_count(&self, conn: &Connection, skip: bool) -> i64 {
        if skip {
            debug!("total count skipped");
            return -1;
        }
        let started = Instant::now();
        let counted = conn.query_row(&self.count_sql, self.params.as_sql(), |row| {
            row.get::<_, i64>(0)
        });
        match counted {
            Ok(count) => {
                debug!(count, elapsed_ms = started.elapsed().as_millis() as u64, "total count");
                count
            }
            Err(e) => {
                warn!(sql = %self.count_sql, error = %e, "total count failed");
                -1
            }
        }
    }
}

fn deliver<F>(batch: Vec<RowValues>, stats: &mut StreamStats, on_chunk: &mut F)
where
    F: FnMut(QueryResultChunk),
{
    stats.rows += batch.len();
    stats.chunks += 1;
    on_chunk(QueryResultChunk::rows(batch));
}

/// The query engine.
pub struct Engine {
    config: EngineConfig,
    parser: Box<dyn PathParser>,
    composer: QueryComposer,
    connections: Arc<ConnectionManager>,
}

impl Engine {
    /// Engine with the default path parser and SQLite opener.
    pub fn new(config: EngineConfig) -> Self {
        let parser = SegmentPathParser::new(&config.database_extensions);
        let connections = Arc::new(ConnectionManager::from_config(&config));
        Self::with_parts(config, Box::new(parser), connections)
    }

    /// Engine with an injected parser and connection cache.
    pub fn with_parts(
        config: EngineConfig,
        parser: Box<dyn PathParser>,
        connections: Arc<ConnectionManager>,
    ) -> Self {
        let composer = QueryComposer::new(&config.default_table);
        Self {
            config,
            parser,
            composer,
            connections,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn connections(&self) -> &Arc<ConnectionManager> {
        &self.connections
    }

    /// Close every cached connection. Used at shutdown.
    pub fn close_all(&self) {
        self.connections.close_all();
    }

    /// List sub-directories and database files of a directory below the
    /// serve root, sorted by name. Dot-files are skipped.
    pub fn list_files(&self, dir: &str) -> Result<Vec<FileEntry>, EngineError> {
        let target = self.config.serve_folder.join(relative_path(dir)?);
        let entries = fs::read_dir(&target).map_err(|source| EngineError::Io {
            path: target.display().to_string(),
            source,
        })?;

        let mut files = Vec::new();
        for entry in entries {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    warn!(dir = %target.display(), error = %e, "skipping unreadable entry");
                    continue;
                }
            };
            let name = entry.file_name().to_string_lossy().into_owned();
            if name.starts_with('.') {
                continue;
            }
            if entry.path().is_dir() {
                files.push(FileEntry {
                    name,
                    kind: EntryKind::Directory,
                });
            } else if self.config.is_database_file(&name) {
                files.push(FileEntry {
                    name,
                    kind: EntryKind::Database,
                });
            }
        }

        files.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(files)
    }

    /// List the tables and views of a database below the serve root.
    pub fn list_tables(&self, db_path: &str) -> Result<Vec<TableInfo>, EngineError> {
        let handle = self.open_dataset(db_path)?;
        let conn = handle.lock();
        query_tables(&conn).map_err(|e| EngineError::query_failed(LIST_TABLES_SQL, e))
    }

    /// Resolve a dataset path to its canonical file and cached handle.
    fn open_dataset(&self, data_set_path: &str) -> Result<SharedHandle, EngineError> {
        let rel = relative_path(data_set_path)?;
        if rel.is_empty() {
            return Err(PathError::Empty.into());
        }

        let joined: PathBuf = self.config.serve_folder.join(rel);
        let canonical = fs::canonicalize(&joined).map_err(|e| ConnectionError::OpenFailed {
            path: joined.display().to_string(),
            message: e.to_string(),
        })?;

        Ok(self.connections.get(&canonical)?)
    }

    fn prepare(&self, opts: &QueryOptions) -> Result<PreparedQuery, EngineError> {
        let started = Instant::now();

        let mut desc = self.parser.parse(&opts.resource_path)?;
        let params = apply_overrides(&mut desc, opts)?;
        debug!(
            path = %opts.resource_path,
            elapsed_us = started.elapsed().as_micros() as u64,
            "descriptor resolved"
        );

        let handle = self.open_dataset(&desc.data_set_path)?;

        if desc.table.is_empty() {
            let tables = query_tables(&handle.lock())
                .map_err(|e| EngineError::query_failed(LIST_TABLES_SQL, e))?;
            let names = tables.into_iter().map(|t| t.name).collect();
            desc.table = resolve_table(&desc.data_set_path, names)?;
            debug!(table = %desc.table, "table inferred");
        }

        let sql = self.composer.compose(&desc);
        let count_sql = self.composer.compose_count(&desc);
        debug!(
            sql = %sql,
            params = params.len(),
            elapsed_us = started.elapsed().as_micros() as u64,
            "query prepared"
        );

        Ok(PreparedQuery {
            handle,
            sql,
            count_sql,
            params,
        })
    }

    /// Execute a query and collect every row.
    pub fn query(&self, opts: &QueryOptions) -> Result<QueryResult, EngineError> {
        let started = Instant::now();
        let prepared = self.prepare(opts)?;
        let conn = prepared.handle.lock();

        let total_count = prepared.total_count(&conn, opts.skip_total_count);

        let mut stmt = conn
            .prepare(&prepared.sql)
            .map_err(|e| EngineError::query_failed(&prepared.sql, e))?;
        let columns = column_names(&stmt);
        let width = columns.len();
        let mut rows = stmt
            .query(prepared.params.as_sql())
            .map_err(|e| EngineError::query_failed(&prepared.sql, e))?;

        let mut values = Vec::new();
        let mut skipped = 0usize;
        loop {
            match rows.next() {
                Ok(Some(row)) => match decode_row(row, width) {
                    Ok(row) => values.push(row),
                    Err(e) => {
                        skipped += 1;
                        warn!(error = %e, "skipping undecodable row");
                    }
                },
                Ok(None) => break,
                Err(e) => return Err(EngineError::query_failed(&prepared.sql, e)),
            }
        }

        debug!(
            rows = values.len(),
            skipped,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "query finished"
        );

        Ok(QueryResult {
            columns,
            rows: values,
            total_count,
            sql: prepared.sql.clone(),
            error: None,
        })
    }

    /// Execute a query and deliver rows incrementally.
    ///
    /// See [`Engine::query_stream_with`].
    pub fn query_stream<F>(
        &self,
        opts: &QueryOptions,
        on_chunk: F,
    ) -> Result<StreamStats, EngineError>
    where
        F: FnMut(QueryResultChunk),
    {
        self.query_stream_with(opts, &Cancellation::new(), on_chunk)
    }

    /// Execute a query and deliver rows incrementally through `on_chunk`.
    ///
    /// The first chunk carries columns, total count and SQL and no rows.
    /// Data chunks follow whenever `stream_batch_size` rows are buffered or
    /// `stream_flush_interval_ms` has passed since the previous emission;
    /// leftovers are flushed at the end. Rows whose cells cannot be decoded
    /// are skipped.
    ///
    /// Preparation and execution errors are returned before any chunk. If
    /// stepping fails mid-stream, buffered rows are flushed, a chunk with
    /// `error` set is emitted and the error is returned; earlier chunks stay
    /// valid. `cancel` is checked before execution and after each data
    /// chunk.
    ///
    /// `on_chunk` runs while the database's handle is held, so it must not
    /// query the same database through this engine.
    pub fn query_stream_with<F>(
        &self,
        opts: &QueryOptions,
        cancel: &Cancellation,
        mut on_chunk: F,
    ) -> Result<StreamStats, EngineError>
    where
        F: FnMut(QueryResultChunk),
    {
        let started = Instant::now();
        let prepared = self.prepare(opts)?;
        let conn = prepared.handle.lock();

        let total_count = prepared.total_count(&conn, opts.skip_total_count);
        if cancel.is_cancelled() {
            return Err(EngineError::Cancelled);
        }

        let mut stmt = conn
            .prepare(&prepared.sql)
            .map_err(|e| EngineError::query_failed(&prepared.sql, e))?;
        let columns = column_names(&stmt);
        let width = columns.len();
        let mut rows = stmt
            .query(prepared.params.as_sql())
            .map_err(|e| EngineError::query_failed(&prepared.sql, e))?;

        // Step once before announcing the stream so execution errors
        // surface ahead of any chunk.
        let mut pending = rows
            .next()
            .map_err(|e| EngineError::query_failed(&prepared.sql, e))?
            .map(|row| decode_row(row, width));

        on_chunk(QueryResultChunk::metadata(columns, total_count, prepared.sql.clone()));

        let mut stats = StreamStats::default();
        let mut batcher =
            ChunkBatcher::new(self.config.stream_batch_size, self.config.flush_interval());

        loop {
            let decoded = match pending.take() {
                Some(decoded) => decoded,
                None => match rows.next() {
                    Ok(Some(row)) => decode_row(row, width),
                    Ok(None) => break,
                    Err(e) => {
                        let err = EngineError::query_failed(&prepared.sql, e);
                        if let Some(batch) = batcher.flush() {
                            deliver(batch, &mut stats, &mut on_chunk);
                        }
                        on_chunk(QueryResultChunk::failure(err.to_string()));
                        return Err(err);
                    }
                },
            };

            match decoded {
                Ok(row) => {
                    if let Some(batch) = batcher.push(row) {
                        deliver(batch, &mut stats, &mut on_chunk);
                        if cancel.is_cancelled() {
                            debug!(rows = stats.rows, "stream cancelled");
                            return Err(EngineError::Cancelled);
                        }
                    }
                }
                Err(e) => {
                    stats.skipped_rows += 1;
                    warn!(error = %e, "skipping undecodable row");
                }
            }
        }

        if let Some(batch) = batcher.flush() {
            deliver(batch, &mut stats, &mut on_chunk);
        }

        debug!(
            rows = stats.rows,
            chunks = stats.chunks,
            skipped = stats.skipped_rows,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "stream finished"
        );
        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::ValueType;
    use crate::test_utils::{people_root, TestRoot};
    use rstest::{fixture, rstest};
    use serde_json::json;

    #[fixture]
    fn people() -> TestRoot {
        people_root()
    }

    fn names(result: &QueryResult) -> Vec<String> {
        result
            .rows
            .iter()
            .map(|row| row[0].as_str().unwrap_or_default().to_string())
            .collect()
    }

    // =========================================================================
    // Overrides
    // =========================================================================

    #[rstest]
    fn test_override_limit_replaces_pagination() {
        let mut desc = QueryDescriptor {
            limit: "100".into(),
            offset: "7".into(),
            ..QueryDescriptor::default()
        };
        apply_overrides(&mut desc, &QueryOptions::new("/x.db").with_page(20, 10)).unwrap();
        assert_eq!(desc.limit, "10");
        assert_eq!(desc.offset, "20");
    }

    #[rstest]
    fn test_override_ignored_without_allow_flag() {
        let mut desc = QueryDescriptor {
            limit: "100".into(),
            ..QueryDescriptor::default()
        };
        let opts = QueryOptions {
            limit: 5,
            ..QueryOptions::new("/x.db")
        };
        apply_overrides(&mut desc, &opts).unwrap();
        assert_eq!(desc.limit, "100");
    }

    #[rstest]
    fn test_force_zero_limit_keeps_offset() {
        let mut desc = QueryDescriptor::default();
        let opts = QueryOptions {
            allow_override: true,
            force_zero_limit: true,
            offset: 3,
            ..QueryOptions::new("/x.db")
        };
        apply_overrides(&mut desc, &opts).unwrap();
        assert_eq!(desc.limit, "0");
        assert_eq!(desc.offset, "3");
    }

    #[rstest]
    fn test_sort_override_keeps_direction_when_unset() {
        let mut desc = QueryDescriptor {
            order_by: "name".into(),
            sort_direction: "DESC".into(),
            ..QueryDescriptor::default()
        };
        apply_overrides(&mut desc, &QueryOptions::new("/x.db").with_sort("age", "")).unwrap();
        assert_eq!(desc.order_by, "age");
        assert_eq!(desc.sort_direction, "DESC");
    }

    #[rstest]
    fn test_predicate_combination_order() {
        let mut desc = QueryDescriptor {
            where_clause: "active = 1".into(),
            ..QueryDescriptor::default()
        };
        let opts = QueryOptions::new("/x.db")
            .with_where("city = 'Paris'")
            .with_filter_model(r#"{"age": {"filterType": "number", "type": "greaterThan", "filter": 30}}"#);
        let params = apply_overrides(&mut desc, &opts).unwrap();
        assert_eq!(
            desc.where_clause,
            r#"(active = 1) AND ((city = 'Paris') AND (("age" > ?)))"#
        );
        assert_eq!(params.params(), &[ValueType::Int(30)]);
    }

    #[rstest]
    fn test_grid_filter_alone_becomes_where() {
        let mut desc = QueryDescriptor::default();
        let opts = QueryOptions::new("/x.db").with_filter_model(
            r#"{"name": {"filterType": "text", "type": "equals", "filter": "Eve"}}"#,
        );
        let params = apply_overrides(&mut desc, &opts).unwrap();
        assert_eq!(desc.where_clause, r#"("name" = 'Eve')"#);
        assert!(params.is_empty());
    }

    #[rstest]
    fn test_bad_filter_is_input_error() {
        let mut desc = QueryDescriptor::default();
        let opts = QueryOptions::new("/x.db").with_filter_model("{oops");
        let err = apply_overrides(&mut desc, &opts).unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::Input);
    }

    // =========================================================================
    // Table resolution
    // =========================================================================

    #[rstest]
    fn test_resolve_single_table() {
        assert_eq!(resolve_table("a.db", vec!["only".into()]).unwrap(), "only");
    }

    #[rstest]
    fn test_resolve_no_tables() {
        assert!(matches!(
            resolve_table("a.db", vec![]),
            Err(EngineError::NoTables { .. })
        ));
    }

    #[rstest]
    fn test_resolve_ambiguous_lists_all() {
        let err = resolve_table("a.db", vec!["t1".into(), "t2".into(), "v1".into()]).unwrap_err();
        assert_eq!(err.to_string(), "Table name required. Available tables: t1, t2, v1");
    }

    #[rstest]
    #[case("../secret.db")]
    #[case("/data/../../etc")]
    #[case("a/..")]
    fn test_traversal_rejected(#[case] path: &str) {
        assert!(matches!(relative_path(path), Err(PathError::Traversal { .. })));
    }

    #[rstest]
    fn test_relative_path_trims_leading_slash() {
        assert_eq!(relative_path("  /dir/a.db ").unwrap(), "dir/a.db");
    }

    // =========================================================================
    // Execution
    // =========================================================================

    #[rstest]
    fn test_query_number_filter(people: TestRoot) {
        let opts = QueryOptions::new("/people.db/people").with_filter_model(
            r#"{"age": {"filterType": "number", "type": "greaterThan", "filter": 30}}"#,
        );
        let result = people.engine().query(&opts).unwrap();
        let mut found = names(&result);
        found.sort();
        assert_eq!(found, vec!["Charlie", "Eve"]);
        assert_eq!(result.total_count, 2);
        assert!(result.sql.contains(r#"WHERE ("age" > ?)"#));
    }

    #[rstest]
    #[case("asc", "Bob")]
    #[case("desc", "Eve")]
    fn test_query_sort(people: TestRoot, #[case] direction: &str, #[case] first: &str) {
        let opts = QueryOptions::new("/people.db/people").with_sort("age", direction);
        let result = people.engine().query(&opts).unwrap();
        assert_eq!(names(&result)[0], first);
    }

    #[rstest]
    fn test_query_page(people: TestRoot) {
        people.create_db(
            "five.db",
            "CREATE TABLE p (name TEXT);
             INSERT INTO p VALUES ('e'), ('c'), ('a'), ('d'), ('b');",
        );
        let opts = QueryOptions::new("/five.db/p")
            .with_sort("name", "asc")
            .with_page(1, 2);
        let result = people.engine().query(&opts).unwrap();
        assert_eq!(names(&result), vec!["b", "c"]);
        assert_eq!(result.total_count, 5);
    }

    #[rstest]
    fn test_query_infers_single_table(people: TestRoot) {
        let result = people.engine().query(&QueryOptions::new("/people.db")).unwrap();
        assert_eq!(result.columns, vec!["name", "age"]);
        assert_eq!(result.rows.len(), 4);
        assert_eq!(result.sql, r#"SELECT * FROM "people""#);
    }

    #[rstest]
    fn test_query_skip_total_count(people: TestRoot) {
        let opts = QueryOptions {
            skip_total_count: true,
            ..QueryOptions::new("/people.db/people")
        };
        assert_eq!(people.engine().query(&opts).unwrap().total_count, -1);
    }

    #[rstest]
    fn test_force_zero_limit_returns_columns_and_count(people: TestRoot) {
        let opts = QueryOptions {
            allow_override: true,
            force_zero_limit: true,
            ..QueryOptions::new("/people.db/people")
        };
        let result = people.engine().query(&opts).unwrap();
        assert!(result.rows.is_empty());
        assert_eq!(result.columns, vec!["name", "age"]);
        assert_eq!(result.total_count, 4);
    }

    #[rstest]
    fn test_query_unknown_table_is_query_error(people: TestRoot) {
        let err = people
            .engine()
            .query(&QueryOptions::new("/people.db/nope"))
            .unwrap_err();
        match err {
            EngineError::QueryFailed { sql, .. } => assert_eq!(sql, r#"SELECT * FROM "nope""#),
            other => panic!("expected QueryFailed, got {:?}", other),
        }
    }

    #[rstest]
    fn test_query_missing_database_is_connection_error(people: TestRoot) {
        let err = people
            .engine()
            .query(&QueryOptions::new("/absent.db/t"))
            .unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::Connection);
    }

    #[rstest]
    fn test_stream_matches_batch(people: TestRoot) {
        let engine = people.engine();
        let opts = QueryOptions::new("/people.db/people").with_sort("name", "asc");
        let batch = engine.query(&opts).unwrap();

        let mut chunks = Vec::new();
        let stats = engine.query_stream(&opts, |chunk| chunks.push(chunk)).unwrap();

        assert!(chunks[0].is_metadata());
        assert!(chunks[0].values.is_empty());
        assert_eq!(chunks[0].total_count, Some(4));
        let streamed: Vec<RowValues> = chunks[1..].iter().flat_map(|c| c.values.clone()).collect();
        assert_eq!(streamed, batch.rows);
        assert_eq!(stats.rows, 4);
        assert_eq!(streamed[0], vec![json!("Alice"), json!(30)]);
    }

    #[rstest]
    fn test_stream_cancelled_before_execution(people: TestRoot) {
        let cancel = Cancellation::new();
        cancel.cancel();
        let mut chunks = 0;
        let result = people.engine().query_stream_with(
            &QueryOptions::new("/people.db/people"),
            &cancel,
            |_| chunks += 1,
        );
        assert!(matches!(result, Err(EngineError::Cancelled)));
        assert_eq!(chunks, 0);
    }
}
