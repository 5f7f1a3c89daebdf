//! Query descriptors and resource-path parsing.
//!
//! A resource path names a dataset (a SQLite file below the serve root), an
//! optional table and an optional projection. Parsing is behind the
//! `PathParser` trait so callers can plug in a richer grammar; the engine
//! only consumes the resulting `QueryDescriptor`.
//!
//! The free-text fragments of a descriptor (`where_clause`, `group_by`,
//! `having`, `order_by`, `sort_direction`, `limit`, `offset`) are embedded
//! into SQL as given. They are trusted input: whoever produces the
//! descriptor is responsible for them.

use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum PathError {
    #[error("Resource path is empty")]
    Empty,

    #[error("Invalid path '{path}': traversal sequences are not allowed")]
    Traversal { path: String },

    #[error("Malformed resource path '{path}': {message}")]
    Malformed { path: String, message: String },
}

/// Structured decode of a resource path.
///
/// Mutated in place by the engine when caller overrides (pagination, sort,
/// extra predicates) are applied.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryDescriptor {
    pub data_set_path: String,
    pub table: String,
    pub select: Vec<String>,
    pub where_clause: String,
    pub group_by: String,
    pub having: String,
    pub order_by: String,
    pub sort_direction: String,
    pub limit: String,
    pub offset: String,
}

/// Decodes a resource-path string into a descriptor.
pub trait PathParser: Send + Sync {
    fn parse(&self, raw: &str) -> Result<QueryDescriptor, PathError>;
}

/// Default parser for `/dir/file.db/table[start:end]/col1,col2` paths.
///
/// - The dataset part runs up to and including the first segment ending in a
///   database extension; without one, the whole path is the dataset.
/// - The next segment is the table, unless it contains a comma, in which
///   case it is the projection and the table is left for inference.
/// - A `[start:end]` suffix on the table sets offset and limit.
/// - A further segment is the projection.
#[derive(Debug, Clone)]
pub struct SegmentPathParser {
    extensions: Vec<String>,
}

impl SegmentPathParser {
    pub fn new(extensions: &[String]) -> Self {
        Self {
            extensions: extensions.iter().map(|e| e.to_ascii_lowercase()).collect(),
        }
    }

    fn is_database(&self, segment: &str) -> bool {
        let lower = segment.to_ascii_lowercase();
        self.extensions.iter().any(|ext| lower.ends_with(ext.as_str()))
    }
}

impl Default for SegmentPathParser {
    fn default() -> Self {
        Self::new(&crate::config::EngineConfig::default().database_extensions)
    }
}

fn slice_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| {
        Regex::new(r"^(?P<name>[^\[\]]+)\[(?P<start>\d*):(?P<end>\d*)\]$").expect("valid slice regex")
    })
}

fn split_columns(segment: &str) -> Vec<String> {
    segment
        .split(',')
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .map(String::from)
        .collect()
}

fn malformed(path: &str, message: impl Into<String>) -> PathError {
    PathError::Malformed {
        path: path.to_string(),
        message: message.into(),
    }
}

/// Applies a table segment, splitting off a `[start:end]` slice if present.
fn apply_table_segment(
    desc: &mut QueryDescriptor,
    segment: &str,
    raw: &str,
) -> Result<(), PathError> {
    if !segment.contains('[') {
        desc.table = segment.to_string();
        return Ok(());
    }

    let caps = slice_regex()
        .captures(segment)
        .ok_or_else(|| malformed(raw, format!("invalid slice in '{}'", segment)))?;
    desc.table = caps["name"].to_string();

    let parse = |s: &str| -> Result<Option<u64>, PathError> {
        if s.is_empty() {
            return Ok(None);
        }
        s.parse::<u64>()
            .map(Some)
            .map_err(|_| malformed(raw, format!("slice bound '{}' out of range", s)))
    };
    let start = parse(&caps["start"])?;
    let end = parse(&caps["end"])?;

    if let Some(start) = start {
        desc.offset = start.to_string();
    }
    if let Some(end) = end {
        let start = start.unwrap_or(0);
        if end < start {
            return Err(malformed(raw, "slice end precedes start"));
        }
        desc.limit = (end - start).to_string();
    }
    Ok(())
}

impl PathParser for SegmentPathParser {
    fn parse(&self, raw: &str) -> Result<QueryDescriptor, PathError> {
        let trimmed = raw.trim();
        if trimmed.contains('?') {
            return Err(malformed(raw, "query strings are not part of a resource path"));
        }

        let segments: Vec<&str> = trimmed.split('/').filter(|s| !s.is_empty()).collect();
        if segments.is_empty() {
            return Err(PathError::Empty);
        }

        let split = segments
            .iter()
            .position(|s| self.is_database(s))
            .map(|i| i + 1)
            .unwrap_or(segments.len());

        let mut desc = QueryDescriptor {
            data_set_path: segments[..split].join("/"),
            ..QueryDescriptor::default()
        };

        let mut rest = segments[split..].iter();
        if let Some(segment) = rest.next() {
            if segment.contains(',') {
                desc.select = split_columns(segment);
            } else {
                apply_table_segment(&mut desc, segment, raw)?;
            }
        }
        if let Some(segment) = rest.next() {
            if !desc.select.is_empty() {
                return Err(malformed(raw, "projection given twice"));
            }
            desc.select = split_columns(segment);
        }
        if let Some(extra) = rest.next() {
            return Err(malformed(raw, format!("unexpected segment '{}'", extra)));
        }

        Ok(desc)
    }
}
