use std::error::Error;
use std::time::Duration;

use serde::Serialize;
use tracing::{debug, warn};

use super::StreamCmd;
use crate::commands::Execute;
use db::{
    Cancellation, Engine, EngineConfig, EngineError, QueryOptions, QueryResultChunk, StreamStats,
};

/// Result of the stream command execution
#[derive(Debug, Default, Serialize)]
pub struct StreamResult {
    pub chunks: Vec<QueryResultChunk>,
    pub stats: StreamStats,
}

impl StreamResult {
    /// The metadata chunk, which always comes first.
    pub fn metadata(&self) -> Option<&QueryResultChunk> {
        self.chunks.first().filter(|c| c.is_metadata())
    }

    /// Why the stream stopped early, if it did.
    pub fn error(&self) -> Option<&str> {
        self.chunks.last().and_then(|c| c.error.as_deref())
    }
}

/// Run a stream and keep every chunk it delivers.
///
/// Errors raised before the metadata chunk are returned as is. Once chunks
/// have been delivered, a cancellation or step failure ends the stream
/// without discarding them: the result ends with a chunk carrying the error.
pub fn collect_stream<F>(
    engine: &Engine,
    opts: &QueryOptions,
    cancel: &Cancellation,
    mut observe: F,
) -> Result<StreamResult, EngineError>
where
    F: FnMut(&QueryResultChunk),
{
    let mut chunks = Vec::new();
    let outcome = engine.query_stream_with(opts, cancel, |chunk| {
        debug!(rows = chunk.values.len(), "chunk received");
        observe(&chunk);
        chunks.push(chunk);
    });

    let stats = match outcome {
        Ok(stats) => stats,
        Err(err) if chunks.is_empty() => return Err(err),
        Err(err) => {
            if chunks.last().is_none_or(|c| c.error.is_none()) {
                chunks.push(QueryResultChunk {
                    error: Some(err.to_string()),
                    ..QueryResultChunk::default()
                });
            }
            let data = chunks
                .iter()
                .filter(|c| !c.is_metadata() && c.error.is_none());
            let stats = StreamStats {
                rows: data.clone().map(|c| c.values.len()).sum(),
                chunks: data.count(),
                skipped_rows: 0,
            };
            warn!(error = %err, rows = stats.rows, "stream stopped early");
            stats
        }
    };

    Ok(StreamResult { chunks, stats })
}

impl Execute for StreamCmd {
    type Output = StreamResult;

    fn execute(self, config: &EngineConfig) -> Result<Self::Output, Box<dyn Error>> {
        let mut config = config.clone();
        if let Some(batch_size) = self.batch_size {
            config.stream_batch_size = batch_size as usize;
        }
        let cancel = match self.timeout_ms {
            Some(ms) => Cancellation::with_timeout(Duration::from_millis(ms)),
            None => Cancellation::new(),
        };

        let engine = Engine::new(config);
        Ok(collect_stream(&engine, &self.query.to_options(), &cancel, |_| {})?)
    }
}
