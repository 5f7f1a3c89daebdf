//! Chunking and cancellation for streaming execution.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use crate::types::RowValues;

/// Cooperative cancellation for a stream.
///
/// Checked between chunks, never mid-scan: a cancelled stream may still
/// deliver the chunk it was building. Clones share the same flag.
#[derive(Debug, Clone, Default)]
pub struct Cancellation {
    flag: Arc<AtomicBool>,
    deadline: Option<Instant>,
}

impl Cancellation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_deadline(deadline: Instant) -> Self {
        Self {
            flag: Arc::default(),
            deadline: Some(deadline),
        }
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        Self::with_deadline(Instant::now() + timeout)
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst) || self.deadline.is_some_and(|d| Instant::now() >= d)
    }
}

/// Buffers rows and decides when a chunk is due.
///
/// A chunk is due when the buffer reaches `batch_size` rows or when more
/// than `flush_interval` has passed since the previous emission, so slow
/// queries still show progress.
#[derive(Debug)]
pub struct ChunkBatcher {
    buffer: Vec<RowValues>,
    batch_size: usize,
    flush_interval: Duration,
    last_emit: Instant,
}

impl ChunkBatcher {
    pub fn new(batch_size: usize, flush_interval: Duration) -> Self {
        let batch_size = batch_size.max(1);
        Self {
            buffer: Vec::with_capacity(batch_size),
            batch_size,
            flush_interval,
            last_emit: Instant::now(),
        }
    }

    /// Buffer a row; returns the chunk to emit if one is due.
    pub fn push(&mut self, row: RowValues) -> Option<Vec<RowValues>> {
        self.buffer.push(row);
        if self.buffer.len() >= self.batch_size || self.last_emit.elapsed() > self.flush_interval {
            Some(self.take())
        } else {
            None
        }
    }

    /// Take whatever is buffered, if anything.
    pub fn flush(&mut self) -> Option<Vec<RowValues>> {
        if self.buffer.is_empty() {
            None
        } else {
            Some(self.take())
        }
    }

    fn take(&mut self) -> Vec<RowValues> {
        self.last_emit = Instant::now();
        std::mem::replace(&mut self.buffer, Vec::with_capacity(self.batch_size))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use serde_json::json;
    use std::thread;

    const NEVER: Duration = Duration::from_secs(3600);

    #[rstest]
    #[case(7, 3, vec![3, 3, 1])]
    #[case(6, 3, vec![3, 3])]
    #[case(2, 5, vec![2])]
    #[case(0, 5, vec![])]
    fn test_size_based_chunks(
        #[case] rows: usize,
        #[case] batch: usize,
        #[case] expected: Vec<usize>,
    ) {
        let mut batcher = ChunkBatcher::new(batch, NEVER);
        let mut sizes = Vec::new();
        for i in 0..rows {
            if let Some(chunk) = batcher.push(vec![json!(i)]) {
                sizes.push(chunk.len());
            }
        }
        if let Some(chunk) = batcher.flush() {
            sizes.push(chunk.len());
        }
        assert_eq!(sizes, expected);
    }

    #[rstest]
    fn test_time_based_flush() {
        let mut batcher = ChunkBatcher::new(1000, Duration::from_millis(1));
        thread::sleep(Duration::from_millis(10));
        let chunk = batcher.push(vec![json!(1)]).expect("interval elapsed");
        assert_eq!(chunk.len(), 1);
    }

    #[rstest]
    fn test_zero_batch_size_treated_as_one() {
        let mut batcher = ChunkBatcher::new(0, NEVER);
        assert_eq!(batcher.push(vec![json!(1)]).map(|c| c.len()), Some(1));
    }

    #[rstest]
    fn test_cancellation_shared_between_clones() {
        let cancel = Cancellation::new();
        let clone = cancel.clone();
        assert!(!clone.is_cancelled());
        cancel.cancel();
        assert!(clone.is_cancelled());
    }

    #[rstest]
    fn test_expired_deadline_cancels() {
        let cancel = Cancellation::with_deadline(Instant::now());
        assert!(cancel.is_cancelled());
        assert!(!Cancellation::with_timeout(NEVER).is_cancelled());
    }
}
