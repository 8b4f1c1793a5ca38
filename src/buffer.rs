//! Per-severity buffering of log records between flush cycles.
use crate::types::{BufferedRecord, Severity};
use std::mem;
use std::sync::Mutex;

/// The six per-severity record queues.
///
/// Exactly one queue instance is live per severity at any instant. Ingestion
/// appends under a short-lived lock; the flush path swaps the whole vector
/// for a fresh one in a single step, so records arriving while a batch is
/// being written land in the next cycle, never in the one in flight.
pub struct LevelBuffers {
    queues: [Mutex<Vec<BufferedRecord>>; 6],
    capacity: usize,
}

impl LevelBuffers {
    pub fn new(capacity: usize) -> Self {
        Self {
            queues: std::array::from_fn(|_| Mutex::new(Vec::with_capacity(capacity))),
            capacity,
        }
    }

    /// Appends a record to its severity's queue.
    ///
    /// Never blocks on I/O and never fails: a poisoned lock drops the record
    /// instead of panicking inside the host's emit path.
    pub fn push(&self, severity: Severity, record: BufferedRecord) {
        if let Ok(mut queue) = self.queues[severity.index()].lock() {
            queue.push(record);
        }
    }

    /// Takes everything buffered for one severity, leaving a fresh queue.
    pub fn take(&self, severity: Severity) -> Vec<BufferedRecord> {
        match self.queues[severity.index()].lock() {
            Ok(mut queue) => mem::replace(&mut *queue, Vec::with_capacity(self.capacity)),
            Err(_) => Vec::new(),
        }
    }

    /// Number of records currently buffered for one severity.
    pub fn len(&self, severity: Severity) -> usize {
        self.queues[severity.index()]
            .lock()
            .map(|queue| queue.len())
            .unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(text: &str) -> BufferedRecord {
        BufferedRecord::from_event(json!({ "name": "test", "text": text }))
    }

    #[test]
    fn take_drains_and_leaves_fresh_queue() {
        let buffers = LevelBuffers::new(4);
        buffers.push(Severity::Info, record("one"));
        buffers.push(Severity::Info, record("two"));

        let batch = buffers.take(Severity::Info);
        assert_eq!(batch.len(), 2);
        assert_eq!(batch[0].payload, json!({ "text": "one" }));
        assert_eq!(batch[1].payload, json!({ "text": "two" }));
        assert_eq!(buffers.len(Severity::Info), 0);
    }

    #[test]
    fn queues_are_independent_per_severity() {
        let buffers = LevelBuffers::new(1);
        buffers.push(Severity::Debug, record("d"));
        buffers.push(Severity::Fatal, record("f"));

        assert_eq!(buffers.take(Severity::Debug).len(), 1);
        assert_eq!(buffers.len(Severity::Fatal), 1);
    }

    #[test]
    fn records_pushed_after_take_land_in_next_batch() {
        let buffers = LevelBuffers::new(1);
        buffers.push(Severity::Warn, record("first"));

        let in_flight = buffers.take(Severity::Warn);
        buffers.push(Severity::Warn, record("second"));

        assert_eq!(in_flight.len(), 1);
        let next = buffers.take(Severity::Warn);
        assert_eq!(next.len(), 1);
        assert_eq!(next[0].payload, json!({ "text": "second" }));
    }

    #[test]
    fn take_on_empty_queue_returns_empty_batch() {
        let buffers = LevelBuffers::new(1);
        assert!(buffers.take(Severity::Error).is_empty());
    }
}
