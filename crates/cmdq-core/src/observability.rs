use serde::{Deserialize, Serialize};

/// Snapshot of a `CommandQueue`'s bookkeeping.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueCounts {
    /// Envelopes waiting to be dequeued.
    pub pending: usize,
    /// Envelopes accepted since the queue was created.
    pub enqueued: u64,
    /// Envelopes handed to a worker.
    pub dispatched: u64,
}
