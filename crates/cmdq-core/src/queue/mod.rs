//! Queue module: the ordered structure workers drain, plus submission options.

mod memory;
mod submission;

pub use memory::CommandQueue;
pub use submission::{Submission, Submitted};

use async_trait::async_trait;

use crate::domain::{CommandEnvelope, DispatchError};
use crate::observability::QueueCounts;

/// Queue port (interface) between submitters and workers.
///
/// Envelopes leave in envelope order (priority, then submission time);
/// envelopes that compare equal leave in insertion order.
#[async_trait]
pub trait EnvelopeQueue: Send + Sync {
    /// Accept an envelope. Fails with `QueueClosed` after `close`.
    async fn push(&self, envelope: CommandEnvelope) -> Result<(), DispatchError>;

    /// Take the next envelope, waiting for one if necessary.
    /// Returns `None` once the queue is closed and drained.
    async fn pop(&self) -> Option<CommandEnvelope>;

    /// Stop accepting envelopes; already queued ones can still be popped.
    async fn close(&self);

    async fn counts(&self) -> QueueCounts;
}
