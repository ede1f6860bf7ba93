//! ResultSink port - where a worker publishes a finished command's outcome.

use crate::domain::{CommandOutcome, DispatchError};

/// Receives the outcome of a command whose submitter wants the result.
///
/// The envelope only holds and forwards the sink; it never reads from it.
/// The sink may outlive the envelope, since callers keep polling it after
/// the queue has discarded the envelope.
pub trait ResultSink: Send + Sync {
    fn publish(&self, outcome: CommandOutcome) -> Result<(), DispatchError>;
}
