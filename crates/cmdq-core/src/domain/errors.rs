//! Errors raised by the dispatch layer itself.
//!
//! Failures of a wrapped command are not errors here: they travel to the
//! caller as a `FAILURE` outcome through the result sink.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DispatchError {
    /// A constructor or submission was handed unusable input.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// An operation was called in a state that forbids it (e.g. a second completion).
    #[error("invalid state: {0}")]
    InvalidState(String),

    /// A result sink refused a second outcome.
    #[error("result already published for {0}")]
    AlreadyPublished(String),

    /// The queue no longer accepts submissions.
    #[error("command queue is closed")]
    QueueClosed,

    #[error("configuration error: {0}")]
    Config(String),
}

impl DispatchError {
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument(message.into())
    }

    pub fn invalid_state(message: impl Into<String>) -> Self {
        Self::InvalidState(message.into())
    }
}
