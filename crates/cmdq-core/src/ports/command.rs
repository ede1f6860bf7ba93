//! DbCommand port - the unit of database work carried by an envelope.
//!
//! What a command does (SQL, transactions, connections) is its own business.
//! The dispatch layer only stamps it at submission and runs it on a worker.

use std::fmt;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::domain::{CommandId, CommandPriority, Locale, RequesterId};

/// Error reported by a command's own execution.
///
/// Not a dispatch failure: the worker turns it into a `FAILURE` outcome.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct CommandError {
    message: String,
}

impl CommandError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

/// What a command sees of its envelope while it runs.
#[derive(Debug, Clone, Copy)]
pub struct CommandContext<'a> {
    pub command_id: CommandId,
    pub priority: CommandPriority,
    pub locale: &'a Locale,
    pub requester: &'a RequesterId,
}

/// A pending database operation.
///
/// `set_submitted_at` is called exactly once, by `CommandEnvelope::new`.
/// Implementations usually embed a [`CommandStamp`] to store it.
#[async_trait]
pub trait DbCommand: fmt::Debug + Send + Sync {
    fn set_submitted_at(&mut self, at: DateTime<Utc>);

    fn submitted_at(&self) -> Option<DateTime<Utc>>;

    async fn execute(&self, ctx: &CommandContext<'_>) -> Result<serde_json::Value, CommandError>;
}

/// Submission timestamp storage for `DbCommand` implementations.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CommandStamp(Option<DateTime<Utc>>);

impl CommandStamp {
    pub fn set(&mut self, at: DateTime<Utc>) {
        self.0 = Some(at);
    }

    pub fn get(&self) -> Option<DateTime<Utc>> {
        self.0
    }
}
