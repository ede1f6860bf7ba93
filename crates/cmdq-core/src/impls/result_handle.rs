//! ResultHandle - set-once outcome container handed back to submitters.
//!
//! Backed by a `tokio::sync::watch` channel: `publish` fills the slot once
//! and wakes every waiter; later publishes are refused. Waiters either poll
//! with `try_get` or await `wait` / `wait_timeout`.

use std::time::Duration;

use tokio::sync::watch;

use crate::domain::{CommandOutcome, DispatchError};
use crate::ports::ResultSink;

#[derive(Debug)]
pub struct ResultHandle {
    slot: watch::Sender<Option<CommandOutcome>>,
}

impl ResultHandle {
    pub fn new() -> Self {
        let (slot, _) = watch::channel(None);
        Self { slot }
    }

    pub fn is_ready(&self) -> bool {
        self.slot.borrow().is_some()
    }

    /// Non-blocking poll.
    pub fn try_get(&self) -> Option<CommandOutcome> {
        self.slot.borrow().clone()
    }

    /// Wait until an outcome is published.
    pub async fn wait(&self) -> CommandOutcome {
        let mut rx = self.slot.subscribe();
        loop {
            if let Some(outcome) = rx.borrow_and_update().clone() {
                return outcome;
            }
            // The sender lives in `self`, so the channel cannot close while we wait.
            if rx.changed().await.is_err() {
                std::future::pending::<()>().await;
            }
        }
    }

    /// Like `wait`, giving up after `timeout`.
    pub async fn wait_timeout(&self, timeout: Duration) -> Option<CommandOutcome> {
        tokio::time::timeout(timeout, self.wait()).await.ok()
    }
}

impl Default for ResultHandle {
    fn default() -> Self {
        Self::new()
    }
}

impl ResultSink for ResultHandle {
    fn publish(&self, outcome: CommandOutcome) -> Result<(), DispatchError> {
        let command_id = outcome.command_id;
        let mut incoming = Some(outcome);
        let stored = self.slot.send_if_modified(|slot| {
            if slot.is_some() {
                return false;
            }
            *slot = incoming.take();
            true
        });
        if stored {
            Ok(())
        } else {
            Err(DispatchError::AlreadyPublished(command_id.to_string()))
        }
    }
}
