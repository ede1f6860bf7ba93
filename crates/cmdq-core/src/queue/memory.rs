//! In-memory ordered queue.

use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{Mutex, Notify};

use super::{EnvelopeQueue, Submission, Submitted};
use crate::config::DispatchConfig;
use crate::domain::{
    CommandEnvelope, CommandId, CommandPriority, DispatchError, Locale, OrderKey, RequesterId,
};
use crate::impls::ResultHandle;
use crate::observability::QueueCounts;
use crate::ports::{Clock, DbCommand, ResultSink, SystemClock};

/// Heap entry: the envelope's frozen key plus an insertion sequence number.
///
/// The sequence breaks exact `(priority, submitted_at)` ties so equal
/// envelopes leave in the order they arrived. Reverse ordering makes the
/// max-heap pop the smallest entry first.
struct QueuedEnvelope {
    key: OrderKey,
    seq: u64,
    envelope: CommandEnvelope,
}

impl PartialEq for QueuedEnvelope {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key && self.seq == other.seq
    }
}

impl Eq for QueuedEnvelope {}

impl PartialOrd for QueuedEnvelope {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for QueuedEnvelope {
    fn cmp(&self, other: &Self) -> Ordering {
        (other.key, other.seq).cmp(&(self.key, self.seq))
    }
}

#[derive(Default)]
struct QueueState {
    heap: BinaryHeap<QueuedEnvelope>,
    next_seq: u64,
    closed: bool,
    enqueued: u64,
    dispatched: u64,
}

impl QueueState {
    fn counts(&self) -> QueueCounts {
        QueueCounts {
            pending: self.heap.len(),
            enqueued: self.enqueued,
            dispatched: self.dispatched,
        }
    }
}

/// Priority queue of command envelopes shared by submitters and workers.
pub struct CommandQueue {
    state: Arc<Mutex<QueueState>>,
    notify: Arc<Notify>,
    clock: Arc<dyn Clock>,
    default_locale: Locale,
    default_priority: CommandPriority,
}

impl CommandQueue {
    pub fn new(config: &DispatchConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            state: Arc::new(Mutex::new(QueueState::default())),
            notify: Arc::new(Notify::new()),
            clock,
            default_locale: config.default_locale.clone(),
            default_priority: config.default_priority,
        }
    }

    pub fn with_system_clock(config: &DispatchConfig) -> Self {
        Self::new(config, Arc::new(SystemClock))
    }

    pub fn clock(&self) -> Arc<dyn Clock> {
        Arc::clone(&self.clock)
    }

    /// Wrap `command` in an envelope stamped by this queue's clock and enqueue it.
    pub async fn submit(
        &self,
        command: impl DbCommand + 'static,
        submission: Submission,
    ) -> Result<Submitted, DispatchError> {
        let handle = submission
            .await_result
            .then(|| Arc::new(ResultHandle::new()));
        let sink = handle
            .as_ref()
            .map(|h| Arc::clone(h) as Arc<dyn ResultSink>);

        let envelope = CommandEnvelope::new(
            Box::new(command),
            sink,
            submission
                .requester
                .unwrap_or_else(RequesterId::current),
            submission.await_result,
            submission
                .locale
                .unwrap_or_else(|| self.default_locale.clone()),
            submission.priority.unwrap_or(self.default_priority),
            self.clock.as_ref(),
        )?;
        let command_id = envelope.command_id();
        self.push(envelope).await?;

        Ok(Submitted { command_id, handle })
    }

    /// Fire-and-forget submission: the command runs, its result is dropped.
    pub async fn enqueue(
        &self,
        command: impl DbCommand + 'static,
        priority: CommandPriority,
    ) -> Result<CommandId, DispatchError> {
        let submitted = self
            .submit(command, Submission::new().priority(priority))
            .await?;
        Ok(submitted.command_id)
    }

    /// Submit and return the handle the outcome will be published to.
    pub async fn enqueue_and_await_result(
        &self,
        command: impl DbCommand + 'static,
        priority: CommandPriority,
    ) -> Result<Arc<ResultHandle>, DispatchError> {
        let submitted = self
            .submit(command, Submission::new().priority(priority).await_result())
            .await?;
        submitted.handle.ok_or_else(|| {
            DispatchError::invalid_state(format!(
                "no result handle created for {}",
                submitted.command_id
            ))
        })
    }

    /// Take the next envelope if one is queued, without waiting.
    pub async fn try_pop(&self) -> Option<CommandEnvelope> {
        let mut state = self.state.lock().await;
        let entry = state.heap.pop()?;
        state.dispatched += 1;
        Some(entry.envelope)
    }

    pub async fn is_closed(&self) -> bool {
        self.state.lock().await.closed
    }
}

#[async_trait]
impl EnvelopeQueue for CommandQueue {
    async fn push(&self, envelope: CommandEnvelope) -> Result<(), DispatchError> {
        {
            let mut state = self.state.lock().await;
            if state.closed {
                return Err(DispatchError::QueueClosed);
            }
            let seq = state.next_seq;
            state.next_seq += 1;
            state.enqueued += 1;

            tracing::debug!(
                command_id = %envelope.command_id(),
                priority = %envelope.priority(),
                requester = %envelope.requester(),
                seq,
                "enqueued command"
            );
            state.heap.push(QueuedEnvelope {
                key: envelope.order_key(),
                seq,
                envelope,
            });
        }

        self.notify.notify_one();
        Ok(())
    }

    async fn pop(&self) -> Option<CommandEnvelope> {
        loop {
            // state を見る前に登録しておく（間の close() を取りこぼさない）
            let notified = self.notify.notified();
            {
                let mut state = self.state.lock().await;
                let next = state.heap.pop();
                if let Some(entry) = next {
                    state.dispatched += 1;
                    let more = !state.heap.is_empty();
                    drop(state);
                    if more {
                        self.notify.notify_one();
                    }
                    return Some(entry.envelope);
                }
                if state.closed {
                    return None;
                }
            }
            notified.await;
        }
    }

    async fn close(&self) {
        let pending = {
            let mut state = self.state.lock().await;
            state.closed = true;
            state.heap.len()
        };
        tracing::info!(pending, "command queue closed");
        self.notify.notify_waiters();
    }

    async fn counts(&self) -> QueueCounts {
        self.state.lock().await.counts()
    }
}
