//! CommandEnvelope - a pending database command plus everything a scheduler
//! needs to order, run and account for it.
//!
//! Envelopes are totally preordered by `(priority, submitted_at)`: lower
//! priority values first, then earlier submissions first. Two envelopes with
//! the same priority submitted at the same instant compare `Equal`; a queue
//! that needs deterministic FIFO among such ties must add its own insertion
//! sequence (see `queue::CommandQueue`).
//!
//! Apart from construction, the only mutation an envelope ever sees is the
//! write-once completion timestamp recorded by the worker that ran it.

use std::cmp::Ordering;
use std::fmt;
use std::sync::{Arc, OnceLock};

use chrono::{DateTime, Utc};

use super::{CommandId, CommandPriority, DispatchError, Locale, RequesterId};
use crate::ports::{Clock, CommandContext, DbCommand, ResultSink};

/// Value of [`CommandEnvelope::processed_timestamp`] while the command is pending.
pub const UNPROCESSED: i64 = -1;

const DIAGNOSTIC_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S %3f";

/// Frozen ordering key, computed once when the envelope is built.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct OrderKey {
    priority: CommandPriority,
    submitted_at: DateTime<Utc>,
}

impl OrderKey {
    pub fn priority(&self) -> CommandPriority {
        self.priority
    }

    pub fn submitted_at(&self) -> DateTime<Utc> {
        self.submitted_at
    }
}

pub struct CommandEnvelope {
    command_id: CommandId,
    order_key: OrderKey,
    command: Box<dyn DbCommand>,
    result_sink: Option<Arc<dyn ResultSink>>,
    requester: RequesterId,
    wants_result: bool,
    locale: Locale,
    completed_at: OnceLock<DateTime<Utc>>,
}

impl CommandEnvelope {
    /// Wrap `command` for submission, stamping its submission time from `clock`.
    ///
    /// A command that already carries a stamp is re-stamped. Fails with
    /// `InvalidArgument` when a result is wanted but no sink is given, since
    /// nobody could ever deliver it.
    pub fn new(
        mut command: Box<dyn DbCommand>,
        result_sink: Option<Arc<dyn ResultSink>>,
        requester: RequesterId,
        wants_result: bool,
        locale: Locale,
        priority: CommandPriority,
        clock: &dyn Clock,
    ) -> Result<Self, DispatchError> {
        if wants_result && result_sink.is_none() {
            return Err(DispatchError::invalid_argument(format!(
                "requester {requester} wants a result but supplied no result sink"
            )));
        }

        let submitted_at = clock.now();
        if let Some(previous) = command.submitted_at() {
            tracing::debug!(
                ?command,
                previous = %previous,
                "command was already stamped; overwriting submission time"
            );
        }
        command.set_submitted_at(submitted_at);

        Ok(Self {
            command_id: CommandId::generate(submitted_at),
            order_key: OrderKey {
                priority,
                submitted_at,
            },
            command,
            result_sink,
            requester,
            wants_result,
            locale,
            completed_at: OnceLock::new(),
        })
    }

    pub fn command_id(&self) -> CommandId {
        self.command_id
    }

    pub fn order_key(&self) -> OrderKey {
        self.order_key
    }

    pub fn priority(&self) -> CommandPriority {
        self.order_key.priority
    }

    pub fn submitted_at(&self) -> DateTime<Utc> {
        self.order_key.submitted_at
    }

    pub fn command(&self) -> &dyn DbCommand {
        self.command.as_ref()
    }

    pub fn result_sink(&self) -> Option<&Arc<dyn ResultSink>> {
        self.result_sink.as_ref()
    }

    pub fn requester(&self) -> &RequesterId {
        &self.requester
    }

    /// Advisory: when false the worker still runs the command but may drop its result.
    pub fn wants_result(&self) -> bool {
        self.wants_result
    }

    pub fn locale(&self) -> &Locale {
        &self.locale
    }

    /// Context the command executes with.
    pub fn context(&self) -> CommandContext<'_> {
        CommandContext {
            command_id: self.command_id,
            priority: self.order_key.priority,
            locale: &self.locale,
            requester: &self.requester,
        }
    }

    /// When the command finished running, or `None` while it is pending.
    pub fn processed_at(&self) -> Option<DateTime<Utc>> {
        self.completed_at.get().copied()
    }

    /// Completion time in epoch milliseconds, or [`UNPROCESSED`].
    pub fn processed_timestamp(&self) -> i64 {
        self.completed_at
            .get()
            .map_or(UNPROCESSED, DateTime::timestamp_millis)
    }

    pub fn is_processed(&self) -> bool {
        self.completed_at.get().is_some()
    }

    /// Record that the command's execution concluded (successfully or not).
    ///
    /// Write-once: a second call fails with `InvalidState` and keeps the
    /// first timestamp. Must happen before the outcome is published so a
    /// caller woken by the sink always sees it.
    pub fn record_completion(&self, at: DateTime<Utc>) -> Result<(), DispatchError> {
        self.completed_at.set(at).map_err(|_| {
            DispatchError::invalid_state(format!(
                "completion of {} already recorded",
                self.command_id
            ))
        })
    }
}

impl PartialEq for CommandEnvelope {
    fn eq(&self, other: &Self) -> bool {
        self.order_key == other.order_key
    }
}

impl Eq for CommandEnvelope {}

impl PartialOrd for CommandEnvelope {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for CommandEnvelope {
    fn cmp(&self, other: &Self) -> Ordering {
        self.order_key.cmp(&other.order_key)
    }
}

impl fmt::Debug for CommandEnvelope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandEnvelope")
            .field("command_id", &self.command_id)
            .field("priority", &self.order_key.priority)
            .field("submitted_at", &self.order_key.submitted_at)
            .field("requester", &self.requester)
            .field("wants_result", &self.wants_result)
            .field("locale", &self.locale)
            .field("completed_at", &self.completed_at.get())
            .field("command", &self.command)
            .finish_non_exhaustive()
    }
}

/// `[requester, priority, yyyy-MM-dd HH:mm:ss SSS: command]`, always in UTC.
impl fmt::Display for CommandEnvelope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}, {}, {}: {:?}]",
            self.requester,
            self.order_key.priority,
            self.order_key.submitted_at.format(DIAGNOSTIC_TIME_FORMAT),
            self.command
        )
    }
}
