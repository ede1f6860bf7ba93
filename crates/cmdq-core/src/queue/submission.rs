use std::sync::Arc;

use crate::domain::{CommandId, CommandPriority, Locale, RequesterId};
use crate::impls::ResultHandle;

/// Options for `CommandQueue::submit`.
///
/// Anything left unset falls back to the queue's configuration, and the
/// requester to the calling thread.
#[derive(Debug, Clone, Default)]
pub struct Submission {
    pub(crate) priority: Option<CommandPriority>,
    pub(crate) locale: Option<Locale>,
    pub(crate) requester: Option<RequesterId>,
    pub(crate) await_result: bool,
}

impl Submission {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn priority(mut self, priority: CommandPriority) -> Self {
        self.priority = Some(priority);
        self
    }

    pub fn locale(mut self, locale: Locale) -> Self {
        self.locale = Some(locale);
        self
    }

    pub fn requester(mut self, requester: RequesterId) -> Self {
        self.requester = Some(requester);
        self
    }

    /// Ask for the outcome; `submit` then returns a `ResultHandle`.
    pub fn await_result(mut self) -> Self {
        self.await_result = true;
        self
    }
}

/// Receipt for a submitted command.
#[derive(Debug, Clone)]
pub struct Submitted {
    pub command_id: CommandId,
    /// Present when the submission asked for the result.
    pub handle: Option<Arc<ResultHandle>>,
}
