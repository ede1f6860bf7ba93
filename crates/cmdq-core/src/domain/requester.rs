use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque identity of whoever submitted a command.
///
/// Only shown in diagnostics and log fields; nothing routes or blocks on it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RequesterId(String);

impl RequesterId {
    pub fn new(label: impl Into<String>) -> Self {
        Self(label.into())
    }

    /// Label for whoever is running right now.
    ///
    /// Inside a tokio task this is the task id, since every task on a
    /// multi-thread runtime shares a handful of identically named threads.
    /// Outside a task it falls back to [`RequesterId::current_thread`].
    pub fn current() -> Self {
        match tokio::task::try_id() {
            Some(id) => Self(format!("task-{id}")),
            None => Self::current_thread(),
        }
    }

    /// Label derived from the calling thread: its name, or its id when unnamed.
    pub fn current_thread() -> Self {
        let thread = std::thread::current();
        match thread.name() {
            Some(name) => Self(name.to_string()),
            None => Self(format!("{:?}", thread.id())),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RequesterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}
