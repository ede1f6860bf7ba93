//! Dispatch configuration.
//!
//! `default_locale` is required: commands submitted without an explicit
//! locale run under it, and there is no process-wide fallback beyond it.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::domain::{CommandPriority, DispatchError, Locale};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatchConfig {
    /// Number of workers draining the queue.
    #[serde(default = "default_workers")]
    pub workers: usize,

    pub default_locale: Locale,

    /// Priority used by submissions that do not name one.
    #[serde(default)]
    pub default_priority: CommandPriority,
}

fn default_workers() -> usize {
    1
}

impl DispatchConfig {
    pub fn new(default_locale: Locale) -> Self {
        Self {
            workers: default_workers(),
            default_locale,
            default_priority: CommandPriority::default(),
        }
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    pub fn with_default_priority(mut self, priority: CommandPriority) -> Self {
        self.default_priority = priority;
        self
    }

    pub fn from_json_str(json: &str) -> Result<Self, DispatchError> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| DispatchError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, DispatchError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .map_err(|e| DispatchError::Config(format!("{}: {e}", path.display())))?;
        Self::from_json_str(&json)
    }

    pub fn validate(&self) -> Result<(), DispatchError> {
        if self.workers == 0 {
            return Err(DispatchError::Config(
                "workers must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
