use serde::{Deserialize, Serialize};
use std::fmt;

/// Scheduling class of a command.
///
/// Lower values run first: `CRITICAL` (0) is dequeued before `BACKGROUND` (10).
/// Any value is accepted; the named constants are the classes the built-in
/// callers use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CommandPriority(u32);

impl CommandPriority {
    pub const CRITICAL: Self = Self(0);
    pub const HIGH: Self = Self(1);
    pub const NORMAL: Self = Self(3);
    pub const LOW: Self = Self(5);
    pub const BACKGROUND: Self = Self(10);

    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    pub const fn value(self) -> u32 {
        self.0
    }

    fn name(self) -> Option<&'static str> {
        match self {
            Self::CRITICAL => Some("CRITICAL"),
            Self::HIGH => Some("HIGH"),
            Self::NORMAL => Some("NORMAL"),
            Self::LOW => Some("LOW"),
            Self::BACKGROUND => Some("BACKGROUND"),
            _ => None,
        }
    }
}

impl Default for CommandPriority {
    fn default() -> Self {
        Self::NORMAL
    }
}

impl fmt::Display for CommandPriority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            Some(name) => f.write_str(name),
            None => write!(f, "P{}", self.0),
        }
    }
}
