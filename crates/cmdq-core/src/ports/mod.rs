//! Ports - the seams between the dispatch core and its collaborators.
//!
//! Commands, result sinks and clocks are traits so each can be replaced
//! (a real database command, a callback sink, a fixed clock in tests)
//! without touching the envelope or the queue.

pub mod clock;
pub mod command;
pub mod result_sink;

pub use self::clock::{Clock, FixedClock, SystemClock};
pub use self::command::{CommandContext, CommandError, CommandStamp, DbCommand};
pub use self::result_sink::ResultSink;
