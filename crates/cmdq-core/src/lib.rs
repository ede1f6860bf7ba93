//! cmdq-core
//!
//! Priority-ordered dispatch of database commands onto background workers.
//!
//! # Modules
//! - **domain**: `CommandEnvelope` and the values it carries (priority, locale, requester, outcome)
//! - **ports**: seams to collaborators (`DbCommand`, `ResultSink`, `Clock`)
//! - **impls**: `ResultHandle`, the set-once sink submitters wait on
//! - **queue**: `EnvelopeQueue` and the in-memory `CommandQueue`
//! - **worker**: `WorkerGroup` and `execute_one`
//! - **config**: `DispatchConfig`
//! - **observability**: queue counters

pub mod config;
pub mod domain;
pub mod impls;
pub mod observability;
pub mod ports;
pub mod queue;
pub mod worker;

pub use config::DispatchConfig;
pub use domain::{
    CommandEnvelope, CommandId, CommandOutcome, CommandPriority, DispatchError, Locale,
    OutcomeKind, RequesterId, UNPROCESSED,
};
pub use impls::ResultHandle;
pub use ports::{Clock, CommandContext, CommandError, CommandStamp, DbCommand, ResultSink};
pub use queue::{CommandQueue, EnvelopeQueue, Submission, Submitted};
pub use worker::{WorkerGroup, execute_one};
