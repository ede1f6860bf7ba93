//! Domain model: the command envelope and the value types it carries.

pub mod envelope;
pub mod errors;
pub mod ids;
pub mod locale;
pub mod outcome;
pub mod priority;
pub mod requester;

pub use self::envelope::{CommandEnvelope, OrderKey, UNPROCESSED};
pub use self::errors::DispatchError;
pub use self::ids::CommandId;
pub use self::locale::Locale;
pub use self::outcome::{CommandOutcome, OutcomeKind};
pub use self::priority::CommandPriority;
pub use self::requester::RequesterId;
