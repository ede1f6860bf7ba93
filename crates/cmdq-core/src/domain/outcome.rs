//! Outcome of one command execution, as handed to the result sink.
//!
//! A failed command still concludes: it carries a completion timestamp like
//! a successful one, and the reason travels here instead of as an error.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::CommandId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OutcomeKind {
    Success,
    Failure,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandOutcome {
    pub command_id: CommandId,
    pub kind: OutcomeKind,

    /// Value produced by the command (`SUCCESS` only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<serde_json::Value>,

    /// Error text reported by the command (`FAILURE` only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,

    pub completed_at: DateTime<Utc>,
}

impl CommandOutcome {
    pub fn success(
        command_id: CommandId,
        value: serde_json::Value,
        completed_at: DateTime<Utc>,
    ) -> Self {
        Self {
            command_id,
            kind: OutcomeKind::Success,
            value: Some(value),
            reason: None,
            completed_at,
        }
    }

    pub fn failure(
        command_id: CommandId,
        reason: impl Into<String>,
        completed_at: DateTime<Utc>,
    ) -> Self {
        Self {
            command_id,
            kind: OutcomeKind::Failure,
            value: None,
            reason: Some(reason.into()),
            completed_at,
        }
    }

    pub fn is_success(&self) -> bool {
        self.kind == OutcomeKind::Success
    }

    /// Turn the outcome into the command's value, or its failure reason.
    pub fn into_result(self) -> Result<serde_json::Value, String> {
        match self.kind {
            OutcomeKind::Success => Ok(self.value.unwrap_or(serde_json::Value::Null)),
            OutcomeKind::Failure => Err(self.reason.unwrap_or_default()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use ulid::Ulid;

    fn at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn outcome_kind_serializes_as_required_names() {
        let s = serde_json::to_string(&OutcomeKind::Success).unwrap();
        assert_eq!(s, "\"SUCCESS\"");
        let s = serde_json::to_string(&OutcomeKind::Failure).unwrap();
        assert_eq!(s, "\"FAILURE\"");
    }

    #[test]
    fn failure_omits_value_in_json() {
        let o = CommandOutcome::failure(CommandId::from_ulid(Ulid::new()), "deadlock", at());
        let v = serde_json::to_value(&o).unwrap();
        assert_eq!(v["kind"], "FAILURE");
        assert_eq!(v["reason"], "deadlock");
        assert!(v.get("value").is_none());
    }

    #[test]
    fn into_result_splits_on_kind() {
        let id = CommandId::from_ulid(Ulid::new());
        let ok = CommandOutcome::success(id, serde_json::json!({"rows": 2}), at());
        assert!(ok.is_success());
        assert_eq!(ok.into_result().unwrap()["rows"], 2);

        let err = CommandOutcome::failure(id, "boom", at());
        assert_eq!(err.into_result().unwrap_err(), "boom");
    }
}
