use serde::{Deserialize, Serialize};
use std::fmt;

use super::DispatchError;

/// Locale a command executes under, as a language tag (`en`, `de-DE`, ...).
///
/// Carried and forwarded only. There is no process-wide fallback: every
/// submission names one, usually via `DispatchConfig::default_locale`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Locale(String);

impl Locale {
    pub fn new(tag: impl Into<String>) -> Result<Self, DispatchError> {
        let tag = tag.into();
        let trimmed = tag.trim();
        if trimmed.is_empty() {
            return Err(DispatchError::invalid_argument("locale tag must not be empty"));
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for Locale {
    type Error = DispatchError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Locale> for String {
    fn from(locale: Locale) -> Self {
        locale.0
    }
}

impl fmt::Display for Locale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_tag_is_rejected() {
        assert!(matches!(
            Locale::new("  "),
            Err(DispatchError::InvalidArgument(_))
        ));
    }

    #[test]
    fn deserializing_validates() {
        let l: Locale = serde_json::from_str("\"de-DE\"").unwrap();
        assert_eq!(l.as_str(), "de-DE");
        assert!(serde_json::from_str::<Locale>("\"\"").is_err());
    }
}
