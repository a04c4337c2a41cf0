//! Deferrer configuration
//!
//! Owners that build their queues from external settings describe them with
//! a `DeferrerConfig`, usually embedded in a larger serde-backed settings
//! document.

use serde::{Deserialize, Serialize};

use crate::errors::ConfigError;

/// Construction-time settings for a `Deferrer`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DeferrerConfig {
    /// Collapse consecutive equal calls when flushing
    pub dedupe: bool,
}

impl DeferrerConfig {
    pub fn new(dedupe: bool) -> Self {
        Self { dedupe }
    }

    /// Parse a config from a JSON document
    ///
    /// Missing fields take their defaults; unknown fields are rejected.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] for malformed JSON, wrong field
    /// types or unknown fields.
    ///
    /// # Example
    ///
    /// ```
    /// use deferral_core::DeferrerConfig;
    ///
    /// let config = DeferrerConfig::from_json_str(r#"{ "dedupe": true }"#).unwrap();
    /// assert!(config.dedupe);
    /// ```
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_disables_dedupe() {
        assert!(!DeferrerConfig::default().dedupe);
    }

    #[test]
    fn test_empty_object_uses_defaults() {
        let config = DeferrerConfig::from_json_str("{}").unwrap();
        assert_eq!(config, DeferrerConfig::default());
    }

    #[test]
    fn test_unknown_field_rejected() {
        let err = DeferrerConfig::from_json_str(r#"{ "dedup": true }"#).unwrap_err();
        match err {
            ConfigError::Invalid { message } => assert!(message.contains("dedup")),
        }
    }

    #[test]
    fn test_wrong_type_rejected() {
        assert!(DeferrerConfig::from_json_str(r#"{ "dedupe": "yes" }"#).is_err());
    }

    #[test]
    fn test_serialize_round_trip() {
        let config = DeferrerConfig::new(true);
        let json = serde_json::to_string(&config).unwrap();
        assert_eq!(json, r#"{"dedupe":true}"#);
    }
}
