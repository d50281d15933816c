//! Engine configuration.
//!
//! Loaded from a JSON file, with environment overrides applied on top:
//!
//! ```json
//! { "max_involved": 32, "log_events": true }
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Environment variable overriding [`EngineConfig::max_involved`].
pub const MAX_INVOLVED_ENV: &str = "SPLIT_LEDGER_MAX_INVOLVED";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config file '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("cannot parse config: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Upper bound on participants in a single expense claim.
    pub max_involved: usize,
    /// Also write every committed operation to the log.
    pub log_events: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_involved: 64,
            log_events: true,
        }
    }
}

impl EngineConfig {
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: EngineConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json_str(&content)
    }

    /// Apply `SPLIT_LEDGER_MAX_INVOLVED` if set.
    pub fn with_env_overrides(self) -> Result<Self, ConfigError> {
        self.with_overrides(|key| std::env::var(key).ok())
    }

    fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        if let Some(raw) = lookup(MAX_INVOLVED_ENV) {
            self.max_involved = raw.trim().parse().map_err(|_| {
                ConfigError::Invalid(format!("{MAX_INVOLVED_ENV}='{raw}' is not a number"))
            })?;
        }
        self.validate()?;
        Ok(self)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_involved == 0 {
            return Err(ConfigError::Invalid(
                "max_involved must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.max_involved, 64);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config = EngineConfig::from_json_str(r#"{ "max_involved": 8 }"#).unwrap();
        assert_eq!(config.max_involved, 8);
        assert!(config.log_events);
    }

    #[test]
    fn test_zero_limit_rejected() {
        let result = EngineConfig::from_json_str(r#"{ "max_involved": 0 }"#);
        assert!(matches!(result, Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_bad_json() {
        assert!(matches!(
            EngineConfig::from_json_str("{ nope"),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_missing_file() {
        let result = EngineConfig::from_file("/definitely/not/here.json");
        assert!(matches!(result, Err(ConfigError::Io { .. })));
    }

    #[test]
    fn test_override_applied() {
        let config = EngineConfig::default()
            .with_overrides(|key| (key == MAX_INVOLVED_ENV).then(|| "12".to_string()))
            .unwrap();
        assert_eq!(config.max_involved, 12);
    }

    #[test]
    fn test_override_must_be_numeric() {
        let result = EngineConfig::default().with_overrides(|_| Some("lots".to_string()));
        assert!(matches!(result, Err(ConfigError::Invalid(_))));
    }
}
