//! Client configuration file support.
//!
//! Settings are read from a TOML file and can be overridden through
//! environment variables. Every field has a default, so an empty file (or no
//! file at all) yields a working configuration.
//!
//! ```toml
//! [backend]
//! kind = "http"
//! base_url = "http://127.0.0.1:5000"
//! request_timeout_secs = 10
//!
//! [polling]
//! interval_ms = 1000
//! timeout_secs = 30
//!
//! [drill_down]
//! reset_policy = "refetch"
//! ```

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::client::BackendKind;
use crate::services::drill_down::ResetPolicy;
use crate::services::job_lifecycle::PollSettings;

/// Environment variable overriding `backend.kind`.
pub const ENV_BACKEND: &str = "CHARTDRILL_BACKEND";
/// Environment variable overriding `backend.base_url`.
pub const ENV_BASE_URL: &str = "CHARTDRILL_BASE_URL";
/// Environment variable overriding `polling.interval_ms`.
pub const ENV_POLL_INTERVAL_MS: &str = "CHARTDRILL_POLL_INTERVAL_MS";
/// Environment variable overriding `polling.timeout_secs`.
pub const ENV_TIMEOUT_SECS: &str = "CHARTDRILL_TIMEOUT_SECS";
/// Environment variable overriding `drill_down.reset_policy`.
pub const ENV_RESET_POLICY: &str = "CHARTDRILL_RESET_POLICY";

/// Every variable read by [`ClientConfig::apply_env_overrides`].
pub const ENV_OVERRIDES: [&str; 5] = [
    ENV_BACKEND,
    ENV_BASE_URL,
    ENV_POLL_INTERVAL_MS,
    ENV_TIMEOUT_SECS,
    ENV_RESET_POLICY,
];

/// Errors raised while loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {message}")]
    Read { path: String, message: String },

    #[error("Failed to parse config file: {0}")]
    Parse(String),

    #[error("No chartdrill.toml found in standard locations")]
    NotFound,

    #[error("Invalid value for {key}: {message}")]
    Invalid { key: String, message: String },
}

/// Complete client configuration.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ClientConfig {
    #[serde(default)]
    pub backend: BackendSettings,
    #[serde(default)]
    pub polling: PollingSettings,
    #[serde(default)]
    pub drill_down: DrillDownSettings,
}

/// Analysis service connection settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackendSettings {
    #[serde(default)]
    pub kind: BackendKind,
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

/// Status polling cadence and budget.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PollingSettings {
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

/// Drill-down behaviour.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct DrillDownSettings {
    #[serde(default)]
    pub reset_policy: ResetPolicy,
}

fn default_base_url() -> String {
    "http://127.0.0.1:5000".to_string()
}

fn default_request_timeout_secs() -> u64 {
    10
}

fn default_interval_ms() -> u64 {
    1000
}

fn default_timeout_secs() -> u64 {
    30
}

impl Default for BackendSettings {
    fn default() -> Self {
        Self {
            kind: BackendKind::default(),
            base_url: default_base_url(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

impl Default for PollingSettings {
    fn default() -> Self {
        Self {
            interval_ms: default_interval_ms(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl ClientConfig {
    /// Load configuration from a TOML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Load configuration from the default location.
    ///
    /// Searches for `chartdrill.toml` in:
    /// 1. Current directory
    /// 2. `config/` directory
    /// 3. Parent directory
    pub fn from_default_location() -> Result<Self, ConfigError> {
        let search_paths = [
            PathBuf::from("chartdrill.toml"),
            PathBuf::from("config/chartdrill.toml"),
            PathBuf::from("../chartdrill.toml"),
        ];

        for path in search_paths {
            if path.exists() {
                log::debug!("Loading configuration from {}", path.display());
                return Self::from_file(&path);
            }
        }

        Err(ConfigError::NotFound)
    }

    /// Load from the default location, falling back to defaults when no file
    /// exists, then apply environment overrides and validate.
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = match Self::from_default_location() {
            Ok(config) => config,
            Err(ConfigError::NotFound) => Self::default(),
            Err(e) => return Err(e),
        };
        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    /// Apply `CHARTDRILL_*` environment variables on top of the file values.
    pub fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from an arbitrary key lookup.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(kind) = lookup(ENV_BACKEND) {
            self.backend.kind = kind.parse().map_err(|message| ConfigError::Invalid {
                key: ENV_BACKEND.to_string(),
                message,
            })?;
        }
        if let Some(url) = lookup(ENV_BASE_URL) {
            self.backend.base_url = url;
        }
        if let Some(interval) = lookup(ENV_POLL_INTERVAL_MS) {
            self.polling.interval_ms = parse_number(ENV_POLL_INTERVAL_MS, &interval)?;
        }
        if let Some(timeout) = lookup(ENV_TIMEOUT_SECS) {
            self.polling.timeout_secs = parse_number(ENV_TIMEOUT_SECS, &timeout)?;
        }
        if let Some(policy) = lookup(ENV_RESET_POLICY) {
            self.drill_down.reset_policy =
                policy.parse().map_err(|message| ConfigError::Invalid {
                    key: ENV_RESET_POLICY.to_string(),
                    message,
                })?;
        }
        Ok(())
    }

    /// Reject settings the poll loop cannot work with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.polling.interval_ms == 0 {
            return Err(ConfigError::Invalid {
                key: "polling.interval_ms".to_string(),
                message: "must be greater than zero".to_string(),
            });
        }
        if self.polling.timeout_secs.saturating_mul(1000) < self.polling.interval_ms {
            return Err(ConfigError::Invalid {
                key: "polling.timeout_secs".to_string(),
                message: format!(
                    "timeout of {}s is shorter than the {}ms poll interval",
                    self.polling.timeout_secs, self.polling.interval_ms
                ),
            });
        }
        if self.backend.base_url.trim().is_empty() {
            return Err(ConfigError::Invalid {
                key: "backend.base_url".to_string(),
                message: "must not be empty".to_string(),
            });
        }
        Ok(())
    }

    pub fn poll_settings(&self) -> PollSettings {
        PollSettings {
            interval: Duration::from_millis(self.polling.interval_ms),
            timeout: Duration::from_secs(self.polling.timeout_secs),
        }
    }
}

fn parse_number(key: &str, value: &str) -> Result<u64, ConfigError> {
    value.trim().parse().map_err(|e| ConfigError::Invalid {
        key: key.to_string(),
        message: format!("'{}' is not a number: {}", value, e),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = ClientConfig::from_toml_str("").unwrap();
        assert_eq!(config, ClientConfig::default());
        assert_eq!(config.poll_settings(), PollSettings::default());
        assert_eq!(config.drill_down.reset_policy, ResetPolicy::Refetch);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_full_config() {
        let toml = r#"
[backend]
kind = "local"
base_url = "http://analysis:8000"
request_timeout_secs = 5

[polling]
interval_ms = 250
timeout_secs = 12

[drill_down]
reset_policy = "restore-cached"
"#;
        let config = ClientConfig::from_toml_str(toml).unwrap();
        assert_eq!(config.backend.kind, BackendKind::Local);
        assert_eq!(config.backend.base_url, "http://analysis:8000");
        assert_eq!(config.backend.request_timeout_secs, 5);
        assert_eq!(
            config.poll_settings(),
            PollSettings {
                interval: Duration::from_millis(250),
                timeout: Duration::from_secs(12),
            }
        );
        assert_eq!(config.drill_down.reset_policy, ResetPolicy::RestoreCached);
    }

    #[test]
    fn test_invalid_toml() {
        let err = ClientConfig::from_toml_str("[polling]\ninterval_ms = \"fast\"").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_overrides() {
        let env: HashMap<&str, &str> = [
            (ENV_BASE_URL, "http://override:9000"),
            (ENV_POLL_INTERVAL_MS, "200"),
            (ENV_RESET_POLICY, "restore-cached"),
        ]
        .into_iter()
        .collect();
        let mut config = ClientConfig::default();
        config
            .apply_overrides(|key| env.get(key).map(|v| v.to_string()))
            .unwrap();

        assert_eq!(config.backend.base_url, "http://override:9000");
        assert_eq!(config.polling.interval_ms, 200);
        assert_eq!(config.polling.timeout_secs, 30);
        assert_eq!(config.drill_down.reset_policy, ResetPolicy::RestoreCached);
    }

    #[test]
    fn test_bad_override_is_reported() {
        let mut config = ClientConfig::default();
        let err = config
            .apply_overrides(|key| (key == ENV_TIMEOUT_SECS).then(|| "soon".to_string()))
            .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { ref key, .. } if key == ENV_TIMEOUT_SECS));
    }

    #[test]
    fn test_validation() {
        let mut config = ClientConfig::default();
        config.polling.interval_ms = 0;
        assert!(config.validate().is_err());

        config.polling.interval_ms = 5000;
        config.polling.timeout_secs = 2;
        assert!(config.validate().is_err());

        config.polling.timeout_secs = 5;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("chartdrill.toml");
        fs::write(&path, "[polling]\ntimeout_secs = 60\n").unwrap();

        let config = ClientConfig::from_file(&path).unwrap();
        assert_eq!(config.polling.timeout_secs, 60);
        assert_eq!(config.polling.interval_ms, 1000);

        let missing = ClientConfig::from_file(dir.path().join("nope.toml")).unwrap_err();
        assert!(matches!(missing, ConfigError::Read { .. }));
    }
}
