mod gateway;

pub use gateway::*;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

use crate::error::{Error, Result};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Top-level config
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub gateway: GatewayConfig,
}

impl Config {
    /// Parse a TOML document. Missing sections and fields take defaults.
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        toml::from_str(raw).map_err(|e| Error::Config(format!("parsing config: {e}")))
    }

    /// Load from `path`, falling back to defaults when the file does not
    /// exist, then apply `DG_*` environment overrides.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let mut config = if path.exists() {
            let raw = std::fs::read_to_string(path)
                .map_err(|e| Error::Config(format!("reading {}: {e}", path.display())))?;
            Self::from_toml_str(&raw)?
        } else {
            tracing::debug!(path = %path.display(), "config file not found, using defaults");
            Self::default()
        };
        config.apply_env_overrides();
        Ok(config)
    }

    /// `DG_GATEWAY_URL` and `DG_API_KEY` take precedence over the file.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(url) = std::env::var("DG_GATEWAY_URL") {
            if !url.is_empty() {
                self.gateway.url = url;
            }
        }
        if let Ok(key) = std::env::var("DG_API_KEY") {
            if !key.is_empty() {
                self.gateway.api_key = Some(key);
            }
        }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Config validation
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Severity level for a configuration issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigSeverity {
    Error,
    Warning,
}

/// A single configuration validation issue.
#[derive(Debug, Clone)]
pub struct ConfigError {
    pub severity: ConfigSeverity,
    pub field: String,
    pub message: String,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self.severity {
            ConfigSeverity::Error => "ERROR",
            ConfigSeverity::Warning => "WARN",
        };
        write!(f, "[{tag}] {}: {}", self.field, self.message)
    }
}

impl Config {
    /// Validate the configuration and return a list of issues.
    ///
    /// Returns an empty vec when everything looks good.
    pub fn validate(&self) -> Vec<ConfigError> {
        let mut errors = Vec::new();

        if self.gateway.url.is_empty() {
            errors.push(ConfigError {
                severity: ConfigSeverity::Error,
                field: "gateway.url".into(),
                message: "url must not be empty".into(),
            });
        } else if !self.gateway.url.starts_with("http://")
            && !self.gateway.url.starts_with("https://")
        {
            errors.push(ConfigError {
                severity: ConfigSeverity::Error,
                field: "gateway.url".into(),
                message: "url must start with http:// or https://".into(),
            });
        }

        if self.gateway.poll_interval_ms == 0 {
            errors.push(ConfigError {
                severity: ConfigSeverity::Error,
                field: "gateway.poll_interval_ms".into(),
                message: "poll interval must be greater than 0".into(),
            });
        }

        if self.gateway.timeout_ms == 0 {
            errors.push(ConfigError {
                severity: ConfigSeverity::Error,
                field: "gateway.timeout_ms".into(),
                message: "request timeout must be greater than 0".into(),
            });
        }

        if self.gateway.response_timeout_ms.is_none() {
            errors.push(ConfigError {
                severity: ConfigSeverity::Warning,
                field: "gateway.response_timeout_ms".into(),
                message: "unset: calls wait for their result indefinitely".into(),
            });
        }

        if self.gateway.url.starts_with("http://") && self.gateway.api_key.is_some() {
            errors.push(ConfigError {
                severity: ConfigSeverity::Warning,
                field: "gateway.api_key".into(),
                message: "api key is sent over plain http".into(),
            });
        }

        errors
    }
}
