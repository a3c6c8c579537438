//! Configuration loading for the vellum content client.
//!
//! All fields are required unless explicitly marked optional.

use serde::Deserialize;
use std::path::{Path, PathBuf};

pub const CONFIG_ENV_VAR: &str = "VELLUM_CONFIG";

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ClientConfig {
    pub api_base_url: String,
    pub request_timeout_ms: u64,
    pub auth: AuthConfig,
    pub coordinator: CoordinatorSettings,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AuthConfig {
    pub api_key: Option<String>,
    pub jwt: Option<String>,
}

/// Process-wide defaults for mutation runs.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CoordinatorSettings {
    pub invalidate_caches_on_success: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    /// `EnvFilter` directive used when `RUST_LOG` is unset.
    pub filter: String,
    pub json: bool,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing configuration file path (use --config or VELLUM_CONFIG)")]
    MissingConfigPath,
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Invalid config value for {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },
}

impl ClientConfig {
    pub fn load() -> Result<Self, ConfigError> {
        let path = config_path_from_args().or_else(config_path_from_env);
        let path = path.ok_or(ConfigError::MissingConfigPath)?;
        Self::from_path(&path)
    }

    /// Read, parse and validate a config file.
    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml(&contents)
    }

    pub fn from_toml(contents: &str) -> Result<Self, ConfigError> {
        let config: ClientConfig = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let base = self.api_base_url.trim();
        if base.is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "api_base_url",
                reason: "must not be empty".to_string(),
            });
        }
        if !(base.starts_with("http://") || base.starts_with("https://")) {
            return Err(ConfigError::InvalidValue {
                field: "api_base_url",
                reason: "must start with http:// or https://".to_string(),
            });
        }
        if self.request_timeout_ms == 0 {
            return Err(ConfigError::InvalidValue {
                field: "request_timeout_ms",
                reason: "must be > 0".to_string(),
            });
        }
        if self.auth.api_key.is_none() && self.auth.jwt.is_none() {
            return Err(ConfigError::InvalidValue {
                field: "auth",
                reason: "api_key or jwt must be provided".to_string(),
            });
        }
        if self.logging.filter.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "logging.filter",
                reason: "must not be empty".to_string(),
            });
        }
        Ok(())
    }
}

fn config_path_from_env() -> Option<PathBuf> {
    std::env::var(CONFIG_ENV_VAR).ok().map(PathBuf::from)
}

fn config_path_from_args() -> Option<PathBuf> {
    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        if arg == "--config" {
            return args.next().map(PathBuf::from);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    const VALID: &str = r#"
api_base_url = "https://api.example.com"
request_timeout_ms = 5000

[auth]
jwt = "token"

[coordinator]
invalidate_caches_on_success = true

[logging]
filter = "vellum_client=debug"
json = false
"#;

    #[test]
    fn test_parse_valid_config() {
        let config = ClientConfig::from_toml(VALID).unwrap();
        assert_eq!(config.api_base_url, "https://api.example.com");
        assert_eq!(config.auth.jwt.as_deref(), Some("token"));
        assert!(config.auth.api_key.is_none());
        assert!(config.coordinator.invalidate_caches_on_success);
    }

    #[test]
    fn test_unknown_field_rejected() {
        let input = VALID.replace("[auth]", "surprise = true\n\n[auth]");
        assert!(matches!(
            ClientConfig::from_toml(&input),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let input = VALID.replace("request_timeout_ms = 5000", "request_timeout_ms = 0");
        assert!(matches!(
            ClientConfig::from_toml(&input),
            Err(ConfigError::InvalidValue {
                field: "request_timeout_ms",
                ..
            })
        ));
    }

    #[test]
    fn test_missing_auth_rejected() {
        let input = VALID.replace("jwt = \"token\"", "");
        assert!(matches!(
            ClientConfig::from_toml(&input),
            Err(ConfigError::InvalidValue { field: "auth", .. })
        ));
    }

    #[test]
    fn test_base_url_scheme_required() {
        let input = VALID.replace("https://api.example.com", "api.example.com");
        assert!(matches!(
            ClientConfig::from_toml(&input),
            Err(ConfigError::InvalidValue {
                field: "api_base_url",
                ..
            })
        ));
    }
}
