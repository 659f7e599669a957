//! Configuration loading for the lineup client.
//!
//! All fields are required unless explicitly marked optional. No defaults.

use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ClientConfig {
    pub rest_base_url: String,
    pub realtime_endpoint: String,
    pub auth: CredentialsConfig,
    pub request_timeout_ms: u64,
    pub reconnect: ReconnectConfig,
    pub cache: CacheSection,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CredentialsConfig {
    pub api_key: Option<String>,
    pub bearer_token: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReconnectConfig {
    pub initial_ms: u64,
    pub max_ms: u64,
    pub multiplier: f64,
    pub jitter_ms: u64,
}

/// Cache section. `enabled = false` selects the store's disabled mode
/// for platforms without a secure persistence medium.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CacheSection {
    pub enabled: bool,
    pub directory: Option<PathBuf>,
    pub default_ttl_minutes: u32,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing configuration file path (use --config or LINEUP_CONFIG)")]
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
        let config = Self::from_path(&path)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        let config: ClientConfig = toml::from_str(&contents)?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.rest_base_url.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "rest_base_url",
                reason: "must not be empty".to_string(),
            });
        }
        if self.realtime_endpoint.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "realtime_endpoint",
                reason: "must not be empty".to_string(),
            });
        }
        if self.auth.api_key.is_none() && self.auth.bearer_token.is_none() {
            return Err(ConfigError::InvalidValue {
                field: "auth",
                reason: "api_key or bearer_token must be provided".to_string(),
            });
        }
        if self.request_timeout_ms == 0 {
            return Err(ConfigError::InvalidValue {
                field: "request_timeout_ms",
                reason: "must be > 0".to_string(),
            });
        }
        if self.reconnect.initial_ms == 0 {
            return Err(ConfigError::InvalidValue {
                field: "reconnect.initial_ms",
                reason: "must be > 0".to_string(),
            });
        }
        if self.reconnect.max_ms < self.reconnect.initial_ms {
            return Err(ConfigError::InvalidValue {
                field: "reconnect.max_ms",
                reason: "must be >= initial_ms".to_string(),
            });
        }
        if self.reconnect.multiplier < 1.0 {
            return Err(ConfigError::InvalidValue {
                field: "reconnect.multiplier",
                reason: "must be >= 1.0".to_string(),
            });
        }
        if self.cache.enabled && self.cache.directory.is_none() {
            return Err(ConfigError::InvalidValue {
                field: "cache.directory",
                reason: "required when cache.enabled is true".to_string(),
            });
        }
        Ok(())
    }
}

fn config_path_from_env() -> Option<PathBuf> {
    std::env::var("LINEUP_CONFIG").ok().map(PathBuf::from)
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
    use std::io::Write;

    fn valid_toml() -> String {
        r#"
rest_base_url = "https://api.lineup.test"
realtime_endpoint = "wss://api.lineup.test/realtime"
request_timeout_ms = 5000

[auth]
api_key = "anon-key"

[reconnect]
initial_ms = 250
max_ms = 30000
multiplier = 2.0
jitter_ms = 100

[cache]
enabled = true
directory = "/tmp/lineup-cache"
default_ttl_minutes = 60
"#
        .to_string()
    }

    fn parse(contents: &str) -> Result<ClientConfig, ConfigError> {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        file.write_all(contents.as_bytes()).expect("write");
        ClientConfig::from_path(file.path())
    }

    #[test]
    fn test_load_valid_config() {
        let config = parse(&valid_toml()).expect("parse");
        config.validate().expect("validate");
        assert_eq!(config.rest_base_url, "https://api.lineup.test");
        assert_eq!(config.cache.default_ttl_minutes, 60);
    }

    #[test]
    fn test_missing_auth_rejected() {
        let contents = valid_toml().replace("api_key = \"anon-key\"", "");
        let config = parse(&contents).expect("parse");
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue { field: "auth", .. })
        ));
    }

    #[test]
    fn test_enabled_cache_requires_directory() {
        let contents = valid_toml().replace("directory = \"/tmp/lineup-cache\"", "");
        let config = parse(&contents).expect("parse");
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue {
                field: "cache.directory",
                ..
            })
        ));
    }

    #[test]
    fn test_reconnect_bounds_checked() {
        let contents = valid_toml().replace("max_ms = 30000", "max_ms = 100");
        let config = parse(&contents).expect("parse");
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue {
                field: "reconnect.max_ms",
                ..
            })
        ));
    }

    #[test]
    fn test_unknown_fields_rejected() {
        let contents = format!("{}\nsurprise = true\n", valid_toml());
        assert!(matches!(parse(&contents), Err(ConfigError::Parse(_))));
    }
}
