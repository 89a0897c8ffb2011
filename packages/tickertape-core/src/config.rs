//! Broker endpoint and credential configuration.
//!
//! Loaded with priority: environment variables, then the config file.
//! All three values are required; a missing one is a construction error.

use serde::Deserialize;
use std::fs;
use std::path::PathBuf;

/// Environment variable overriding the API base URL
const ENV_BASE_URL: &str = "TICKERTAPE_BASE_URL";
/// Environment variable overriding the OAuth client id
const ENV_CLIENT_ID: &str = "TICKERTAPE_CLIENT_ID";
/// Environment variable overriding the OAuth client secret
const ENV_CLIENT_SECRET: &str = "TICKERTAPE_CLIENT_SECRET";

/// Configuration file structure
#[derive(Debug, Deserialize, Default)]
struct ConfigFile {
    broker: Option<BrokerTable>,
}

#[derive(Debug, Deserialize, Default)]
struct BrokerTable {
    /// API endpoint URL (e.g., "https://api.tradestation.com/v2")
    base_url: Option<String>,
    /// OAuth client id issued by the brokerage
    client_id: Option<String>,
    /// OAuth client secret issued by the brokerage
    client_secret: Option<String>,
}

/// Runtime broker configuration
#[derive(Debug, Clone)]
pub struct BrokerConfig {
    /// Base URL for API calls, without a trailing slash
    pub base_url: String,
    /// OAuth client id
    pub client_id: String,
    /// OAuth client secret
    pub client_secret: String,
    /// Source of the configuration (for logging)
    pub source: ConfigSource,
}

/// Where the configuration came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigSource {
    /// Every value from environment variables
    Environment,
    /// At least one value from the config file
    ConfigFile,
    /// Built directly in code
    Explicit,
}

impl std::fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigSource::Environment => write!(f, "environment variables"),
            ConfigSource::ConfigFile => write!(f, "config file"),
            ConfigSource::Explicit => write!(f, "explicit"),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// A required value was found in neither the environment nor the file.
    #[error("missing configuration value: {0}")]
    Missing(&'static str),

    #[error("failed to read config file {path}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

impl BrokerConfig {
    /// Build a configuration directly, trimming a trailing `/` off the base
    /// URL so path concatenation stays predictable.
    pub fn new(
        base_url: impl Into<String>,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
    ) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            source: ConfigSource::Explicit,
        }
    }

    /// Load configuration with priority:
    /// 1. Environment variables (`TICKERTAPE_BASE_URL`, `TICKERTAPE_CLIENT_ID`,
    ///    `TICKERTAPE_CLIENT_SECRET`), each overriding individually
    /// 2. Config file (`~/.config/tickertape/config.toml`, `[broker]` table)
    ///
    /// Every value is required; the error names the first missing one.
    pub fn load() -> Result<Self, ConfigError> {
        let file = load_config_file()?.and_then(|f| f.broker);
        let config = resolve(
            env_value(ENV_BASE_URL),
            env_value(ENV_CLIENT_ID),
            env_value(ENV_CLIENT_SECRET),
            file,
        )?;
        tracing::debug!(base_url = %config.base_url, source = %config.source, "broker config loaded");
        Ok(config)
    }
}

/// Merge environment values over file values, requiring all three.
fn resolve(
    env_base_url: Option<String>,
    env_client_id: Option<String>,
    env_client_secret: Option<String>,
    file: Option<BrokerTable>,
) -> Result<BrokerConfig, ConfigError> {
    let file = file.unwrap_or_default();
    let from_file = [&env_base_url, &env_client_id, &env_client_secret]
        .iter()
        .any(|v| v.is_none());

    let base_url = env_base_url
        .or(file.base_url.and_then(non_blank))
        .ok_or(ConfigError::Missing("base_url"))?;
    let client_id = env_client_id
        .or(file.client_id.and_then(non_blank))
        .ok_or(ConfigError::Missing("client_id"))?;
    let client_secret = env_client_secret
        .or(file.client_secret.and_then(non_blank))
        .ok_or(ConfigError::Missing("client_secret"))?;

    Ok(BrokerConfig {
        base_url: base_url.trim_end_matches('/').to_string(),
        client_id,
        client_secret,
        source: if from_file {
            ConfigSource::ConfigFile
        } else {
            ConfigSource::Environment
        },
    })
}

fn env_value(name: &str) -> Option<String> {
    std::env::var(name).ok().and_then(non_blank)
}

fn non_blank(value: String) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Get the path to the configuration file
fn get_config_file_path() -> Option<PathBuf> {
    dirs::config_dir()
        .or_else(|| dirs::home_dir().map(|h| h.join(".config")))
        .map(|p| p.join("tickertape").join("config.toml"))
}

/// Load the configuration file, if one exists
fn load_config_file() -> Result<Option<ConfigFile>, ConfigError> {
    let Some(path) = get_config_file_path() else {
        return Ok(None);
    };

    if !path.exists() {
        return Ok(None);
    }

    let content = fs::read_to_string(&path).map_err(|source| ConfigError::Read {
        path: path.clone(),
        source,
    })?;
    let config = toml::from_str(&content).map_err(|source| ConfigError::Parse {
        path: path.clone(),
        source,
    })?;
    tracing::debug!("loaded config from {:?}", path);
    Ok(Some(config))
}

/// Get the path to the config file for documentation purposes
pub fn config_file_path_string() -> String {
    get_config_file_path()
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| "~/.config/tickertape/config.toml".to_string())
}

/// Generate example config file content
pub fn generate_example_config() -> String {
    r#"# Tickertape Agent Configuration
# Place this file at: ~/.config/tickertape/config.toml

[broker]
# API endpoint URL of the brokerage
# base_url = "https://api.tradestation.com/v2"

# OAuth client credentials issued for your application
# client_id = "YOURCLIENTID"
# client_secret = "YOURCLIENTSECRET"
"#
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file(base: Option<&str>, id: Option<&str>, secret: Option<&str>) -> BrokerTable {
        BrokerTable {
            base_url: base.map(String::from),
            client_id: id.map(String::from),
            client_secret: secret.map(String::from),
        }
    }

    #[test]
    fn resolve_requires_every_value() {
        let err = resolve(None, None, None, None).unwrap_err();
        assert!(matches!(err, ConfigError::Missing("base_url")));

        let err = resolve(
            Some("https://api.test".into()),
            None,
            None,
            Some(file(None, None, Some("s"))),
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Missing("client_id")));
    }

    #[test]
    fn environment_overrides_file() {
        let config = resolve(
            Some("https://env.test".into()),
            Some("env-id".into()),
            Some("env-secret".into()),
            Some(file(Some("https://file.test"), Some("file-id"), Some("file-secret"))),
        )
        .unwrap();
        assert_eq!(config.base_url, "https://env.test");
        assert_eq!(config.client_id, "env-id");
        assert_eq!(config.source, ConfigSource::Environment);
    }

    #[test]
    fn file_fills_missing_environment_values() {
        let config = resolve(
            Some("https://env.test".into()),
            None,
            None,
            Some(file(Some("https://file.test"), Some("file-id"), Some("file-secret"))),
        )
        .unwrap();
        assert_eq!(config.base_url, "https://env.test");
        assert_eq!(config.client_id, "file-id");
        assert_eq!(config.client_secret, "file-secret");
        assert_eq!(config.source, ConfigSource::ConfigFile);
    }

    #[test]
    fn base_url_loses_trailing_slash() {
        let config = BrokerConfig::new("https://api.test/", "id", "secret");
        assert_eq!(config.base_url, "https://api.test");

        let config = resolve(
            Some("https://api.test/".into()),
            Some("id".into()),
            Some("secret".into()),
            None,
        )
        .unwrap();
        assert_eq!(config.base_url, "https://api.test");
    }

    #[test]
    fn blank_file_values_count_as_missing() {
        let err = resolve(
            Some("https://api.test".into()),
            Some("id".into()),
            None,
            Some(file(None, None, Some("   "))),
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Missing("client_secret")));
    }

    #[test]
    fn example_config_parses() {
        let parsed: ConfigFile = toml::from_str(&generate_example_config()).unwrap();
        let broker = parsed.broker.expect("[broker] table present");
        assert!(broker.base_url.is_none());
        assert!(broker.client_id.is_none());
    }
}
