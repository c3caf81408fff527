//! Configuration management

use crate::error::{ErrorContext, GatekeeperError, GatekeeperResult};
use crate::logging::LoggingConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default backend location, matching the console's development setup
pub const DEFAULT_BASE_URL: &str = "http://localhost:5000";

pub const ENV_API_URL: &str = "GATEKEEPER_API_URL";
pub const ENV_SESSION_DIR: &str = "GATEKEEPER_SESSION_DIR";
pub const ENV_LOG_LEVEL: &str = "GATEKEEPER_LOG_LEVEL";

/// Top-level configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GatekeeperConfig {
    pub api: ApiSettings,
    pub storage: StorageSettings,
    pub logging: LoggingConfig,
}

/// Where and how to reach the IAM backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiSettings {
    pub base_url: String,
    /// Per-request timeout; `None` leaves it to the transport and the network
    pub timeout_seconds: Option<u64>,
    pub user_agent: String,
}

/// Durable session storage location
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageSettings {
    pub session_dir: PathBuf,
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout_seconds: None,
            user_agent: format!("gatekeeper/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl Default for StorageSettings {
    fn default() -> Self {
        let base = dirs::data_local_dir()
            .or_else(dirs::home_dir)
            .unwrap_or_else(|| PathBuf::from("."));
        Self {
            session_dir: base.join("gatekeeper").join("session"),
        }
    }
}

impl GatekeeperConfig {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> GatekeeperResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| GatekeeperError::Config {
            message: format!("Failed to read config file: {}", e),
            source: Some(Box::new(e)),
            context: ErrorContext::new("config")
                .with_operation("read_file")
                .with_suggestion("Check if the config file exists and is readable"),
        })?;

        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> GatekeeperResult<Self> {
        toml::from_str(content).map_err(|e| GatekeeperError::Config {
            message: format!("Failed to parse config: {}", e),
            source: Some(Box::new(e)),
            context: ErrorContext::new("config")
                .with_operation("parse_toml")
                .with_suggestion("Check TOML syntax in config file"),
        })
    }

    /// Save configuration to a TOML file, creating parent directories
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> GatekeeperResult<()> {
        let path = path.as_ref();
        let content = toml::to_string_pretty(self).map_err(|e| GatekeeperError::Config {
            message: format!("Failed to serialize config: {}", e),
            source: Some(Box::new(e)),
            context: ErrorContext::new("config").with_operation("serialize_toml"),
        })?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        std::fs::write(path, content).map_err(|e| GatekeeperError::Config {
            message: format!("Failed to write config file: {}", e),
            source: Some(Box::new(e)),
            context: ErrorContext::new("config")
                .with_operation("write_file")
                .with_suggestion("Check if the directory exists and is writable"),
        })?;

        Ok(())
    }

    /// Apply `GATEKEEPER_*` environment overrides on top of the file values
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    pub(crate) fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup(ENV_API_URL).filter(|v| !v.is_empty()) {
            self.api.base_url = url;
        }
        if let Some(dir) = lookup(ENV_SESSION_DIR).filter(|v| !v.is_empty()) {
            self.storage.session_dir = PathBuf::from(dir);
        }
        if let Some(level) = lookup(ENV_LOG_LEVEL).filter(|v| !v.is_empty()) {
            self.logging.level = level;
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> GatekeeperResult<()> {
        let url = url::Url::parse(&self.api.base_url).map_err(|e| GatekeeperError::Config {
            message: format!("Invalid api.base_url '{}': {}", self.api.base_url, e),
            source: Some(Box::new(e)),
            context: ErrorContext::new("config")
                .with_operation("validate")
                .with_suggestion("Use an absolute URL such as http://localhost:5000"),
        })?;

        if !matches!(url.scheme(), "http" | "https") {
            return Err(GatekeeperError::Config {
                message: format!("api.base_url must use http or https, got '{}'", url.scheme()),
                source: None,
                context: ErrorContext::new("config").with_operation("validate"),
            });
        }

        if self.api.timeout_seconds == Some(0) {
            return Err(GatekeeperError::Config {
                message: "api.timeout_seconds must be greater than 0 when set".to_string(),
                source: None,
                context: ErrorContext::new("config")
                    .with_operation("validate")
                    .with_suggestion("Remove the key to disable the timeout"),
            });
        }

        if self.storage.session_dir.as_os_str().is_empty() {
            return Err(GatekeeperError::Config {
                message: "storage.session_dir must not be empty".to_string(),
                source: None,
                context: ErrorContext::new("config").with_operation("validate"),
            });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = GatekeeperConfig::default();
        assert_eq!(config.api.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.api.timeout_seconds, None);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn partial_file_keeps_defaults() {
        let config = GatekeeperConfig::from_toml_str(
            r#"
            [api]
            base_url = "https://iam.example.com"
            "#,
        )
        .expect("config parses");
        assert_eq!(config.api.base_url, "https://iam.example.com");
        assert_eq!(config.storage, StorageSettings::default());
    }

    #[test]
    fn rejects_bad_values() {
        let mut config = GatekeeperConfig::default();
        config.api.base_url = "ftp://iam.example.com".to_string();
        assert!(config.validate().is_err());

        let mut config = GatekeeperConfig::default();
        config.api.timeout_seconds = Some(0);
        assert!(config.validate().is_err());

        let mut config = GatekeeperConfig::default();
        config.api.base_url = "not a url".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn env_overrides_win() {
        let mut config = GatekeeperConfig::default();
        config.apply_overrides(|key| match key {
            ENV_API_URL => Some("http://10.0.0.5:5000".to_string()),
            ENV_SESSION_DIR => Some("/tmp/gk".to_string()),
            _ => None,
        });
        assert_eq!(config.api.base_url, "http://10.0.0.5:5000");
        assert_eq!(config.storage.session_dir, PathBuf::from("/tmp/gk"));
        assert_eq!(config.logging.level, LoggingConfig::default().level);
    }

    #[test]
    fn save_and_reload() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("nested").join("config.toml");

        let mut config = GatekeeperConfig::default();
        config.api.timeout_seconds = Some(15);
        config.save_to_file(&path).expect("config saves");

        let loaded = GatekeeperConfig::from_file(&path).expect("config loads");
        assert_eq!(loaded, config);
    }
}
