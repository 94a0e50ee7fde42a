//! Configuration loading for DevFusion.
//!
//! Configuration lives in `devfusion.yml`. Every field has a default, so an
//! empty file (or no file at all) is a valid configuration.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors from loading or adjusting configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("unknown config key '{key}'. Known keys: {known}")]
    UnknownKey { key: String, known: String },

    #[error("invalid value '{value}' for '{key}'")]
    InvalidValue { key: String, value: String },
}

pub type ConfigResult<T> = Result<T, ConfigError>;

/// Which document store backs rooms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    #[default]
    Firestore,
    Local,
    Memory,
}

/// Document store settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub backend: StoreBackend,
    /// Firestore project id.
    pub project_id: Option<String>,
    pub api_key: Option<String>,
    pub base_url: String,
    /// Collection holding room documents.
    pub collection: String,
    /// Directory for the `local` backend.
    pub local_dir: PathBuf,
    pub poll_interval_ms: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::default(),
            project_id: None,
            api_key: None,
            base_url: "https://firestore.googleapis.com/v1".to_string(),
            collection: "rooms".to_string(),
            local_dir: PathBuf::from(".devfusion/rooms"),
            poll_interval_ms: 1000,
        }
    }
}

impl StoreConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

/// AI assistant settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AssistantConfig {
    pub model: String,
    pub api_key: Option<String>,
    pub base_url: String,
    pub timeout_secs: u64,
}

impl Default for AssistantConfig {
    fn default() -> Self {
        Self {
            model: "gemini-2.0-flash".to_string(),
            api_key: None,
            base_url: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            timeout_secs: 60,
        }
    }
}

/// Remote execution settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunnerConfig {
    pub base_url: String,
    pub api_key: Option<String>,
    /// Value for the `X-RapidAPI-Host` header.
    pub api_host: Option<String>,
    pub timeout_secs: u64,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            base_url: "https://judge0-ce.p.rapidapi.com".to_string(),
            api_key: None,
            api_host: Some("judge0-ce.p.rapidapi.com".to_string()),
            timeout_secs: 30,
        }
    }
}

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DevFusionConfig {
    pub store: StoreConfig,
    pub assistant: AssistantConfig,
    pub runner: RunnerConfig,
}

/// Keys accepted by `apply_override`.
pub const OVERRIDE_KEYS: &[&str] = &[
    "store.backend",
    "store.project_id",
    "store.collection",
    "store.local_dir",
    "store.poll_interval_ms",
    "assistant.model",
    "assistant.base_url",
    "runner.base_url",
    "runner.api_host",
];

const MIN_POLL_INTERVAL_MS: u64 = 100;

impl DevFusionConfig {
    /// Loads configuration from a YAML file.
    pub fn from_file(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse_yaml(&content)
    }

    /// Parses configuration from YAML text. Blank input yields defaults.
    pub fn parse_yaml(content: &str) -> ConfigResult<Self> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(content)?)
    }

    /// Cleans up values that are easy to get slightly wrong by hand.
    pub fn normalize(&mut self) {
        for url in [
            &mut self.store.base_url,
            &mut self.assistant.base_url,
            &mut self.runner.base_url,
        ] {
            while url.ends_with('/') {
                url.pop();
            }
        }
        for key in [
            &mut self.store.api_key,
            &mut self.assistant.api_key,
            &mut self.runner.api_key,
        ] {
            if key.as_deref().is_some_and(|k| k.trim().is_empty()) {
                *key = None;
            }
        }
        self.store.poll_interval_ms = self.store.poll_interval_ms.max(MIN_POLL_INTERVAL_MS);
    }

    /// Applies a single `section.field=value` override.
    pub fn apply_override(&mut self, key: &str, value: &str) -> ConfigResult<()> {
        let invalid = || ConfigError::InvalidValue {
            key: key.to_string(),
            value: value.to_string(),
        };
        match key {
            "store.backend" => {
                self.store.backend = match value {
                    "firestore" => StoreBackend::Firestore,
                    "local" => StoreBackend::Local,
                    "memory" => StoreBackend::Memory,
                    _ => return Err(invalid()),
                };
            }
            "store.project_id" => self.store.project_id = Some(value.to_string()),
            "store.collection" => self.store.collection = value.to_string(),
            "store.local_dir" => self.store.local_dir = PathBuf::from(value),
            "store.poll_interval_ms" => {
                self.store.poll_interval_ms = value.parse().map_err(|_| invalid())?;
            }
            "assistant.model" => self.assistant.model = value.to_string(),
            "assistant.base_url" => self.assistant.base_url = value.to_string(),
            "runner.base_url" => self.runner.base_url = value.to_string(),
            "runner.api_host" => self.runner.api_host = Some(value.to_string()),
            other => {
                return Err(ConfigError::UnknownKey {
                    key: other.to_string(),
                    known: OVERRIDE_KEYS.join(", "),
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn empty_yaml_gives_defaults() {
        let config = DevFusionConfig::parse_yaml("   \n").unwrap();
        assert_eq!(config, DevFusionConfig::default());
        assert_eq!(config.assistant.model, "gemini-2.0-flash");
        assert_eq!(config.store.backend, StoreBackend::Firestore);
    }

    #[test]
    fn partial_yaml_keeps_other_defaults() {
        let config = DevFusionConfig::parse_yaml(
            r"
store:
  backend: local
  local_dir: /tmp/rooms
assistant:
  model: gemini-2.5-flash
",
        )
        .unwrap();
        assert_eq!(config.store.backend, StoreBackend::Local);
        assert_eq!(config.store.local_dir, PathBuf::from("/tmp/rooms"));
        assert_eq!(config.store.collection, "rooms");
        assert_eq!(config.assistant.model, "gemini-2.5-flash");
        assert_eq!(config.runner.timeout_secs, 30);
    }

    #[test]
    fn invalid_backend_is_a_yaml_error() {
        let err = DevFusionConfig::parse_yaml("store:\n  backend: redis\n").unwrap_err();
        assert!(matches!(err, ConfigError::Yaml(_)));
    }

    #[test]
    fn from_file_reads_yaml() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "runner:\n  base_url: http://localhost:2358/").unwrap();
        let mut config = DevFusionConfig::from_file(file.path()).unwrap();
        config.normalize();
        assert_eq!(config.runner.base_url, "http://localhost:2358");
    }

    #[test]
    fn from_missing_file_reports_path() {
        let err = DevFusionConfig::from_file("/definitely/not/here.yml").unwrap_err();
        assert!(err.to_string().contains("/definitely/not/here.yml"));
    }

    #[test]
    fn normalize_clamps_poll_interval_and_blank_keys() {
        let mut config = DevFusionConfig::default();
        config.store.poll_interval_ms = 5;
        config.assistant.api_key = Some("  ".to_string());
        config.normalize();
        assert_eq!(config.store.poll_interval_ms, MIN_POLL_INTERVAL_MS);
        assert!(config.assistant.api_key.is_none());
    }

    #[test]
    fn overrides_apply_and_reject_unknown_keys() {
        let mut config = DevFusionConfig::default();
        config.apply_override("store.backend", "memory").unwrap();
        config
            .apply_override("store.poll_interval_ms", "250")
            .unwrap();
        assert_eq!(config.store.backend, StoreBackend::Memory);
        assert_eq!(config.store.poll_interval(), Duration::from_millis(250));

        assert!(matches!(
            config.apply_override("store.backend", "redis"),
            Err(ConfigError::InvalidValue { .. })
        ));
        assert!(matches!(
            config.apply_override("store.api_key", "x"),
            Err(ConfigError::UnknownKey { .. })
        ));
    }
}
