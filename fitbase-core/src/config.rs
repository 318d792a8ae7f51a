//! Connection settings for the hosted tabular service.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_TIMEOUT_MS: u64 = 30_000;

/// Where the data service lives and how to authenticate against it.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServiceConfig {
    pub base_url: String,
    pub base_id: String,
    pub api_key: String,
    #[serde(default = "default_timeout_ms")]
    pub request_timeout_ms: u64,
}

fn default_timeout_ms() -> u64 {
    DEFAULT_TIMEOUT_MS
}

impl fmt::Debug for ServiceConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceConfig")
            .field("base_url", &self.base_url)
            .field("base_id", &self.base_id)
            .field("api_key", &"[REDACTED]")
            .field("request_timeout_ms", &self.request_timeout_ms)
            .finish()
    }
}

impl ServiceConfig {
    pub fn new(
        base_url: impl Into<String>,
        base_id: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Self {
        Self {
            base_url: base_url.into(),
            base_id: base_id.into(),
            api_key: api_key.into(),
            request_timeout_ms: DEFAULT_TIMEOUT_MS,
        }
    }

    /// Resolve configuration from `--config <path>`, then `FITBASE_CONFIG`,
    /// then the process environment.
    pub fn load() -> Result<Self, ConfigError> {
        let config = match config_path_from_args().or_else(config_path_from_env) {
            Some(path) => Self::from_path(&path)?,
            None => Self::from_env()?,
        };
        config.validate()?;
        Ok(config)
    }

    /// Environment variables:
    /// - `TAYLORDB_BASE_URL`
    /// - `TAYLORDB_SERVER_ID` (or `TAYLORDB_BASE_ID`)
    /// - `TAYLORDB_API_TOKEN`
    /// - `TAYLORDB_TIMEOUT_MS` (default: 30000)
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let required = |key: &str| {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .ok_or_else(|| ConfigError::MissingRequired {
                    field: key.to_string(),
                })
        };

        let base_url = required("TAYLORDB_BASE_URL")?;
        let base_id = required("TAYLORDB_SERVER_ID").or_else(|_| required("TAYLORDB_BASE_ID"))?;
        let api_key = required("TAYLORDB_API_TOKEN")?;
        let request_timeout_ms = match lookup("TAYLORDB_TIMEOUT_MS") {
            Some(raw) => raw.trim().parse().map_err(|_| ConfigError::InvalidValue {
                field: "TAYLORDB_TIMEOUT_MS".to_string(),
                value: raw.clone(),
                reason: "must be a whole number of milliseconds".to_string(),
            })?,
            None => DEFAULT_TIMEOUT_MS,
        };

        Ok(Self {
            base_url,
            base_id,
            api_key,
            request_timeout_ms,
        })
    }

    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        Self::from_toml(&contents)
    }

    pub fn from_toml(source: &str) -> Result<Self, ConfigError> {
        toml::from_str(source).map_err(|e| ConfigError::Parse {
            reason: e.to_string(),
        })
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let base_url = self.base_url.trim();
        if base_url.is_empty() {
            return Err(ConfigError::MissingRequired {
                field: "base_url".to_string(),
            });
        }
        if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
            return Err(ConfigError::InvalidValue {
                field: "base_url".to_string(),
                value: self.base_url.clone(),
                reason: "must start with http:// or https://".to_string(),
            });
        }
        if self.base_id.trim().is_empty() {
            return Err(ConfigError::MissingRequired {
                field: "base_id".to_string(),
            });
        }
        if self.api_key.trim().is_empty() {
            return Err(ConfigError::MissingRequired {
                field: "api_key".to_string(),
            });
        }
        if self.request_timeout_ms == 0 {
            return Err(ConfigError::InvalidValue {
                field: "request_timeout_ms".to_string(),
                value: "0".to_string(),
                reason: "must be > 0".to_string(),
            });
        }
        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

fn config_path_from_env() -> Option<PathBuf> {
    std::env::var("FITBASE_CONFIG").ok().map(PathBuf::from)
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
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_from_lookup_reads_all_fields() {
        let config = ServiceConfig::from_lookup(lookup(&[
            ("TAYLORDB_BASE_URL", "https://api.taylordb.io"),
            ("TAYLORDB_SERVER_ID", "base_1"),
            ("TAYLORDB_API_TOKEN", "secret"),
            ("TAYLORDB_TIMEOUT_MS", "5000"),
        ]))
        .unwrap();
        assert_eq!(config.base_id, "base_1");
        assert_eq!(config.timeout(), Duration::from_secs(5));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_base_id_fallback_and_default_timeout() {
        let config = ServiceConfig::from_lookup(lookup(&[
            ("TAYLORDB_BASE_URL", "https://api.taylordb.io"),
            ("TAYLORDB_BASE_ID", "base_2"),
            ("TAYLORDB_API_TOKEN", "secret"),
        ]))
        .unwrap();
        assert_eq!(config.base_id, "base_2");
        assert_eq!(config.request_timeout_ms, DEFAULT_TIMEOUT_MS);
    }

    #[test]
    fn test_missing_token_is_reported() {
        let err = ServiceConfig::from_lookup(lookup(&[
            ("TAYLORDB_BASE_URL", "https://api.taylordb.io"),
            ("TAYLORDB_SERVER_ID", "base_1"),
        ]))
        .unwrap_err();
        assert_eq!(
            err,
            ConfigError::MissingRequired {
                field: "TAYLORDB_API_TOKEN".to_string()
            }
        );
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = ServiceConfig::new("ftp://example.com", "b", "k");
        assert!(matches!(config.validate(), Err(ConfigError::InvalidValue { .. })));
        config.base_url = "https://example.com".to_string();
        config.request_timeout_ms = 0;
        assert!(matches!(config.validate(), Err(ConfigError::InvalidValue { .. })));
    }

    #[test]
    fn test_from_toml() {
        let config = ServiceConfig::from_toml(
            r#"
            base_url = "https://api.taylordb.io"
            base_id = "base_1"
            api_key = "secret"
            "#,
        )
        .unwrap();
        assert_eq!(config.request_timeout_ms, DEFAULT_TIMEOUT_MS);
        assert!(matches!(
            ServiceConfig::from_toml("base_url = \"x\"\nunknown = 1"),
            Err(ConfigError::Parse { .. })
        ));
    }

    #[test]
    fn test_debug_redacts_api_key() {
        let config = ServiceConfig::new("https://api.taylordb.io", "base_1", "super-secret");
        let debug = format!("{:?}", config);
        assert!(!debug.contains("super-secret"));
        assert!(debug.contains("[REDACTED]"));
    }
}
