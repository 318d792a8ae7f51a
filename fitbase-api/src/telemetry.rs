//! Tracing subscriber initialization
//!
//! Logs go to stderr so procedure output on stdout stays machine-readable.
//! The filter comes from `FITBASE_LOG`, then `RUST_LOG`; the format from
//! `FITBASE_LOG_FORMAT` (`json` or `pretty`).

use std::fmt;
use std::str::FromStr;
use tracing_subscriber::{fmt as subscriber_fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::error::{ApiError, ApiResult};

pub const DEFAULT_FILTER: &str = "fitbase_api=debug,info";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    #[default]
    Json,
    Pretty,
}

impl LogFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogFormat::Json => "json",
            LogFormat::Pretty => "pretty",
        }
    }
}

impl fmt::Display for LogFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "json" => Ok(LogFormat::Json),
            "pretty" | "text" => Ok(LogFormat::Pretty),
            other => Err(format!("unknown log format '{}'", other)),
        }
    }
}

/// Telemetry settings resolved from the environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TelemetryConfig {
    pub filter: String,
    pub format: LogFormat,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }
}

impl TelemetryConfig {
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let filter = lookup("FITBASE_LOG")
            .or_else(|| lookup("RUST_LOG"))
            .filter(|f| !f.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_FILTER.to_string());
        // An unrecognised format falls back to JSON rather than failing startup.
        let format = lookup("FITBASE_LOG_FORMAT")
            .and_then(|f| f.parse().ok())
            .unwrap_or_default();
        Self { filter, format }
    }
}

/// Install the global subscriber. Call once at startup.
pub fn init_tracing(config: &TelemetryConfig) -> ApiResult<()> {
    let env_filter = EnvFilter::try_new(&config.filter)
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    let registry = tracing_subscriber::registry().with(env_filter);

    let result = match config.format {
        LogFormat::Json => registry
            .with(subscriber_fmt::layer().json().with_writer(std::io::stderr))
            .try_init(),
        LogFormat::Pretty => registry
            .with(subscriber_fmt::layer().pretty().with_writer(std::io::stderr))
            .try_init(),
    };
    result.map_err(|e| ApiError::internal_error(format!("Failed to init subscriber: {}", e)))?;

    tracing::info!(
        filter = %config.filter,
        format = %config.format,
        "Telemetry initialized"
    );
    Ok(())
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
    fn test_defaults_without_environment() {
        let config = TelemetryConfig::from_lookup(lookup(&[]));
        assert_eq!(config.filter, DEFAULT_FILTER);
        assert_eq!(config.format, LogFormat::Json);
    }

    #[test]
    fn test_fitbase_log_wins_over_rust_log() {
        let config = TelemetryConfig::from_lookup(lookup(&[
            ("RUST_LOG", "warn"),
            ("FITBASE_LOG", "fitbase_api=trace"),
            ("FITBASE_LOG_FORMAT", "Pretty"),
        ]));
        assert_eq!(config.filter, "fitbase_api=trace");
        assert_eq!(config.format, LogFormat::Pretty);

        let config = TelemetryConfig::from_lookup(lookup(&[("RUST_LOG", "warn")]));
        assert_eq!(config.filter, "warn");
    }

    #[test]
    fn test_log_format_parse() {
        assert_eq!("json".parse::<LogFormat>(), Ok(LogFormat::Json));
        assert_eq!("text".parse::<LogFormat>(), Ok(LogFormat::Pretty));
        assert!("xml".parse::<LogFormat>().is_err());
    }
}
