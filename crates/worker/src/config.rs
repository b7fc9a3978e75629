//! Worker configuration loaded from environment variables.

use std::net::SocketAddr;
use std::time::Duration;

use saga::EngineConfig;
use saga::workflow::DEFAULT_TASK_QUEUE;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
#[error("Invalid value for {var}: {value:?} ({reason})")]
pub struct ConfigError {
    pub var: &'static str,
    pub value: String,
    pub reason: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// Worker configuration.
///
/// Reads from environment variables:
/// - `DATABASE_URL`: PostgreSQL journal (default: unset, in-memory journal)
/// - `TASK_QUEUE`: task queue of new executions (default: `"OrdersTaskQueue"`)
/// - `WORKFLOW_RUN_TIMEOUT_SECS`: maximum execution duration (default: `600`)
/// - `METRICS_ADDR`: Prometheus listener (default: `"0.0.0.0:9000"`)
/// - `RUST_LOG`: tracing filter directive (default: `"info"`)
/// - `LOG_FORMAT`: `text` or `json` (default: `text`)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub database_url: Option<String>,
    pub task_queue: String,
    pub run_timeout: Duration,
    pub metrics_addr: SocketAddr,
    pub log_filter: String,
    pub log_format: LogFormat,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Builds a configuration from any variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let run_timeout = match lookup("WORKFLOW_RUN_TIMEOUT_SECS") {
            Some(value) => match value.parse::<u64>() {
                Ok(secs) if secs > 0 => Duration::from_secs(secs),
                _ => {
                    return Err(invalid(
                        "WORKFLOW_RUN_TIMEOUT_SECS",
                        value,
                        "expected a positive number of seconds",
                    ));
                }
            },
            None => defaults.run_timeout,
        };

        let metrics_addr = match lookup("METRICS_ADDR") {
            Some(value) => value.parse().map_err(|e: std::net::AddrParseError| {
                invalid("METRICS_ADDR", value.clone(), e.to_string())
            })?,
            None => defaults.metrics_addr,
        };

        let log_format = match lookup("LOG_FORMAT").as_deref() {
            None | Some("text") => LogFormat::Text,
            Some("json") => LogFormat::Json,
            Some(other) => {
                return Err(invalid(
                    "LOG_FORMAT",
                    other.to_string(),
                    "expected text or json",
                ));
            }
        };

        Ok(Self {
            database_url: lookup("DATABASE_URL").filter(|url| !url.is_empty()),
            task_queue: lookup("TASK_QUEUE").unwrap_or(defaults.task_queue),
            run_timeout,
            metrics_addr,
            log_filter: lookup("RUST_LOG").unwrap_or(defaults.log_filter),
            log_format,
        })
    }

    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            task_queue: self.task_queue.clone(),
            run_timeout: self.run_timeout,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_url: None,
            task_queue: DEFAULT_TASK_QUEUE.to_string(),
            run_timeout: Duration::from_secs(600),
            metrics_addr: SocketAddr::from(([0, 0, 0, 0], 9000)),
            log_filter: "info".to_string(),
            log_format: LogFormat::Text,
        }
    }
}

fn invalid(var: &'static str, value: String, reason: impl Into<String>) -> ConfigError {
    ConfigError {
        var,
        value,
        reason: reason.into(),
    }
}
