use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

use crate::analytics::{
    Clock, DataSource, EventStore, FileSnapshotStore, RecorderConfig, Retention, SnapshotStore,
};

pub const DEFAULT_STORE_FILE: &str = "analytics-data.json";
pub const EPHEMERAL_STORE_FILE: &str = "copilot-ask-analytics.json";

/// Variables whose presence marks a serverless host with a read-only working directory.
const EPHEMERAL_MARKERS: [&str; 2] = ["VERCEL", "AWS_LAMBDA_FUNCTION_NAME"];

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{var} has invalid value '{value}': {reason}")]
    InvalidValue {
        var: &'static str,
        value: String,
        reason: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistenceConfig {
    pub enabled: bool,
    pub path: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalyticsConfig {
    pub recorder: RecorderConfig,
    pub persistence: PersistenceConfig,
    /// Host-side bound on any single store call.
    pub io_timeout: Duration,
}

impl AnalyticsConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from any key/value source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let data_source = match get("ANALYTICS_DATA_SOURCE") {
            Some(v) => v.parse::<DataSource>().map_err(|reason| ConfigError::InvalidValue {
                var: "ANALYTICS_DATA_SOURCE",
                value: v.clone(),
                reason,
            })?,
            None => DataSource::Real,
        };

        let enabled = match get("ANALYTICS_PERSIST") {
            Some(v) => parse_bool("ANALYTICS_PERSIST", &v)?,
            None => true,
        };

        let path = match get("ANALYTICS_STORE_PATH") {
            Some(p) => PathBuf::from(p),
            None if EPHEMERAL_MARKERS.iter().any(|k| get(*k).is_some()) => {
                std::env::temp_dir().join(EPHEMERAL_STORE_FILE)
            }
            None => PathBuf::from(DEFAULT_STORE_FILE),
        };

        let defaults = Retention::default();
        let retention = Retention {
            max_clients: parse_num(&get, "ANALYTICS_MAX_CLIENTS", defaults.max_clients)?,
            max_sessions: parse_num(&get, "ANALYTICS_MAX_SESSIONS", defaults.max_sessions)?,
            max_question_lengths: parse_num(
                &get,
                "ANALYTICS_MAX_QUESTION_LENGTHS",
                defaults.max_question_lengths,
            )?,
        };

        let save_attempts: u32 = parse_num(&get, "ANALYTICS_SAVE_ATTEMPTS", 2)?;
        let timeout_ms: u64 = parse_num(&get, "ANALYTICS_IO_TIMEOUT_MS", 2_000)?;

        Ok(Self {
            recorder: RecorderConfig {
                data_source,
                retention,
                save_attempts: save_attempts.max(1),
            },
            persistence: PersistenceConfig { enabled, path },
            io_timeout: Duration::from_millis(timeout_ms.max(1)),
        })
    }

    /// Wires an event store according to this config.
    pub fn build_store(&self, clock: Arc<dyn Clock>) -> EventStore {
        let backing: Option<Box<dyn SnapshotStore>> = if self.persistence.enabled {
            Some(Box::new(FileSnapshotStore::new(self.persistence.path.clone())))
        } else {
            None
        };
        EventStore::with_parts(backing, clock, self.recorder.clone())
    }
}

fn parse_bool(var: &'static str, value: &str) -> Result<bool, ConfigError> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidValue {
            var,
            value: value.to_string(),
            reason: "expected a boolean".to_string(),
        }),
    }
}

fn parse_num<T, G>(get: &G, var: &'static str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
    G: Fn(&str) -> Option<String>,
{
    match get(var) {
        Some(v) => v.parse::<T>().map_err(|e| ConfigError::InvalidValue {
            var,
            value: v.clone(),
            reason: e.to_string(),
        }),
        None => Ok(default),
    }
}
