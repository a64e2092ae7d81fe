use copilot_ask::analytics::{DataSource, Retention};
use copilot_ask::config::{AnalyticsConfig, ConfigError, DEFAULT_STORE_FILE, EPHEMERAL_STORE_FILE};
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

fn config_from(pairs: &[(&str, &str)]) -> Result<AnalyticsConfig, ConfigError> {
    let env: HashMap<String, String> =
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
    AnalyticsConfig::from_lookup(|key| env.get(key).cloned())
}

#[test]
fn test_defaults() {
    let config = config_from(&[]).unwrap();
    assert_eq!(config.recorder.data_source, DataSource::Real);
    assert_eq!(config.recorder.retention, Retention::default());
    assert_eq!(config.recorder.save_attempts, 2);
    assert!(config.persistence.enabled);
    assert_eq!(config.persistence.path, PathBuf::from(DEFAULT_STORE_FILE));
    assert_eq!(config.io_timeout, Duration::from_millis(2_000));
}

#[test]
fn test_ephemeral_host_uses_temp_dir() {
    let config = config_from(&[("VERCEL", "1")]).unwrap();
    assert_eq!(config.persistence.path, std::env::temp_dir().join(EPHEMERAL_STORE_FILE));

    let explicit =
        config_from(&[("VERCEL", "1"), ("ANALYTICS_STORE_PATH", "/data/a.json")]).unwrap();
    assert_eq!(explicit.persistence.path, PathBuf::from("/data/a.json"), "Explicit path wins");
}

#[test]
fn test_overrides() {
    let config = config_from(&[
        ("ANALYTICS_DATA_SOURCE", "Blended"),
        ("ANALYTICS_PERSIST", "off"),
        ("ANALYTICS_MAX_CLIENTS", "5"),
        ("ANALYTICS_MAX_SESSIONS", "6"),
        ("ANALYTICS_MAX_QUESTION_LENGTHS", "7"),
        ("ANALYTICS_SAVE_ATTEMPTS", "0"),
        ("ANALYTICS_IO_TIMEOUT_MS", "250"),
    ])
    .unwrap();

    assert_eq!(config.recorder.data_source, DataSource::Blended);
    assert!(!config.persistence.enabled);
    assert_eq!(
        config.recorder.retention,
        Retention { max_clients: 5, max_sessions: 6, max_question_lengths: 7 }
    );
    assert_eq!(config.recorder.save_attempts, 1, "At least one save attempt");
    assert_eq!(config.io_timeout, Duration::from_millis(250));
}

#[test]
fn test_invalid_values_name_the_variable() {
    let err = config_from(&[("ANALYTICS_DATA_SOURCE", "imaginary")]).unwrap_err();
    assert!(matches!(err, ConfigError::InvalidValue { var: "ANALYTICS_DATA_SOURCE", .. }));

    let err = config_from(&[("ANALYTICS_PERSIST", "maybe")]).unwrap_err();
    assert!(err.to_string().contains("ANALYTICS_PERSIST"));

    let err = config_from(&[("ANALYTICS_MAX_CLIENTS", "-3")]).unwrap_err();
    assert!(matches!(err, ConfigError::InvalidValue { var: "ANALYTICS_MAX_CLIENTS", .. }));
}

#[test]
fn test_disabled_persistence_builds_memory_store() {
    let dir = tempfile::TempDir::new().unwrap();
    let path = dir.path().join("never.json");
    let config = config_from(&[
        ("ANALYTICS_PERSIST", "false"),
        ("ANALYTICS_STORE_PATH", path.to_str().unwrap()),
    ])
    .unwrap();

    let store = config.build_store(std::sync::Arc::new(copilot_ask::analytics::SystemClock));
    store.record_request(Some("203.0.113.42"), "hi", None);

    assert_eq!(store.snapshot().counters.total_requests, 1);
    assert!(!path.exists());
}
