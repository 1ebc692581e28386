use std::io::Write;

use stackctl_core::config::{
    DEFAULT_API_URL, DEFAULT_CHECKPOINT_LIMIT, DEFAULT_MAX_CONSECUTIVE_FAILURES,
    DEFAULT_POLL_INTERVAL_MS,
};
use stackctl_core::{Config, ConfigError};
use tempfile::NamedTempFile;

#[test]
fn test_default_config() {
    let config = Config::default();
    assert_eq!(config.api.base_url, DEFAULT_API_URL);
    assert_eq!(config.poller.interval_ms, DEFAULT_POLL_INTERVAL_MS);
    assert_eq!(
        config.poller.max_consecutive_failures,
        DEFAULT_MAX_CONSECUTIVE_FAILURES
    );
    assert_eq!(config.backup.checkpoint_limit, DEFAULT_CHECKPOINT_LIMIT);
    assert!(config.validate().is_ok());
}

#[test]
fn test_submit_timeout_longer_than_poll_timeout() {
    let config = Config::default();
    assert!(config.api.submit_timeout() >= std::time::Duration::from_secs(30));
    assert!(config.api.poll_timeout() < config.api.submit_timeout());
}

#[test]
fn test_config_to_toml() {
    let toml_str = Config::default_config_string();
    assert!(toml_str.contains("[api]"));
    assert!(toml_str.contains("[poller]"));
    assert!(toml_str.contains("[backup]"));
    assert!(!toml_str.contains("token"));
}

#[test]
fn test_config_from_toml() {
    let toml_str = r#"
[api]
base_url = "https://ops.example.com/api/v1"

[poller]
interval_ms = 2000

[backup]
stack_id = "stack-7"
"#;
    let config: Config = toml::from_str(toml_str).unwrap();
    assert_eq!(config.api.base_url, "https://ops.example.com/api/v1");
    assert_eq!(config.poller.interval_ms, 2000);
    assert_eq!(
        config.poller.max_consecutive_failures,
        DEFAULT_MAX_CONSECUTIVE_FAILURES
    );
    assert_eq!(config.backup.stack_id.as_deref(), Some("stack-7"));
}

#[test]
fn test_from_file() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "[backup]\ncheckpoint_limit = 25").unwrap();

    let config = Config::from_file(file.path()).unwrap();
    assert_eq!(config.backup.checkpoint_limit, 25);
}

#[test]
fn test_zero_interval_rejected() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "[poller]\ninterval_ms = 0").unwrap();

    let result = Config::from_file(file.path());
    assert!(matches!(result, Err(ConfigError::Invalid(_))));
}

#[test]
fn test_malformed_file_rejected() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "[poller\ninterval_ms = 1").unwrap();

    let result = Config::from_file(file.path());
    assert!(matches!(result, Err(ConfigError::ParseError(_))));
}
