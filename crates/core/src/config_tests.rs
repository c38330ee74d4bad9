use super::*;
use std::io::Write;

#[test]
fn defaults_match_documented_values() {
    let config = Config::default();
    assert_eq!(config.retry.base_ms, 1_000);
    assert_eq!(config.retry.cap_ms, 60_000);
    assert_eq!(config.retry.max_attempts, 5);
    assert_eq!(config.lock.timeout_ms, 10_000);
    assert_eq!(config.lock.stale_ms, 300_000);
    assert_eq!(config.bus.history_size, 1000);
    assert_eq!(config.bus.subscriber_queue, 4096);
    assert_eq!(config.health.interval_ms, 30_000);
    assert!(matches!(config.execution.mode, ExecutionMode::DryRun));
    assert!(config.archive.retain_source);
}

#[test]
fn file_layer_overrides_defaults() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "vault_path = \"/srv/vault\"\n[retry]\nmax_attempts = 3\n").unwrap();

    let config = Config::load(Some(file.path())).unwrap();
    assert_eq!(config.vault_path, PathBuf::from("/srv/vault"));
    assert_eq!(config.retry.max_attempts, 3);
    // Unset fields still take their defaults.
    assert_eq!(config.retry.base_ms, 1_000);
}

#[test]
fn missing_file_is_reported_as_config_error() {
    let err = Config::load(Some(Path::new("/nonexistent/vaultflow.toml"))).unwrap_err();
    assert!(matches!(err, ConfigError::Read { .. }));
}
