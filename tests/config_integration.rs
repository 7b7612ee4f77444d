//! Integration tests for configuration loading from disk.

use agent_router::config::{ConfigError, EngineConfig, EnforcementMode, LogFormat, Transport};
use agent_router::telemetry::Severity;
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;

#[test]
fn example_config_loads_and_validates() {
    let config = EngineConfig::load(Some(Path::new("agent-router.example.toml"))).unwrap();
    config.validate().unwrap();

    assert_eq!(config.logging.format, LogFormat::Pretty);
    assert_eq!(config.ranking.free_fallback_model, "opencode/gpt-5-nano");
    assert_eq!(config.anomaly.auto_open_severity, Some(Severity::Critical));
    assert_eq!(config.budget.enforcement, EnforcementMode::Warn);
    assert_eq!(config.budget.daily_limit_usd, Some(25.0));
    assert_eq!(config.collaborators.len(), 2);

    match &config.collaborators[0].transport {
        Transport::Remote { url, headers } => {
            assert!(url.starts_with("https://"));
            assert!(headers.contains_key("Authorization"));
        }
        other => panic!("expected remote transport, got {:?}", other),
    }
    assert_eq!(config.collaborators[1].transport.kind(), "local");
}

#[test]
fn example_config_matches_defaults_where_unchanged() {
    let config = EngineConfig::load(Some(Path::new("agent-router.example.toml"))).unwrap();
    let defaults = EngineConfig::default();
    assert_eq!(config.ranking, defaults.ranking);
    assert_eq!(config.canary, defaults.canary);
    assert_eq!(config.forecast, defaults.forecast);
}

#[test]
fn invalid_section_is_reported_with_field() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "[ranking]\nchain_depth = 0").unwrap();

    let config = EngineConfig::load(Some(file.path())).unwrap();
    match config.validate() {
        Err(ConfigError::Validation { field, .. }) => assert_eq!(field, "ranking"),
        other => panic!("expected validation error, got {:?}", other),
    }
}

#[test]
fn malformed_toml_is_a_parse_error() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "[ranking\nchain_depth = ").unwrap();
    assert!(matches!(
        EngineConfig::load(Some(file.path())),
        Err(ConfigError::Parse(_))
    ));
}

#[test]
fn missing_file_is_not_found() {
    assert!(matches!(
        EngineConfig::load(Some(Path::new("/nonexistent/agent-router.toml"))),
        Err(ConfigError::NotFound(_))
    ));
}
