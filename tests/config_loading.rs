use std::io::Write;

use superagent_core::config::{AppConfig, InputPolicy};
use superagent_core::SuperAgentError;

#[test]
fn test_load_full_config_from_file() {
    let toml_content = r#"
[engine]
agent_timeout_secs = 30
input_policy = "merge_predecessors"
event_capacity = 1024

[database]
path = "/tmp/superagent-test/superagent.db"

[gateway]
bind = "0.0.0.0:9999"

[journal]
enabled = false
"#;

    let mut tmp = tempfile::NamedTempFile::new().expect("create temp file");
    tmp.write_all(toml_content.as_bytes()).expect("write toml");

    let config = AppConfig::load(tmp.path()).expect("load config");

    assert_eq!(config.engine.agent_timeout_secs, Some(30));
    assert_eq!(config.engine.input_policy, InputPolicy::MergePredecessors);
    assert_eq!(config.engine.event_capacity, 1024);
    assert_eq!(
        config.database_path().to_str(),
        Some("/tmp/superagent-test/superagent.db")
    );
    assert_eq!(config.gateway.bind, "0.0.0.0:9999");
    assert!(!config.journal.enabled);
    assert_eq!(config.agent_timeout(), Some(std::time::Duration::from_secs(30)));
}

#[test]
fn test_env_var_expansion_in_config() {
    std::env::set_var("SUPERAGENT_TEST_BIND", "10.0.0.1:8080");

    let toml_content = r#"
[gateway]
bind = "${SUPERAGENT_TEST_BIND}"
"#;

    let mut tmp = tempfile::NamedTempFile::new().expect("create temp file");
    tmp.write_all(toml_content.as_bytes()).expect("write toml");

    let config = AppConfig::load(tmp.path()).expect("load config");
    assert_eq!(config.gateway.bind, "10.0.0.1:8080");

    std::env::remove_var("SUPERAGENT_TEST_BIND");
}

#[test]
fn test_minimal_config_uses_defaults() {
    let toml_content = r#"
[gateway]
bind = "127.0.0.1:9000"
"#;

    let mut tmp = tempfile::NamedTempFile::new().expect("create temp file");
    tmp.write_all(toml_content.as_bytes()).expect("write toml");

    let config = AppConfig::load(tmp.path()).expect("load config");

    assert!(config.engine.agent_timeout_secs.is_none());
    assert_eq!(config.engine.input_policy, InputPolicy::PreviousOutput);
    assert_eq!(config.engine.event_capacity, 256);
    assert!(config.database.path.ends_with("superagent.db"));
    assert!(config.journal.enabled);
}

#[test]
fn test_missing_file_and_bad_toml() {
    let dir = tempfile::tempdir().expect("create temp dir");
    let missing = dir.path().join("nope.toml");

    let err = AppConfig::load(&missing).unwrap_err();
    assert!(matches!(err, SuperAgentError::ConfigNotFound(_)));
    assert!(AppConfig::load_or_default(&missing).is_ok());

    let bad = dir.path().join("bad.toml");
    std::fs::write(&bad, "[engine]\ninput_policy = \"round_robin\"\n").expect("write toml");
    let err = AppConfig::load(&bad).unwrap_err();
    assert!(matches!(err, SuperAgentError::Config(_)));
}

#[test]
fn test_zero_event_capacity_rejected() {
    let mut tmp = tempfile::NamedTempFile::new().expect("create temp file");
    tmp.write_all(b"[engine]\nevent_capacity = 0\n").expect("write toml");

    let err = AppConfig::load(tmp.path()).unwrap_err();
    match err {
        SuperAgentError::Config(message) => assert!(message.contains("event_capacity")),
        other => panic!("expected config error, got {other:?}"),
    }
}
