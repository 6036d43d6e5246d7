//! Integration tests for stratus-config

use std::io::Write;
use stratus_config::*;
use stratus_core::ConfigParams;

#[test]
fn test_read_yaml_file() {
    let mut file = tempfile::Builder::new().suffix(".yml").tempfile().unwrap();
    writeln!(
        file,
        "counters:\n  source: {{{{SERVICE}}}}\n  connection:\n    arn: arn:aws:lambda:us-east-1:123:function:fn\n"
    )
    .unwrap();

    let params = ConfigParams::from_tuples(&[("SERVICE", "orders")]);
    let path = file.path().to_str().unwrap().to_string();
    let config = read_config(Some("test"), &path, &params).unwrap();

    assert_eq!(config.get("counters.source"), Some("orders"));
    assert_eq!(
        config.get("counters.connection.arn"),
        Some("arn:aws:lambda:us-east-1:123:function:fn")
    );
}

#[test]
fn test_read_json_file() {
    let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
    write!(file, r#"{{"logger": {{"group": "app", "options": {{"interval": 1000}}}}}}"#).unwrap();

    let path = file.path().to_str().unwrap().to_string();
    let config = read_config(None, &path, &ConfigParams::new()).unwrap();

    assert_eq!(config.get_section("logger").get("options.interval"), Some("1000"));
}

#[test]
fn test_missing_file() {
    let err = read_config(None, "/nonexistent/stratus/config.yml", &ConfigParams::new()).unwrap_err();
    assert!(matches!(err, ConfigReadError::Io { .. }));

    let app_err: stratus_core::ApplicationError = err.into();
    assert_eq!(app_err.code, "FILE_NOT_FOUND");
}

#[test]
fn test_default_config_path() {
    // CONFIG_PATH is not set by the test harness
    if std::env::var(CONFIG_PATH_ENV).is_err() {
        assert_eq!(config_path(None), DEFAULT_CONFIG_PATH);
        assert_eq!(config_path(Some("./other.yml")), "./other.yml");
    }
}
