//! Unit tests for the logging subsystem.

use std::{path::PathBuf, time::Duration};

use super::{format_service_name, types::*, LoggingInitConfig, Rotation};

#[test]
fn test_format_service_name() {
    assert_eq!(format_service_name("hubclient", None), "hubclient");
    assert_eq!(format_service_name("hubclient", Some("dev")), "hubclient%dev");
}

#[test]
fn test_resource_config_build() {
    let config = ResourceConfig {
        service_name: "hubclient".to_string(),
        service_version: Some("0.1.0".to_string()),
        deployment_environment: Some("testnet".to_string()),
        custom_attributes: vec![],
    };

    let resource = config.build_resource();
    let attrs: Vec<_> = resource.iter().collect();

    assert!(attrs
        .iter()
        .any(|(key, value)| key.as_str() == "service.name" && value.as_str() == "hubclient"));
    assert!(attrs
        .iter()
        .any(|(key, value)| key.as_str() == "service.version" && value.as_str() == "0.1.0"));
    assert!(attrs.iter().any(|(key, value)| key.as_str() == "deployment.environment"
        && value.as_str() == "testnet"));
}

#[test]
fn test_logger_config_builder_pattern() {
    let config = LoggerConfig::new("hubclient".to_string())
        .with_service_version("0.1.0".to_string())
        .with_json_logging(true)
        .with_otlp_timeout(Duration::from_secs(3))
        .add_resource_attribute("rollapp", "rollapp_1234-1".to_string());

    assert_eq!(config.resource.service_version, Some("0.1.0".to_string()));
    assert!(config.stdout_config.json_format);
    assert_eq!(config.otlp_timeout, Duration::from_secs(3));
    assert_eq!(config.resource.custom_attributes.len(), 1);
    assert!(config.otel_url.is_none());
}

#[test]
fn test_file_logging_config() {
    let config = FileLoggingConfig::new(PathBuf::from("/tmp/logs"), "hub".to_string())
        .with_rotation(Rotation::HOURLY)
        .with_json_format(true);

    assert_eq!(config.file_name_prefix, "hub");
    assert!(config.json_format);
}

#[test]
fn test_init_config_uses_default_prefix() {
    let dir = PathBuf::from("/var/log/hubclient");
    let init = LoggingInitConfig {
        service_base_name: "hubclient-query",
        service_label: Some("prod"),
        log_dir: Some(&dir),
        default_log_prefix: "hubclient",
        ..Default::default()
    };

    let lconfig = init.to_logger_config();
    assert_eq!(lconfig.resource.service_name, "hubclient-query%prod");
    let file = lconfig.file_logging_config.unwrap();
    assert_eq!(file.directory, dir);
    assert_eq!(file.file_name_prefix, "hubclient");
    assert!(!lconfig.stdout_config.json_format);
}

#[test]
fn test_init_config_without_log_dir() {
    let init = LoggingInitConfig {
        service_base_name: "hubclient-query",
        otlp_url: Some("http://localhost:4317"),
        json_format: Some(true),
        default_log_prefix: "hubclient",
        ..Default::default()
    };

    let lconfig = init.to_logger_config();
    assert!(lconfig.file_logging_config.is_none());
    assert_eq!(lconfig.otel_url.as_deref(), Some("http://localhost:4317"));
    assert!(lconfig.stdout_config.json_format);
}
