//! Configuration types for the logging subsystem.

use std::{path::PathBuf, time::Duration};

use opentelemetry::KeyValue;
use opentelemetry_sdk::Resource;
use tracing_appender::rolling::Rotation;
use tracing_subscriber::fmt::format::FmtSpan;

/// Default timeout for OTLP span exports.
const DEFAULT_OTLP_TIMEOUT: Duration = Duration::from_secs(10);

/// Configuration for the stdout logging layer
#[derive(Debug, Clone)]
pub struct StdoutConfig {
    /// Use JSON format instead of compact format
    pub json_format: bool,
    /// Span events to log
    pub fmt_span: FmtSpan,
}

impl Default for StdoutConfig {
    fn default() -> Self {
        Self {
            json_format: false,
            fmt_span: FmtSpan::NONE,
        }
    }
}

/// Configuration for file-based logging with rotation
#[derive(Debug, Clone)]
pub struct FileLoggingConfig {
    pub directory: PathBuf,
    /// Base filename prefix (e.g., "hubclient" -> "hubclient.2026-10-19")
    pub file_name_prefix: String,
    pub rotation: Rotation,
    pub json_format: bool,
}

impl FileLoggingConfig {
    pub fn new(directory: PathBuf, file_name_prefix: String) -> Self {
        Self {
            directory,
            file_name_prefix,
            rotation: Rotation::DAILY,
            json_format: false,
        }
    }

    pub fn with_rotation(mut self, rotation: Rotation) -> Self {
        self.rotation = rotation;
        self
    }

    pub fn with_json_format(mut self, json_format: bool) -> Self {
        self.json_format = json_format;
        self
    }
}

/// Resource attributes attached to exported spans.
#[derive(Debug, Clone)]
pub struct ResourceConfig {
    pub service_name: String,
    pub service_version: Option<String>,
    /// Deployment environment (e.g., "mainnet", "testnet", "local")
    pub deployment_environment: Option<String>,
    pub custom_attributes: Vec<KeyValue>,
}

impl ResourceConfig {
    pub fn new(service_name: String) -> Self {
        Self {
            service_name,
            service_version: None,
            deployment_environment: None,
            custom_attributes: Vec::new(),
        }
    }

    /// Build OpenTelemetry Resource from config
    pub fn build_resource(&self) -> Resource {
        let mut attributes = vec![KeyValue::new("service.name", self.service_name.clone())];

        if let Some(version) = &self.service_version {
            attributes.push(KeyValue::new("service.version", version.clone()));
        }

        if let Some(env) = &self.deployment_environment {
            attributes.push(KeyValue::new("deployment.environment", env.clone()));
        }

        attributes.extend(self.custom_attributes.iter().cloned());

        Resource::new(attributes)
    }
}

/// Main logger configuration
#[derive(Debug, Clone)]
pub struct LoggerConfig {
    pub resource: ResourceConfig,
    /// OTLP endpoint URL, spans are only exported when set
    pub otel_url: Option<String>,
    pub otlp_timeout: Duration,
    pub stdout_config: StdoutConfig,
    pub file_logging_config: Option<FileLoggingConfig>,
}

impl LoggerConfig {
    pub fn new(service_name: String) -> Self {
        Self {
            resource: ResourceConfig::new(service_name),
            otel_url: None,
            otlp_timeout: DEFAULT_OTLP_TIMEOUT,
            stdout_config: StdoutConfig::default(),
            file_logging_config: None,
        }
    }

    pub fn with_otlp_url(mut self, url: String) -> Self {
        self.otel_url = Some(url);
        self
    }

    pub fn with_otlp_timeout(mut self, timeout: Duration) -> Self {
        self.otlp_timeout = timeout;
        self
    }

    pub fn with_service_version(mut self, version: String) -> Self {
        self.resource.service_version = Some(version);
        self
    }

    pub fn with_deployment_environment(mut self, env: String) -> Self {
        self.resource.deployment_environment = Some(env);
        self
    }

    pub fn with_json_logging(mut self, enabled: bool) -> Self {
        self.stdout_config.json_format = enabled;
        self
    }

    pub fn with_file_logging(mut self, config: FileLoggingConfig) -> Self {
        self.file_logging_config = Some(config);
        self
    }

    pub fn with_fmt_span(mut self, fmt_span: FmtSpan) -> Self {
        self.stdout_config.fmt_span = fmt_span;
        self
    }

    pub fn add_resource_attribute(mut self, key: &str, value: String) -> Self {
        self.resource
            .custom_attributes
            .push(KeyValue::new(key.to_owned(), value));
        self
    }
}
