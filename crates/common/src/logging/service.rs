//! Logging setup shared by the binaries.

use std::path::PathBuf;

use tracing::info;

use super::{format_service_name, init, FileLoggingConfig, LoggerConfig, LoggingError};

/// Parameters for [`init_logging_from_config`], usually lifted from a
/// `[logging]` config section.
#[derive(Debug, Default)]
pub struct LoggingInitConfig<'a> {
    pub service_base_name: &'a str,
    /// Optional service label to append like prod or dev
    pub service_label: Option<&'a str>,
    pub otlp_url: Option<&'a str>,
    pub log_dir: Option<&'a PathBuf>,
    pub log_file_prefix: Option<&'a str>,
    pub json_format: Option<bool>,
    /// Used when `log_file_prefix` is not set.
    pub default_log_prefix: &'a str,
}

impl LoggingInitConfig<'_> {
    /// Turns the parameters into a [`LoggerConfig`].
    pub fn to_logger_config(&self) -> LoggerConfig {
        let service_name = format_service_name(self.service_base_name, self.service_label);
        let mut lconfig = LoggerConfig::new(service_name);

        if let Some(url) = self.otlp_url {
            lconfig = lconfig.with_otlp_url(url.to_owned());
        }

        if let Some(dir) = self.log_dir {
            let prefix = self
                .log_file_prefix
                .unwrap_or(self.default_log_prefix)
                .to_owned();
            lconfig = lconfig.with_file_logging(
                FileLoggingConfig::new(dir.clone(), prefix)
                    .with_json_format(self.json_format.unwrap_or(false)),
            );
        }

        if let Some(json_format) = self.json_format {
            lconfig = lconfig.with_json_logging(json_format);
        }

        lconfig
    }
}

/// Initializes logging and reports where output goes.
pub fn init_logging_from_config(config: LoggingInitConfig<'_>) -> Result<(), LoggingError> {
    let lconfig = config.to_logger_config();
    let file_config = lconfig.file_logging_config.clone();

    init(lconfig)?;

    if let Some(url) = config.otlp_url {
        info!(%url, "using OpenTelemetry tracing output");
    }
    if let Some(file_config) = &file_config {
        info!(
            log_dir = %file_config.directory.display(),
            log_prefix = %file_config.file_name_prefix,
            "file logging enabled"
        );
    }
    Ok(())
}
