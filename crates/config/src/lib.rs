//! Configuration for the settlement hub client.

mod config;
mod errors;
mod load;

pub use config::{Config, FeeSetting, KeyringBackend, LoggingConfig, SettlementConfig};
pub use errors::ConfigError;
pub use load::{apply_override, load_config, load_config_str, parse_override, string_override};
