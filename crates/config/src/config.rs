use std::{fmt, path::PathBuf};

use serde::{Deserialize, Serialize};

use crate::ConfigError;

/// Default value for `address_prefix` in [`SettlementConfig`].
const DEFAULT_ADDRESS_PREFIX: &str = "dym";

/// Default value for `keyring_home_dir` in [`SettlementConfig`].
const DEFAULT_KEYRING_HOME_DIR: &str = "~/.dymension";

/// Default RPC request timeout in seconds.
const DEFAULT_RPC_TIMEOUT_SECS: u64 = 30;

/// Keyring backend holding the settlement account keys.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyringBackend {
    Os,
    File,
    Kwallet,
    Pass,
    #[default]
    Test,
    Memory,
}

impl fmt::Display for KeyringBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Os => "os",
            Self::File => "file",
            Self::Kwallet => "kwallet",
            Self::Pass => "pass",
            Self::Test => "test",
            Self::Memory => "memory",
        };
        f.write_str(s)
    }
}

/// How transaction fees are paid. Exactly one mode is configured.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeeSetting {
    /// Price per unit of gas, e.g. `0.025udym`.
    GasPrices(String),
    /// Flat fee per transaction, e.g. `5000udym`.
    Fees(String),
}

/// Connection, account and fee parameters for the settlement hub.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(test, derive(Default))]
pub struct SettlementConfig {
    #[serde(default)]
    pub keyring_backend: KeyringBackend,

    /// RPC endpoint of the hub node, e.g. `tcp://localhost:26657`.
    pub node_address: String,

    #[serde(default = "default_keyring_home_dir")]
    pub keyring_home_dir: PathBuf,

    /// Name of the account used to sign settlement transactions.
    pub dym_account_name: String,

    pub rollapp_id: String,

    #[serde(default)]
    pub gas_limit: u64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gas_prices: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gas_fees: Option<String>,

    #[serde(default = "default_address_prefix")]
    pub address_prefix: String,

    /// Address of the contract holding the rollapp and sequencer state.
    pub contract: String,

    /// Timeout for a single RPC request.
    #[serde(default = "default_rpc_timeout_secs")]
    pub rpc_timeout_secs: u64,
}

fn default_address_prefix() -> String {
    DEFAULT_ADDRESS_PREFIX.to_owned()
}

fn default_keyring_home_dir() -> PathBuf {
    DEFAULT_KEYRING_HOME_DIR.into()
}

fn default_rpc_timeout_secs() -> u64 {
    DEFAULT_RPC_TIMEOUT_SECS
}

fn non_empty(s: &Option<String>) -> Option<&str> {
    s.as_deref().filter(|s| !s.is_empty())
}

impl SettlementConfig {
    /// Checks the fee mode and rollapp id.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.fee_setting()?;
        if self.rollapp_id.is_empty() {
            return Err(ConfigError::MissingRollappId);
        }
        Ok(())
    }

    /// Returns the single configured fee mode. Empty strings count as unset.
    pub fn fee_setting(&self) -> Result<FeeSetting, ConfigError> {
        match (non_empty(&self.gas_prices), non_empty(&self.gas_fees)) {
            (Some(_), Some(_)) => Err(ConfigError::BothFeeModes),
            (None, None) => Err(ConfigError::NoFeeMode),
            (Some(prices), None) => Ok(FeeSetting::GasPrices(prices.to_owned())),
            (None, Some(fees)) => Ok(FeeSetting::Fees(fees.to_owned())),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct LoggingConfig {
    /// Service label to append to the service name (e.g., "prod", "dev").
    #[serde(skip_serializing_if = "Option::is_none")]
    pub service_label: Option<String>,

    /// OpenTelemetry OTLP endpoint URL for distributed tracing.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub otlp_url: Option<String>,

    /// Directory path for file-based logging.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_dir: Option<PathBuf>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_file_prefix: Option<String>,

    /// Use JSON format for logs instead of compact format.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub json_format: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub settlement: SettlementConfig,

    /// Logging configuration (optional section in TOML).
    #[serde(default)]
    pub logging: LoggingConfig,
}
