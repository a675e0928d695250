use std::path::PathBuf;

use hubclient_config::{FeeSetting, KeyringBackend, SettlementConfig};
use hubclient_wasm::ContractAddress;

use crate::ChainClientError;

/// Read-only view of the parameters a [`ChainClient`](crate::ChainClient) was
/// built from.
#[derive(Debug, Clone)]
pub struct ClientContext {
    node_address: String,
    account_name: String,
    address_prefix: String,
    rollapp_id: String,
    gas_limit: u64,
    fee: FeeSetting,
    keyring_backend: KeyringBackend,
    keyring_home_dir: PathBuf,
    contract: ContractAddress,
}

impl ClientContext {
    /// Validates `config` and captures it. Fails if the fee mode or rollapp
    /// id is invalid, or if no contract address is set.
    pub fn from_config(config: &SettlementConfig) -> Result<Self, ChainClientError> {
        config.validate()?;
        let fee = config.fee_setting()?;
        let contract = ContractAddress::new(config.contract.as_str())?;
        if config.node_address.trim().is_empty() {
            return Err(ChainClientError::InvalidNodeAddress(config.node_address.clone()));
        }

        Ok(Self {
            node_address: config.node_address.clone(),
            account_name: config.dym_account_name.clone(),
            address_prefix: config.address_prefix.clone(),
            rollapp_id: config.rollapp_id.clone(),
            gas_limit: config.gas_limit,
            fee,
            keyring_backend: config.keyring_backend,
            keyring_home_dir: config.keyring_home_dir.clone(),
            contract,
        })
    }

    pub fn node_address(&self) -> &str {
        &self.node_address
    }

    pub fn account_name(&self) -> &str {
        &self.account_name
    }

    pub fn address_prefix(&self) -> &str {
        &self.address_prefix
    }

    pub fn rollapp_id(&self) -> &str {
        &self.rollapp_id
    }

    /// Zero means the gas limit is estimated per transaction.
    pub fn gas_limit(&self) -> u64 {
        self.gas_limit
    }

    pub fn fee(&self) -> &FeeSetting {
        &self.fee
    }

    pub fn keyring_backend(&self) -> KeyringBackend {
        self.keyring_backend
    }

    pub fn keyring_home_dir(&self) -> &PathBuf {
        &self.keyring_home_dir
    }

    pub fn contract(&self) -> &ContractAddress {
        &self.contract
    }
}
