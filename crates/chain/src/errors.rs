use hubclient_config::ConfigError;
use hubclient_wasm::{EmptyContractAddress, ExecutionError};
use thiserror::Error;

use crate::{broadcast::BroadcastError, events::EventError};

/// Capability missing from a [`ChainClientBuilder`](crate::ChainClientBuilder).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("chain client built without {0}")]
pub struct MissingCapability(pub &'static str);

#[derive(Debug, Error)]
pub enum AccountError {
    #[error("account not found: {0}")]
    NotFound(String),
}

/// Errors returned by [`ChainClient`](crate::ChainClient).
#[derive(Debug, Error)]
pub enum ChainClientError {
    #[error("invalid config: {0}")]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Incomplete(#[from] MissingCapability),

    #[error("no contract address configured")]
    MissingContract,

    #[error("invalid node address {0:?}")]
    InvalidNodeAddress(String),

    #[error("query executor: {0}")]
    Executor(#[from] ExecutionError),

    #[error("event listener: {0}")]
    Event(#[from] EventError),

    #[error(transparent)]
    Account(#[from] AccountError),

    #[error("no transaction broadcaster configured")]
    BroadcastUnavailable,

    #[error("broadcast: {0}")]
    Broadcast(#[from] BroadcastError),
}

impl From<EmptyContractAddress> for ChainClientError {
    fn from(_: EmptyContractAddress) -> Self {
        Self::MissingContract
    }
}
