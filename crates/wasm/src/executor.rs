use std::fmt;

use async_trait::async_trait;
use thiserror::Error;

/// Bech32 address of the contract that holds the hub state.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ContractAddress(String);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("contract address must not be empty")]
pub struct EmptyContractAddress;

impl ContractAddress {
    pub fn new(addr: impl Into<String>) -> Result<Self, EmptyContractAddress> {
        let addr = addr.into();
        let addr = addr.trim();
        if addr.is_empty() {
            return Err(EmptyContractAddress);
        }
        Ok(Self(addr.to_owned()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContractAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for ContractAddress {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Runs read-only smart queries against a contract.
///
/// Implementations perform exactly one round trip per call: no retries and no
/// caching. Retry policy belongs to the caller.
#[cfg_attr(any(test, feature = "test-utils"), mockall::automock)]
#[async_trait]
pub trait ContractQueryExecutor: Send + Sync {
    /// Sends `payload` as the smart query message and returns the raw result bytes.
    async fn query_smart(
        &self,
        contract: &ContractAddress,
        payload: Vec<u8>,
    ) -> Result<Vec<u8>, ExecutionError>;
}

/// Errors from the underlying query round trip.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExecutionError {
    /// Node could not be reached or the request timed out.
    #[error("node unavailable: {0}")]
    Unavailable(String),

    /// Node answered with a JSON-RPC error.
    #[error("rpc error: {0}")]
    Rpc(String),

    #[error("contract not found: {0}")]
    ContractNotFound(String),

    /// Contract rejected the query or failed while executing it.
    #[error("contract query failed: {0}")]
    QueryFailed(String),

    /// Any other non-zero ABCI result.
    #[error("query rejected ({codespace}/{code}): {log}")]
    Rejected {
        codespace: String,
        code: u32,
        log: String,
    },

    #[error("malformed response: {0}")]
    MalformedResponse(String),
}

impl ExecutionError {
    pub fn unavailable(msg: impl Into<String>) -> Self {
        Self::Unavailable(msg.into())
    }

    pub fn rpc(msg: impl Into<String>) -> Self {
        Self::Rpc(msg.into())
    }

    pub fn malformed(msg: impl Into<String>) -> Self {
        Self::MalformedResponse(msg.into())
    }

    /// Whether the same call may succeed later without any change on the
    /// contract side.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Unavailable(_))
    }
}
