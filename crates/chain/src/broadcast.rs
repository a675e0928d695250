//! Seam for submitting signed transactions to the hub.

use async_trait::async_trait;
use thiserror::Error;

use crate::{Account, ClientContext};

/// A message to include in a transaction, as a protobuf `Any`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxMsg {
    pub type_url: String,
    pub value: Vec<u8>,
}

impl TxMsg {
    pub fn new(type_url: impl Into<String>, value: Vec<u8>) -> Self {
        Self {
            type_url: type_url.into(),
            value,
        }
    }
}

/// Node's answer to a broadcast.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TxResponse {
    pub height: u64,
    pub txhash: String,
    pub code: u32,
    pub codespace: String,
    pub raw_log: String,
    pub gas_wanted: u64,
    pub gas_used: u64,
}

impl TxResponse {
    pub fn is_success(&self) -> bool {
        self.code == 0
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BroadcastError {
    #[error("no messages to broadcast")]
    Empty,

    #[error("signing: {0}")]
    Signing(String),

    #[error("transport: {0}")]
    Transport(String),

    /// The chain accepted the request but the transaction failed.
    #[error("tx {txhash} failed ({codespace}/{code}): {raw_log}")]
    Rejected {
        txhash: String,
        codespace: String,
        code: u32,
        raw_log: String,
    },
}

impl From<TxResponse> for BroadcastError {
    fn from(resp: TxResponse) -> Self {
        Self::Rejected {
            txhash: resp.txhash,
            codespace: resp.codespace,
            code: resp.code,
            raw_log: resp.raw_log,
        }
    }
}

/// Signs and submits transactions. Either the whole transaction lands or
/// none of it does.
#[cfg_attr(any(test, feature = "test-utils"), mockall::automock)]
#[async_trait]
pub trait TxBroadcaster: Send + Sync {
    async fn broadcast(
        &self,
        ctx: &ClientContext,
        signer: &Account,
        msgs: Vec<TxMsg>,
    ) -> Result<TxResponse, BroadcastError>;
}
