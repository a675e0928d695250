//! Rollapp queries served from the hub contract.

use async_trait::async_trait;
use hubclient_types::rollapp::*;
use tokio_util::sync::CancellationToken;

use crate::{
    ops::{LatestStateIndexQuery, StateInfoQuery},
    ContractQueryClient, QueryError, RollappDomain,
};

pub type RollappClient = ContractQueryClient<RollappDomain>;

/// Query surface of the native rollapp module.
///
/// Only `latest_state_index` and `state_info` are backed by the contract;
/// every other method fails with [`QueryError::Unsupported`] without touching
/// the network.
#[cfg_attr(any(test, feature = "test-utils"), mockall::automock)]
#[async_trait]
pub trait RollappQuery: Send + Sync {
    async fn params(
        &self,
        cancel: &CancellationToken,
        req: &QueryParamsRequest,
    ) -> Result<QueryParamsResponse, QueryError>;

    async fn rollapp(
        &self,
        cancel: &CancellationToken,
        req: &QueryGetRollappRequest,
    ) -> Result<QueryGetRollappResponse, QueryError>;

    async fn rollapp_all(
        &self,
        cancel: &CancellationToken,
        req: &QueryAllRollappRequest,
    ) -> Result<QueryAllRollappResponse, QueryError>;

    async fn latest_state_index(
        &self,
        cancel: &CancellationToken,
        req: &QueryGetLatestStateIndexRequest,
    ) -> Result<QueryGetLatestStateIndexResponse, QueryError>;

    async fn state_info(
        &self,
        cancel: &CancellationToken,
        req: &QueryGetStateInfoRequest,
    ) -> Result<QueryGetStateInfoResponse, QueryError>;

    async fn state_info_all(
        &self,
        cancel: &CancellationToken,
        req: &QueryAllStateInfoRequest,
    ) -> Result<QueryAllStateInfoResponse, QueryError>;
}

#[async_trait]
impl RollappQuery for RollappClient {
    async fn params(
        &self,
        _cancel: &CancellationToken,
        _req: &QueryParamsRequest,
    ) -> Result<QueryParamsResponse, QueryError> {
        self.unsupported("params")
    }

    async fn rollapp(
        &self,
        _cancel: &CancellationToken,
        _req: &QueryGetRollappRequest,
    ) -> Result<QueryGetRollappResponse, QueryError> {
        self.unsupported("rollapp")
    }

    async fn rollapp_all(
        &self,
        _cancel: &CancellationToken,
        _req: &QueryAllRollappRequest,
    ) -> Result<QueryAllRollappResponse, QueryError> {
        self.unsupported("rollappAll")
    }

    async fn latest_state_index(
        &self,
        cancel: &CancellationToken,
        req: &QueryGetLatestStateIndexRequest,
    ) -> Result<QueryGetLatestStateIndexResponse, QueryError> {
        self.query::<LatestStateIndexQuery>(cancel, req).await
    }

    async fn state_info(
        &self,
        cancel: &CancellationToken,
        req: &QueryGetStateInfoRequest,
    ) -> Result<QueryGetStateInfoResponse, QueryError> {
        self.query::<StateInfoQuery>(cancel, req).await
    }

    async fn state_info_all(
        &self,
        _cancel: &CancellationToken,
        _req: &QueryAllStateInfoRequest,
    ) -> Result<QueryAllStateInfoResponse, QueryError> {
        self.unsupported("stateInfoAll")
    }
}
