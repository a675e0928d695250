use std::{fmt, marker::PhantomData, sync::Arc};

use tokio_util::sync::CancellationToken;
use tracing::*;

use crate::{
    envelope::{decode_response, encode_query},
    ContractAddress, ContractOperation, ContractQueryExecutor, Domain, QueryError,
};

/// Query client for one contract domain.
///
/// Holds the bound contract address and a shared executor handle, nothing
/// else. Cloning is cheap and every clone talks to the same executor.
pub struct ContractQueryClient<D> {
    executor: Arc<dyn ContractQueryExecutor>,
    contract: ContractAddress,
    _domain: PhantomData<fn() -> D>,
}

impl<D: Domain> ContractQueryClient<D> {
    pub fn new(executor: Arc<dyn ContractQueryExecutor>, contract: ContractAddress) -> Self {
        Self {
            executor,
            contract,
            _domain: PhantomData,
        }
    }

    pub fn contract(&self) -> &ContractAddress {
        &self.contract
    }

    /// Runs a supported operation end to end: encode, execute, decode.
    ///
    /// Returns [`QueryError::Cancelled`] as soon as `cancel` fires, dropping
    /// the in-flight execution.
    pub async fn query<O>(
        &self,
        cancel: &CancellationToken,
        request: &O::Request,
    ) -> Result<O::Response, QueryError>
    where
        O: ContractOperation<Domain = D>,
    {
        let cancelled = || {
            debug!(domain = D::NAME, operation = O::NAME, "query cancelled");
            QueryError::Cancelled {
                domain: D::NAME,
                operation: O::NAME,
            }
        };

        let payload = encode_query::<O>(request)?;
        if cancel.is_cancelled() {
            return Err(cancelled());
        }

        debug!(
            domain = D::NAME,
            operation = O::NAME,
            contract = %self.contract,
            len = payload.len(),
            "querying contract"
        );

        let res = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(cancelled()),
            res = self.executor.query_smart(&self.contract, payload) => res,
        };

        let bytes = res.map_err(|source| QueryError::Execution {
            domain: D::NAME,
            operation: O::NAME,
            source,
        })?;
        trace!(domain = D::NAME, operation = O::NAME, len = bytes.len(), "got contract response");

        decode_response::<O>(&bytes)
    }

    /// Error for an operation the contract has no equivalent of.
    pub(crate) fn unsupported<T>(&self, operation: &'static str) -> Result<T, QueryError> {
        debug!(domain = D::NAME, %operation, "rejecting unsupported query");
        Err(QueryError::Unsupported {
            domain: D::NAME,
            operation,
        })
    }
}

impl<D> Clone for ContractQueryClient<D> {
    fn clone(&self) -> Self {
        Self {
            executor: self.executor.clone(),
            contract: self.contract.clone(),
            _domain: PhantomData,
        }
    }
}

impl<D: Domain> fmt::Debug for ContractQueryClient<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContractQueryClient")
            .field("domain", &D::NAME)
            .field("contract", &self.contract)
            .finish_non_exhaustive()
    }
}
