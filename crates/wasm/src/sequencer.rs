//! Sequencer queries served from the hub contract.

use async_trait::async_trait;
use hubclient_types::sequencer::*;
use tokio_util::sync::CancellationToken;

use crate::{ops::SequencersByRollappQuery, ContractQueryClient, QueryError, SequencerDomain};

pub type SequencerClient = ContractQueryClient<SequencerDomain>;

/// Query surface of the native sequencer module. Only
/// `sequencers_by_rollapp` is backed by the contract.
#[cfg_attr(any(test, feature = "test-utils"), mockall::automock)]
#[async_trait]
pub trait SequencerQuery: Send + Sync {
    async fn params(
        &self,
        cancel: &CancellationToken,
        req: &QueryParamsRequest,
    ) -> Result<QueryParamsResponse, QueryError>;

    async fn sequencer(
        &self,
        cancel: &CancellationToken,
        req: &QueryGetSequencerRequest,
    ) -> Result<QueryGetSequencerResponse, QueryError>;

    async fn sequencer_all(
        &self,
        cancel: &CancellationToken,
        req: &QueryAllSequencerRequest,
    ) -> Result<QueryAllSequencerResponse, QueryError>;

    async fn sequencers_by_rollapp(
        &self,
        cancel: &CancellationToken,
        req: &QueryGetSequencersByRollappRequest,
    ) -> Result<QueryGetSequencersByRollappResponse, QueryError>;

    async fn sequencers_by_rollapp_all(
        &self,
        cancel: &CancellationToken,
        req: &QueryAllSequencersByRollappRequest,
    ) -> Result<QueryAllSequencersByRollappResponse, QueryError>;

    async fn scheduler(
        &self,
        cancel: &CancellationToken,
        req: &QueryGetSchedulerRequest,
    ) -> Result<QueryGetSchedulerResponse, QueryError>;

    async fn scheduler_all(
        &self,
        cancel: &CancellationToken,
        req: &QueryAllSchedulerRequest,
    ) -> Result<QueryAllSchedulerResponse, QueryError>;
}

#[async_trait]
impl SequencerQuery for SequencerClient {
    async fn params(
        &self,
        _cancel: &CancellationToken,
        _req: &QueryParamsRequest,
    ) -> Result<QueryParamsResponse, QueryError> {
        self.unsupported("params")
    }

    async fn sequencer(
        &self,
        _cancel: &CancellationToken,
        _req: &QueryGetSequencerRequest,
    ) -> Result<QueryGetSequencerResponse, QueryError> {
        self.unsupported("sequencer")
    }

    async fn sequencer_all(
        &self,
        _cancel: &CancellationToken,
        _req: &QueryAllSequencerRequest,
    ) -> Result<QueryAllSequencerResponse, QueryError> {
        self.unsupported("sequencerAll")
    }

    async fn sequencers_by_rollapp(
        &self,
        cancel: &CancellationToken,
        req: &QueryGetSequencersByRollappRequest,
    ) -> Result<QueryGetSequencersByRollappResponse, QueryError> {
        self.query::<SequencersByRollappQuery>(cancel, req).await
    }

    async fn sequencers_by_rollapp_all(
        &self,
        _cancel: &CancellationToken,
        _req: &QueryAllSequencersByRollappRequest,
    ) -> Result<QueryAllSequencersByRollappResponse, QueryError> {
        self.unsupported("sequencersByRollappAll")
    }

    async fn scheduler(
        &self,
        _cancel: &CancellationToken,
        _req: &QueryGetSchedulerRequest,
    ) -> Result<QueryGetSchedulerResponse, QueryError> {
        self.unsupported("scheduler")
    }

    async fn scheduler_all(
        &self,
        _cancel: &CancellationToken,
        _req: &QueryAllSchedulerRequest,
    ) -> Result<QueryAllSchedulerResponse, QueryError> {
        self.unsupported("schedulerAll")
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use serde_json::json;

    use super::*;
    use crate::{ContractAddress, MockContractQueryExecutor};

    fn client(mock: MockContractQueryExecutor) -> SequencerClient {
        SequencerClient::new(
            Arc::new(mock),
            ContractAddress::new("dym1hubcontract").unwrap(),
        )
    }

    #[tokio::test]
    async fn test_sequencers_by_rollapp() {
        let body = json!({
            "sequencerInfoList": [
                {
                    "sequencer": {
                        "sequencerAddress": "dym1seqa",
                        "rollappId": "rollapp_1234-1",
                    },
                    "status": 2,
                },
                {
                    "sequencer": {
                        "sequencerAddress": "dym1seqb",
                        "rollappId": "rollapp_1234-1",
                    },
                    "status": 3,
                },
            ]
        });
        let bytes = serde_json::to_vec(&body).unwrap();

        let mut mock = MockContractQueryExecutor::new();
        mock.expect_query_smart()
            .withf(|contract, payload| {
                contract.as_str() == "dym1hubcontract"
                    && payload.as_slice()
                        == br#"{"sequencer":{"sequencersByRollapp":{"rollappId":"rollapp_1234-1"}}}"#
            })
            .times(1)
            .returning(move |_, _| Ok(bytes.clone()));

        let resp = client(mock)
            .sequencers_by_rollapp(
                &CancellationToken::new(),
                &QueryGetSequencersByRollappRequest::new("rollapp_1234-1"),
            )
            .await
            .unwrap();
        assert_eq!(resp.sequencer_info_list.len(), 2);
        assert_eq!(
            resp.proposer().map(|s| s.sequencer.sequencer_address.as_str()),
            Some("dym1seqb")
        );
    }

    #[tokio::test]
    async fn test_missing_list_is_decode_error() {
        let mut mock = MockContractQueryExecutor::new();
        mock.expect_query_smart()
            .times(1)
            .returning(|_, _| Ok(b"{}".to_vec()));

        let err = client(mock)
            .sequencers_by_rollapp(&CancellationToken::new(), &Default::default())
            .await
            .unwrap_err();
        assert!(matches!(err, QueryError::Decode { .. }));
    }

    #[tokio::test]
    async fn test_unsupported_queries_never_execute() {
        let mut mock = MockContractQueryExecutor::new();
        mock.expect_query_smart().times(0);
        let c = client(mock);
        let cancel = CancellationToken::new();

        let errs = [
            c.params(&cancel, &QueryParamsRequest {}).await.unwrap_err(),
            c.sequencer(&cancel, &Default::default()).await.unwrap_err(),
            c.sequencer_all(&cancel, &Default::default()).await.unwrap_err(),
            c.sequencers_by_rollapp_all(&cancel, &Default::default())
                .await
                .unwrap_err(),
            c.scheduler(&cancel, &Default::default()).await.unwrap_err(),
            c.scheduler_all(&cancel, &Default::default()).await.unwrap_err(),
        ];
        let ops: Vec<_> = errs.iter().map(|e| e.operation().1).collect();
        assert_eq!(
            ops,
            [
                "params",
                "sequencer",
                "sequencerAll",
                "sequencersByRollappAll",
                "scheduler",
                "schedulerAll"
            ]
        );
        assert!(errs.iter().all(QueryError::is_unsupported));
        assert!(errs.iter().all(|e| e.operation().0 == "sequencer"));
    }
}
