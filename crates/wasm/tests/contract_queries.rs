//! End-to-end behaviour of the domain clients against in-process executors.

use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Mutex,
    },
    time::Duration,
};

use async_trait::async_trait;
use hubclient_types::{rollapp, sequencer};
use hubclient_wasm::{
    ContractAddress, ContractQueryExecutor, ExecutionError, QueryError, RollappClient,
    RollappQuery, SequencerClient, SequencerQuery,
};
use serde_json::{json, Value};
use tokio_util::sync::CancellationToken;

/// Answers enveloped queries from a canned table keyed by `domain.operation`.
#[derive(Default)]
struct TableExecutor {
    answers: HashMap<String, Value>,
    calls: AtomicUsize,
    seen: Mutex<Vec<(String, Value)>>,
}

impl TableExecutor {
    fn with(mut self, key: &str, answer: Value) -> Self {
        self.answers.insert(key.to_string(), answer);
        self
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ContractQueryExecutor for TableExecutor {
    async fn query_smart(
        &self,
        contract: &ContractAddress,
        payload: Vec<u8>,
    ) -> Result<Vec<u8>, ExecutionError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        let msg: Value = serde_json::from_slice(&payload)
            .map_err(|e| ExecutionError::QueryFailed(e.to_string()))?;
        let (domain, inner) = msg
            .as_object()
            .and_then(|o| o.iter().next())
            .ok_or_else(|| ExecutionError::QueryFailed("empty message".into()))?;
        let (op, req) = inner
            .as_object()
            .and_then(|o| o.iter().next())
            .ok_or_else(|| ExecutionError::QueryFailed("empty operation".into()))?;

        self.seen
            .lock()
            .unwrap()
            .push((contract.to_string(), req.clone()));

        let key = format!("{domain}.{op}");
        let answer = self
            .answers
            .get(&key)
            .ok_or_else(|| ExecutionError::QueryFailed(format!("unknown variant {key}")))?;
        Ok(serde_json::to_vec(answer).unwrap())
    }
}

/// Never answers.
struct StalledExecutor;

#[async_trait]
impl ContractQueryExecutor for StalledExecutor {
    async fn query_smart(
        &self,
        _contract: &ContractAddress,
        _payload: Vec<u8>,
    ) -> Result<Vec<u8>, ExecutionError> {
        futures::future::pending().await
    }
}

fn contract() -> ContractAddress {
    ContractAddress::new("dym14hj2tavq8fpesdwxxcu44rty3hh90vhujrvcmstl4zr3txmfvw9sq2r9g9").unwrap()
}

#[tokio::test]
async fn test_supported_queries_round_trip() {
    let exec = Arc::new(
        TableExecutor::default()
            .with(
                "rollapp.latestStateIndex",
                json!({"stateIndex": {"rollappId": "rollapp_1234-1", "index": 12}}),
            )
            .with(
                "rollapp.stateInfo",
                json!({"stateInfo": {
                    "stateInfoIndex": {"rollappId": "rollapp_1234-1", "index": 12},
                    "sequencer": "dym1seq",
                    "startHeight": 501,
                    "numBlocks": 50,
                    "DAPath": "celestia|1|2",
                    "status": 1,
                    "BDs": {"BD": [{"height": 501, "stateRoot": "AQID"}]}
                }}),
            )
            .with(
                "sequencer.sequencersByRollapp",
                json!({"sequencerInfoList": [
                    {"sequencer": {"sequencerAddress": "dym1seq", "rollappId": "rollapp_1234-1"}, "status": 3}
                ]}),
            ),
    );

    let rollapps = RollappClient::new(exec.clone(), contract());
    let sequencers = SequencerClient::new(exec.clone(), contract());
    let cancel = CancellationToken::new();

    let latest = rollapps
        .latest_state_index(
            &cancel,
            &rollapp::QueryGetLatestStateIndexRequest::new("rollapp_1234-1", true),
        )
        .await
        .unwrap();
    assert_eq!(latest.state_index.index, 12);

    let info = rollapps
        .state_info(
            &cancel,
            &rollapp::QueryGetStateInfoRequest {
                rollapp_id: "rollapp_1234-1".to_string(),
                index: latest.state_index.index,
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(info.state_info.status, rollapp::Status::Finalized);
    assert_eq!(info.state_info.end_height(), Some(550));
    assert_eq!(info.state_info.bds.bd[0].state_root, vec![1, 2, 3]);

    let seqs = sequencers
        .sequencers_by_rollapp(
            &cancel,
            &sequencer::QueryGetSequencersByRollappRequest::new("rollapp_1234-1"),
        )
        .await
        .unwrap();
    assert!(seqs.proposer().is_some());

    assert_eq!(exec.calls(), 3);
    let seen = exec.seen.lock().unwrap();
    assert!(seen.iter().all(|(c, _)| c == contract().as_str()));
    assert_eq!(seen[0].1, json!({"rollappId": "rollapp_1234-1", "finalized": true}));
    assert_eq!(seen[1].1, json!({"rollappId": "rollapp_1234-1", "index": 12}));
}

#[tokio::test]
async fn test_unsupported_queries_make_no_calls() {
    let exec = Arc::new(TableExecutor::default());
    let rollapps = RollappClient::new(exec.clone(), contract());
    let sequencers = SequencerClient::new(exec.clone(), contract());
    let cancel = CancellationToken::new();

    let err = rollapps
        .rollapp(
            &cancel,
            &rollapp::QueryGetRollappRequest {
                rollapp_id: "rollapp_1234-1".to_string(),
            },
        )
        .await
        .unwrap_err();
    assert!(err.is_unsupported());

    let err = sequencers
        .scheduler_all(&cancel, &Default::default())
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        QueryError::Unsupported {
            domain: "sequencer",
            operation: "schedulerAll"
        }
    ));

    assert_eq!(exec.calls(), 0);
}

#[tokio::test]
async fn test_contract_failure_is_execution_error() {
    let exec = Arc::new(TableExecutor::default());
    let rollapps = RollappClient::new(exec.clone(), contract());

    let err = rollapps
        .state_info(&CancellationToken::new(), &Default::default())
        .await
        .unwrap_err();
    match err.execution_error() {
        Some(ExecutionError::QueryFailed(msg)) => assert!(msg.contains("rollapp.stateInfo")),
        other => panic!("unexpected error: {other:?}"),
    }
    assert!(!err.is_transient());
}

#[tokio::test]
async fn test_wrong_shape_is_decode_error() {
    let exec = Arc::new(
        TableExecutor::default().with("rollapp.latestStateIndex", json!({"stateIndex": "12"})),
    );
    let rollapps = RollappClient::new(exec, contract());

    let err = rollapps
        .latest_state_index(&CancellationToken::new(), &Default::default())
        .await
        .unwrap_err();
    assert!(matches!(err, QueryError::Decode { .. }));
    assert!(err.execution_error().is_none());
}

#[tokio::test]
async fn test_cancel_in_flight_query() {
    let rollapps = RollappClient::new(Arc::new(StalledExecutor), contract());
    let cancel = CancellationToken::new();

    let canceller = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            cancel.cancel();
        })
    };

    let res = tokio::time::timeout(
        Duration::from_secs(2),
        rollapps.state_info(&cancel, &Default::default()),
    )
    .await
    .expect("query should return once cancelled");
    assert!(matches!(
        res,
        Err(QueryError::Cancelled {
            domain: "rollapp",
            operation: "stateInfo"
        })
    ));
    canceller.await.unwrap();
}

#[tokio::test]
async fn test_clients_share_executor_across_tasks() {
    let exec = Arc::new(TableExecutor::default().with(
        "rollapp.latestStateIndex",
        json!({"stateIndex": {"rollappId": "r", "index": 1}}),
    ));
    let client = RollappClient::new(exec.clone(), contract());

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let client = client.clone();
            tokio::spawn(async move {
                client
                    .latest_state_index(&CancellationToken::new(), &Default::default())
                    .await
            })
        })
        .collect();
    for h in handles {
        assert_eq!(h.await.unwrap().unwrap().state_index.index, 1);
    }
    assert_eq!(exec.calls(), 8);
}
