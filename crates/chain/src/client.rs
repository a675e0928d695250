use std::{fmt, sync::Arc, time::Duration};

use hubclient_config::SettlementConfig;
use hubclient_wasm::{CometQueryExecutor, ContractQueryExecutor, RollappClient, SequencerClient};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::*;

use crate::{
    events::{
        EventTransport, QuitSignal, ResultEvent, WsEventTransport, DEFAULT_SUBSCRIPTION_CAPACITY,
    },
    Account, AccountRegistry, BroadcastError, ChainClientError, ClientContext, MissingCapability,
    TxBroadcaster, TxMsg, TxResponse,
};

/// Handle to the settlement hub.
///
/// Composes a contract query executor, an event transport, an optional
/// transaction broadcaster and an account registry. Created once per process.
pub struct ChainClient {
    context: ClientContext,
    executor: Arc<dyn ContractQueryExecutor>,
    events: Arc<dyn EventTransport>,
    broadcaster: Option<Arc<dyn TxBroadcaster>>,
    accounts: Arc<dyn AccountRegistry>,
}

impl fmt::Debug for ChainClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChainClient")
            .field("context", &self.context)
            .field("broadcaster", &self.broadcaster.is_some())
            .finish_non_exhaustive()
    }
}

impl ChainClient {
    /// Builds a client talking to `config.node_address` over CometBFT RPC and
    /// websocket. Transactions cannot be broadcast from a client built this
    /// way; use [`ChainClientBuilder`] to add a broadcaster.
    pub fn connect(
        config: &SettlementConfig,
        accounts: Arc<dyn AccountRegistry>,
    ) -> Result<Self, ChainClientError> {
        let context = ClientContext::from_config(config)?;
        let executor = CometQueryExecutor::new(
            context.node_address(),
            Duration::from_secs(config.rpc_timeout_secs),
        )?;
        let events = WsEventTransport::from_node_address(context.node_address());
        debug!(rpc = %executor.url(), ws = %events.url(), "connecting chain client");

        Ok(ChainClientBuilder::new(context)
            .with_executor(Arc::new(executor))
            .with_event_transport(Arc::new(events))
            .with_accounts(accounts)
            .build()?)
    }

    pub fn context(&self) -> &ClientContext {
        &self.context
    }

    pub async fn start_event_listener(&self) -> Result<(), ChainClientError> {
        Ok(self.events.start().await?)
    }

    pub async fn stop_event_listener(&self) -> Result<(), ChainClientError> {
        Ok(self.events.stop().await?)
    }

    /// Fires when the event listener terminates unexpectedly.
    pub fn event_listener_quit(&self) -> QuitSignal {
        self.events.quit()
    }

    /// Opens an event stream for `query` owned by `subscriber`. The stream
    /// ends when `cancel` fires.
    pub async fn subscribe_to_events(
        &self,
        cancel: &CancellationToken,
        subscriber: &str,
        query: &str,
        capacity: Option<usize>,
    ) -> Result<mpsc::Receiver<ResultEvent>, ChainClientError> {
        let capacity = capacity.unwrap_or(DEFAULT_SUBSCRIPTION_CAPACITY);
        Ok(self
            .events
            .subscribe(cancel, subscriber, query, capacity)
            .await?)
    }

    pub async fn unsubscribe(&self, subscriber: &str, query: &str) -> Result<(), ChainClientError> {
        Ok(self.events.unsubscribe(subscriber, query).await?)
    }

    pub async fn unsubscribe_all(&self, subscriber: &str) -> Result<(), ChainClientError> {
        Ok(self.events.unsubscribe_all(subscriber).await?)
    }

    /// Signs `msgs` with the named account and submits them as one
    /// transaction. A transaction the chain rejects is an error.
    pub async fn broadcast_tx(
        &self,
        account_name: &str,
        msgs: Vec<TxMsg>,
    ) -> Result<TxResponse, ChainClientError> {
        let broadcaster = self
            .broadcaster
            .as_ref()
            .ok_or(ChainClientError::BroadcastUnavailable)?;
        if msgs.is_empty() {
            return Err(BroadcastError::Empty.into());
        }
        let signer = self.get_account(account_name)?;

        let resp = broadcaster.broadcast(&self.context, &signer, msgs).await?;
        if !resp.is_success() {
            warn!(txhash = %resp.txhash, code = resp.code, log = %resp.raw_log, "tx failed");
            return Err(BroadcastError::from(resp).into());
        }
        info!(txhash = %resp.txhash, height = resp.height, "tx included");
        Ok(resp)
    }

    /// Rollapp queries against the configured contract.
    pub fn rollapp_client(&self) -> RollappClient {
        RollappClient::new(self.executor.clone(), self.context.contract().clone())
    }

    /// Sequencer queries against the configured contract.
    pub fn sequencer_client(&self) -> SequencerClient {
        SequencerClient::new(self.executor.clone(), self.context.contract().clone())
    }

    pub fn get_account(&self, name: &str) -> Result<Account, ChainClientError> {
        Ok(self.accounts.get_by_name(name)?)
    }
}

/// Assembles a [`ChainClient`] from individual capabilities.
pub struct ChainClientBuilder {
    context: ClientContext,
    executor: Option<Arc<dyn ContractQueryExecutor>>,
    events: Option<Arc<dyn EventTransport>>,
    broadcaster: Option<Arc<dyn TxBroadcaster>>,
    accounts: Option<Arc<dyn AccountRegistry>>,
}

impl fmt::Debug for ChainClientBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChainClientBuilder")
            .field("context", &self.context)
            .finish_non_exhaustive()
    }
}

impl ChainClientBuilder {
    pub fn new(context: ClientContext) -> Self {
        Self {
            context,
            executor: None,
            events: None,
            broadcaster: None,
            accounts: None,
        }
    }

    pub fn with_executor(mut self, executor: Arc<dyn ContractQueryExecutor>) -> Self {
        self.executor = Some(executor);
        self
    }

    pub fn with_event_transport(mut self, events: Arc<dyn EventTransport>) -> Self {
        self.events = Some(events);
        self
    }

    pub fn with_broadcaster(mut self, broadcaster: Arc<dyn TxBroadcaster>) -> Self {
        self.broadcaster = Some(broadcaster);
        self
    }

    pub fn with_accounts(mut self, accounts: Arc<dyn AccountRegistry>) -> Self {
        self.accounts = Some(accounts);
        self
    }

    pub fn build(self) -> Result<ChainClient, MissingCapability> {
        Ok(ChainClient {
            context: self.context,
            executor: self.executor.ok_or(MissingCapability("query executor"))?,
            events: self.events.ok_or(MissingCapability("event transport"))?,
            broadcaster: self.broadcaster,
            accounts: self.accounts.ok_or(MissingCapability("account registry"))?,
        })
    }
}

#[cfg(test)]
mod tests {
    use hubclient_types::rollapp::QueryGetLatestStateIndexRequest;
    use hubclient_wasm::{ExecutionError, MockContractQueryExecutor, QueryError, RollappQuery};

    use super::*;
    use crate::{
        context::tests::settlement_config, events::EventError, events::MockEventTransport,
        AccountError, InMemoryAccountRegistry, MockTxBroadcaster,
    };

    fn account() -> Account {
        Account {
            name: "sequencer".to_string(),
            address: "dym1seq".to_string(),
            pub_key: vec![2; 33],
        }
    }

    fn builder() -> ChainClientBuilder {
        let ctx = ClientContext::from_config(&settlement_config()).unwrap();
        ChainClientBuilder::new(ctx)
            .with_executor(Arc::new(MockContractQueryExecutor::new()))
            .with_event_transport(Arc::new(MockEventTransport::new()))
            .with_accounts(Arc::new(InMemoryAccountRegistry::new().with_account(account())))
    }

    #[test]
    fn test_build_requires_executor() {
        let ctx = ClientContext::from_config(&settlement_config()).unwrap();
        let err = ChainClientBuilder::new(ctx)
            .with_event_transport(Arc::new(MockEventTransport::new()))
            .with_accounts(Arc::new(InMemoryAccountRegistry::new()))
            .build()
            .unwrap_err();
        assert_eq!(err, MissingCapability("query executor"));
    }

    #[tokio::test]
    async fn test_stop_listener_not_running() {
        let mut events = MockEventTransport::new();
        events
            .expect_stop()
            .times(1)
            .returning(|| Err(EventError::NotRunning));
        let client = builder()
            .with_event_transport(Arc::new(events))
            .build()
            .unwrap();

        assert!(matches!(
            client.stop_event_listener().await,
            Err(ChainClientError::Event(EventError::NotRunning))
        ));
    }

    #[tokio::test]
    async fn test_subscribe_uses_default_capacity() {
        let mut events = MockEventTransport::new();
        events
            .expect_subscribe()
            .withf(|_, subscriber, query, capacity| {
                subscriber == "hub" && query == "tm.event='NewBlock'" && *capacity == 1
            })
            .times(1)
            .returning(|_, _, _, _| Ok(mpsc::channel(1).1));
        let client = builder()
            .with_event_transport(Arc::new(events))
            .build()
            .unwrap();

        client
            .subscribe_to_events(&CancellationToken::new(), "hub", "tm.event='NewBlock'", None)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_rollapp_client_bound_to_contract() {
        let mut exec = MockContractQueryExecutor::new();
        exec.expect_query_smart()
            .withf(|contract, _| contract.as_str() == "dym1hubcontract")
            .times(1)
            .returning(|_, _| Err(ExecutionError::ContractNotFound("dym1hubcontract".into())));
        let client = builder().with_executor(Arc::new(exec)).build().unwrap();

        let rollapps = client.rollapp_client();
        assert_eq!(rollapps.contract().as_str(), "dym1hubcontract");
        let err = rollapps
            .latest_state_index(
                &CancellationToken::new(),
                &QueryGetLatestStateIndexRequest::new("rollapp_1234-1", false),
            )
            .await
            .unwrap_err();
        assert!(matches!(
            err.execution_error(),
            Some(ExecutionError::ContractNotFound(_))
        ));
        assert!(!matches!(err, QueryError::Unsupported { .. }));
        assert_eq!(client.sequencer_client().contract().as_str(), "dym1hubcontract");
    }

    #[test]
    fn test_get_account() {
        let client = builder().build().unwrap();
        assert_eq!(client.get_account("sequencer").unwrap(), account());
        assert!(matches!(
            client.get_account("missing"),
            Err(ChainClientError::Account(AccountError::NotFound(_)))
        ));
    }

    #[tokio::test]
    async fn test_broadcast_without_broadcaster() {
        let client = builder().build().unwrap();
        let res = client
            .broadcast_tx("sequencer", vec![TxMsg::new("/x.Msg", vec![1])])
            .await;
        assert!(matches!(res, Err(ChainClientError::BroadcastUnavailable)));
    }

    #[tokio::test]
    async fn test_broadcast_signs_with_named_account() {
        let mut bc = MockTxBroadcaster::new();
        bc.expect_broadcast()
            .withf(|ctx, signer, msgs| {
                ctx.rollapp_id() == "rollapp_1234-1" && signer.name == "sequencer" && msgs.len() == 2
            })
            .times(1)
            .returning(|_, _, _| {
                Ok(TxResponse {
                    height: 77,
                    txhash: "ABCD".to_string(),
                    ..Default::default()
                })
            });
        let client = builder().with_broadcaster(Arc::new(bc)).build().unwrap();

        let msgs = vec![TxMsg::new("/x.MsgA", vec![1]), TxMsg::new("/x.MsgB", vec![2])];
        let resp = client.broadcast_tx("sequencer", msgs).await.unwrap();
        assert_eq!(resp.height, 77);
    }

    #[tokio::test]
    async fn test_broadcast_failed_tx_is_error() {
        let mut bc = MockTxBroadcaster::new();
        bc.expect_broadcast().times(1).returning(|_, _, _| {
            Ok(TxResponse {
                txhash: "ABCD".to_string(),
                code: 11,
                codespace: "sdk".to_string(),
                raw_log: "out of gas".to_string(),
                ..Default::default()
            })
        });
        let client = builder().with_broadcaster(Arc::new(bc)).build().unwrap();

        let err = client
            .broadcast_tx("sequencer", vec![TxMsg::new("/x.Msg", vec![])])
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ChainClientError::Broadcast(BroadcastError::Rejected { code: 11, .. })
        ));
    }

    #[tokio::test]
    async fn test_broadcast_unknown_account_skips_broadcaster() {
        let mut bc = MockTxBroadcaster::new();
        bc.expect_broadcast().times(0);
        let client = builder().with_broadcaster(Arc::new(bc)).build().unwrap();

        let err = client
            .broadcast_tx("nobody", vec![TxMsg::new("/x.Msg", vec![])])
            .await
            .unwrap_err();
        assert!(matches!(err, ChainClientError::Account(_)));
    }
}
