//! Event subscription lifecycle.

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

pub mod ws;

pub use ws::WsEventTransport;

/// Buffer size of a subscription stream when the caller does not pick one.
pub const DEFAULT_SUBSCRIPTION_CAPACITY: usize = 1;

/// One event delivered to a subscription.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResultEvent {
    /// Query filter the event matched.
    pub query: String,
    pub data: serde_json::Value,
    /// Flattened event attributes, e.g. `tm.event -> ["NewBlock"]`.
    pub events: BTreeMap<String, Vec<String>>,
}

/// Fires once when an event listener terminates without being asked to.
#[derive(Debug, Clone, Default)]
pub struct QuitSignal(CancellationToken);

impl QuitSignal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolves when the listener has quit. Never resolves after an explicit
    /// stop.
    pub async fn wait(&self) {
        self.0.cancelled().await
    }

    pub fn has_fired(&self) -> bool {
        self.0.is_cancelled()
    }

    pub(crate) fn fire(&self) {
        self.0.cancel()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EventError {
    #[error("event listener is not running")]
    NotRunning,

    #[error("connecting to {url}: {reason}")]
    Connect { url: String, reason: String },

    #[error("event listener closed")]
    Closed,

    #[error("subscription to {query:?} rejected: {reason}")]
    SubscribeRejected { query: String, reason: String },

    #[error("{subscriber} already subscribed to {query:?}")]
    AlreadySubscribed { subscriber: String, query: String },

    #[error("{subscriber} not subscribed to {query:?}")]
    NotSubscribed { subscriber: String, query: String },

    #[error("subscription cancelled")]
    Cancelled,

    #[error("protocol: {0}")]
    Protocol(String),
}

/// Source of chain events.
///
/// A transport is started and stopped explicitly. Subscriptions only exist
/// while it runs and end when it stops or quits.
#[cfg_attr(any(test, feature = "test-utils"), mockall::automock)]
#[async_trait]
pub trait EventTransport: Send + Sync {
    /// Connects. A no-op if already running.
    async fn start(&self) -> Result<(), EventError>;

    /// Disconnects without firing the quit signal. Returns
    /// [`EventError::NotRunning`] if not running.
    async fn stop(&self) -> Result<(), EventError>;

    /// Signal for the current (or next) run.
    fn quit(&self) -> QuitSignal;

    /// Opens a stream of events matching `query`.
    ///
    /// The stream ends when `cancel` fires, on unsubscribe, or when the
    /// transport stops. A `capacity` of zero is treated as one.
    async fn subscribe(
        &self,
        cancel: &CancellationToken,
        subscriber: &str,
        query: &str,
        capacity: usize,
    ) -> Result<mpsc::Receiver<ResultEvent>, EventError>;

    async fn unsubscribe(&self, subscriber: &str, query: &str) -> Result<(), EventError>;

    async fn unsubscribe_all(&self, subscriber: &str) -> Result<(), EventError>;
}
