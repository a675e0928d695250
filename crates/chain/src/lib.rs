//! Client for the settlement hub: contract-backed queries, event
//! subscriptions, transaction broadcast and account lookup.

mod accounts;
mod broadcast;
mod client;
mod context;
mod errors;
pub mod events;

#[cfg(any(test, feature = "test-utils"))]
pub use accounts::MockAccountRegistry;
pub use accounts::{Account, AccountRegistry, InMemoryAccountRegistry};
#[cfg(any(test, feature = "test-utils"))]
pub use broadcast::MockTxBroadcaster;
pub use broadcast::{BroadcastError, TxBroadcaster, TxMsg, TxResponse};
pub use client::{ChainClient, ChainClientBuilder};
pub use context::ClientContext;
pub use errors::{AccountError, ChainClientError, MissingCapability};
pub use events::{EventError, EventTransport, QuitSignal, ResultEvent, WsEventTransport};
