//! Typed rollapp and sequencer queries answered by the hub's wasm contract.
//!
//! Requests are wrapped as `{"<domain>":{"<operation>":<request>}}`, sent as
//! a smart query through a [`ContractQueryExecutor`], and the returned bytes
//! are decoded into the native response type.

mod adapter;
pub mod comet;
mod domain;
pub mod envelope;
mod errors;
mod executor;
pub mod rollapp;
pub mod sequencer;

pub use adapter::ContractQueryClient;
pub use comet::CometQueryExecutor;
pub use domain::{ops, ContractOperation, Domain, RollappDomain, SequencerDomain};
pub use errors::QueryError;
#[cfg(any(test, feature = "test-utils"))]
pub use executor::MockContractQueryExecutor;
pub use executor::{ContractAddress, ContractQueryExecutor, EmptyContractAddress, ExecutionError};
#[cfg(any(test, feature = "test-utils"))]
pub use rollapp::MockRollappQuery;
pub use rollapp::{RollappClient, RollappQuery};
#[cfg(any(test, feature = "test-utils"))]
pub use sequencer::MockSequencerQuery;
pub use sequencer::{SequencerClient, SequencerQuery};
