//! Request and response types of the hub's rollapp and sequencer query surfaces.
//!
//! Field names and encodings follow the hub's canonical JSON mapping: camelCase
//! proto names, zero-valued request fields omitted, byte fields as base64 and
//! enums as their integer values.

pub mod query;
pub mod rollapp;
pub mod sequencer;
mod serde_helpers;

pub use query::{Coin, PageRequest, PageResponse};
pub use serde_helpers::UnknownEnumValue;
