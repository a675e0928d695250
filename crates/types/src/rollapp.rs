//! Rollapp domain: registrations and state-info checkpoints.

use serde::{Deserialize, Serialize};

use crate::{
    query::{PageRequest, PageResponse},
    serde_helpers::{base64_bytes, int_enum, is_false, is_zero},
};

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Params {
    pub dispute_period_in_blocks: u64,
    pub deployer_whitelist: Vec<DeployerParams>,
    pub rollapps_enabled: bool,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeployerParams {
    pub address: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Rollapp {
    pub rollapp_id: String,
    pub creator: String,
    pub version: u64,
    pub max_sequencers: u64,
    pub permissioned_addresses: Vec<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RollappSummary {
    pub rollapp_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latest_state_index: Option<StateInfoIndex>,
}

/// Identifies one state update of a rollapp.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StateInfoIndex {
    pub rollapp_id: String,
    pub index: u64,
}

/// Finalization status of a state update.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "i32", into = "i32")]
pub enum Status {
    #[default]
    Pending,
    Finalized,
    Reverted,
}

int_enum!(Status, "rollapp status", {
    Pending = 0,
    Finalized = 1,
    Reverted = 2,
});

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BlockDescriptor {
    pub height: u64,
    #[serde(with = "base64_bytes")]
    pub state_root: Vec<u8>,
    #[serde(with = "base64_bytes")]
    pub intermediate_states_root: Vec<u8>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BlockDescriptors {
    #[serde(rename = "BD")]
    pub bd: Vec<BlockDescriptor>,
}

/// A batch of rollapp blocks posted by a sequencer.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StateInfo {
    pub state_info_index: StateInfoIndex,
    pub sequencer: String,
    pub start_height: u64,
    pub num_blocks: u64,
    #[serde(rename = "DAPath")]
    pub da_path: String,
    pub version: u64,
    pub creation_height: u64,
    pub status: Status,
    #[serde(rename = "BDs")]
    pub bds: BlockDescriptors,
}

impl StateInfo {
    /// Last rollapp height covered by this update, if it covers any blocks.
    pub fn end_height(&self) -> Option<u64> {
        self.num_blocks
            .checked_sub(1)
            .and_then(|n| self.start_height.checked_add(n))
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StateInfoSummary {
    pub state_info_index: StateInfoIndex,
    pub status: Status,
    pub creation_height: u64,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryParamsRequest {}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryParamsResponse {
    pub params: Params,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct QueryGetRollappRequest {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub rollapp_id: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryGetRollappResponse {
    pub rollapp: Rollapp,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latest_state_index: Option<StateInfoIndex>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueryAllRollappRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pagination: Option<PageRequest>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueryAllRollappResponse {
    pub rollapp: Vec<RollappSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pagination: Option<PageResponse>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct QueryGetLatestStateIndexRequest {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub rollapp_id: String,
    #[serde(skip_serializing_if = "is_false")]
    pub finalized: bool,
}

impl QueryGetLatestStateIndexRequest {
    pub fn new(rollapp_id: impl Into<String>, finalized: bool) -> Self {
        Self {
            rollapp_id: rollapp_id.into(),
            finalized,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryGetLatestStateIndexResponse {
    pub state_index: StateInfoIndex,
}

/// Looks up a state info by index, or by the height it covers when `height` is set.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct QueryGetStateInfoRequest {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub rollapp_id: String,
    #[serde(skip_serializing_if = "is_zero")]
    pub index: u64,
    #[serde(skip_serializing_if = "is_zero")]
    pub height: u64,
    #[serde(skip_serializing_if = "is_false")]
    pub finalized: bool,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryGetStateInfoResponse {
    pub state_info: StateInfo,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueryAllStateInfoRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pagination: Option<PageRequest>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct QueryAllStateInfoResponse {
    pub state_info: Vec<StateInfoSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pagination: Option<PageResponse>,
}
