//! Sequencer domain: registrations, bonding status and proposer schedule.

use serde::{Deserialize, Serialize};

use crate::{
    query::{Coin, PageRequest, PageResponse},
    serde_helpers::{base64_bytes, int_enum},
};

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Params {
    pub min_bond: Coin,
    pub unbonding_time: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Description {
    pub moniker: String,
    pub identity: String,
    pub website: String,
    pub security_contact: String,
    pub details: String,
}

/// Packed public key the sequencer signs rollapp blocks with.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PubKeyAny {
    pub type_url: String,
    #[serde(with = "base64_bytes")]
    pub value: Vec<u8>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Sequencer {
    pub sequencer_address: String,
    pub creator: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dymint_pub_key: Option<PubKeyAny>,
    pub rollapp_id: String,
    pub description: Description,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "i32", into = "i32")]
pub enum OperatingStatus {
    #[default]
    Unbonded,
    Unbonding,
    Bonded,
    Proposer,
}

int_enum!(OperatingStatus, "sequencer status", {
    Unbonded = 0,
    Unbonding = 1,
    Bonded = 2,
    Proposer = 3,
});

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SequencerInfo {
    pub sequencer: Sequencer,
    pub status: OperatingStatus,
}

impl SequencerInfo {
    pub fn is_proposer(&self) -> bool {
        self.status == OperatingStatus::Proposer
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Sequencers {
    pub proposer: String,
    pub inactive_sequencers: Vec<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SequencersByRollapp {
    pub rollapp_id: String,
    pub sequencers: Sequencers,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Scheduler {
    pub sequencer_address: String,
    pub status: OperatingStatus,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryParamsRequest {}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryParamsResponse {
    pub params: Params,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct QueryGetSequencerRequest {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub sequencer_address: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryGetSequencerResponse {
    pub sequencer_info: SequencerInfo,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueryAllSequencerRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pagination: Option<PageRequest>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct QueryAllSequencerResponse {
    pub sequencer_info_list: Vec<SequencerInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pagination: Option<PageResponse>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct QueryGetSequencersByRollappRequest {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub rollapp_id: String,
}

impl QueryGetSequencersByRollappRequest {
    pub fn new(rollapp_id: impl Into<String>) -> Self {
        Self {
            rollapp_id: rollapp_id.into(),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryGetSequencersByRollappResponse {
    pub sequencer_info_list: Vec<SequencerInfo>,
}

impl QueryGetSequencersByRollappResponse {
    /// Returns the sequencer currently marked as proposer, if any.
    pub fn proposer(&self) -> Option<&SequencerInfo> {
        self.sequencer_info_list.iter().find(|s| s.is_proposer())
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueryAllSequencersByRollappRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pagination: Option<PageRequest>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct QueryAllSequencersByRollappResponse {
    pub sequencers_by_rollapp: Vec<SequencersByRollapp>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pagination: Option<PageResponse>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct QueryGetSchedulerRequest {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub sequencer_address: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryGetSchedulerResponse {
    pub scheduler: Scheduler,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueryAllSchedulerRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pagination: Option<PageRequest>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueryAllSchedulerResponse {
    pub scheduler: Vec<Scheduler>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pagination: Option<PageResponse>,
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_sequencers_by_rollapp_response() {
        let raw = json!({
            "sequencerInfoList": [
                {
                    "sequencer": {
                        "sequencerAddress": "dym1aaa",
                        "rollappId": "rollapp_1234-1",
                        "dymintPubKey": { "typeUrl": "/cosmos.crypto.ed25519.PubKey", "value": "AAEC" }
                    },
                    "status": 2
                },
                {
                    "sequencer": { "sequencerAddress": "dym1bbb", "rollappId": "rollapp_1234-1" },
                    "status": 3
                }
            ]
        });

        let resp: QueryGetSequencersByRollappResponse = serde_json::from_value(raw).unwrap();
        assert_eq!(resp.sequencer_info_list.len(), 2);
        assert_eq!(
            resp.sequencer_info_list[0]
                .sequencer
                .dymint_pub_key
                .as_ref()
                .unwrap()
                .value,
            vec![0, 1, 2]
        );
        assert_eq!(
            resp.proposer().unwrap().sequencer.sequencer_address,
            "dym1bbb"
        );
    }

    #[test]
    fn test_status_serializes_as_integer() {
        let sched = Scheduler {
            sequencer_address: "dym1aaa".to_owned(),
            status: OperatingStatus::Bonded,
        };
        assert_eq!(
            serde_json::to_value(&sched).unwrap(),
            json!({ "sequencerAddress": "dym1aaa", "status": 2 })
        );
    }

    #[test]
    fn test_sequencer_list_is_required() {
        assert!(serde_json::from_value::<QueryGetSequencersByRollappResponse>(json!({})).is_err());
    }
}
