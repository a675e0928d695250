//! Pagination and coin types shared by both query domains.

use serde::{Deserialize, Serialize};

use crate::serde_helpers::{base64_bytes, is_false, is_zero};

/// Pagination parameters attached to "all items" queries.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PageRequest {
    #[serde(with = "base64_bytes", skip_serializing_if = "Vec::is_empty")]
    pub key: Vec<u8>,
    #[serde(skip_serializing_if = "is_zero")]
    pub offset: u64,
    #[serde(skip_serializing_if = "is_zero")]
    pub limit: u64,
    #[serde(skip_serializing_if = "is_false")]
    pub count_total: bool,
    #[serde(skip_serializing_if = "is_false")]
    pub reverse: bool,
}

impl PageRequest {
    pub fn with_limit(limit: u64) -> Self {
        Self {
            limit,
            ..Default::default()
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PageResponse {
    #[serde(with = "base64_bytes")]
    pub next_key: Vec<u8>,
    pub total: u64,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Coin {
    pub denom: String,
    pub amount: String,
}
