//! [`ContractQueryExecutor`] over a CometBFT node's JSON-RPC `abci_query`.

use std::time::Duration;

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine};
use jsonrpsee::{
    core::{client::ClientT, params::ObjectParams, ClientError},
    http_client::{HttpClient, HttpClientBuilder},
};
use prost::Message;
use serde::Deserialize;
use tracing::*;

use crate::{ContractAddress, ContractQueryExecutor, ExecutionError};

/// gRPC path of the wasm module's smart query.
pub const SMART_CONTRACT_STATE_PATH: &str = "/cosmwasm.wasm.v1.Query/SmartContractState";

const WASM_CODESPACE: &str = "wasm";
const WASM_CODE_NOT_FOUND: u32 = 8;
const WASM_CODE_QUERY_FAILED: u32 = 9;

/// Largest response accepted from the node.
const MAX_RESPONSE_SIZE: u32 = 16 * 1024 * 1024;

#[derive(Clone, PartialEq, Message)]
struct QuerySmartContractStateRequest {
    #[prost(string, tag = "1")]
    address: String,
    #[prost(bytes = "vec", tag = "2")]
    query_data: Vec<u8>,
}

#[derive(Clone, PartialEq, Message)]
struct QuerySmartContractStateResponse {
    #[prost(bytes = "vec", tag = "1")]
    data: Vec<u8>,
}

#[derive(Debug, Deserialize)]
struct AbciQueryResult {
    response: AbciQueryResponse,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct AbciQueryResponse {
    code: u32,
    log: String,
    value: Option<String>,
    codespace: String,
}

/// Maps a configured node address onto the node's HTTP RPC endpoint.
///
/// `tcp://` is what CometBFT configs usually carry; bare `host:port` is
/// treated the same way.
pub fn rpc_http_url(node_address: &str) -> String {
    if let Some(rest) = node_address.strip_prefix("tcp://") {
        format!("http://{rest}")
    } else if node_address.starts_with("http://") || node_address.starts_with("https://") {
        node_address.to_owned()
    } else {
        format!("http://{node_address}")
    }
}

/// Smart-query executor backed by a CometBFT RPC endpoint.
#[derive(Debug, Clone)]
pub struct CometQueryExecutor {
    client: HttpClient,
    url: String,
}

impl CometQueryExecutor {
    pub fn new(node_address: &str, timeout: Duration) -> Result<Self, ExecutionError> {
        let url = rpc_http_url(node_address);
        let client = HttpClientBuilder::default()
            .request_timeout(timeout)
            .max_response_size(MAX_RESPONSE_SIZE)
            .build(&url)
            .map_err(|e| ExecutionError::unavailable(format!("building client for {url}: {e}")))?;
        Ok(Self { client, url })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl ContractQueryExecutor for CometQueryExecutor {
    async fn query_smart(
        &self,
        contract: &ContractAddress,
        payload: Vec<u8>,
    ) -> Result<Vec<u8>, ExecutionError> {
        let req = QuerySmartContractStateRequest {
            address: contract.as_str().to_owned(),
            query_data: payload,
        };

        let params = abci_query_params(&req.encode_to_vec())
            .map_err(|e| ExecutionError::rpc(format!("encoding params: {e}")))?;

        trace!(url = %self.url, %contract, "abci_query");
        let res: AbciQueryResult = self
            .client
            .request("abci_query", params)
            .await
            .map_err(convert_client_error)?;

        unpack_abci_response(res.response)
    }
}

/// Latest height, no proof.
fn abci_query_params(data: &[u8]) -> Result<ObjectParams, serde_json::Error> {
    let mut params = ObjectParams::new();
    params.insert("path", SMART_CONTRACT_STATE_PATH)?;
    params.insert("data", hex::encode(data))?;
    params.insert("height", "0")?;
    params.insert("prove", false)?;
    Ok(params)
}

fn convert_client_error(err: ClientError) -> ExecutionError {
    match err {
        ClientError::Call(obj) => ExecutionError::rpc(obj.to_string()),
        ClientError::ParseError(e) => ExecutionError::malformed(e.to_string()),
        ClientError::Transport(_) | ClientError::RestartNeeded(_) | ClientError::RequestTimeout => {
            warn!(%err, "node unreachable");
            ExecutionError::unavailable(err.to_string())
        }
        other => ExecutionError::rpc(other.to_string()),
    }
}

fn unpack_abci_response(resp: AbciQueryResponse) -> Result<Vec<u8>, ExecutionError> {
    if resp.code != 0 {
        return Err(match (resp.codespace.as_str(), resp.code) {
            (WASM_CODESPACE, WASM_CODE_NOT_FOUND) => ExecutionError::ContractNotFound(resp.log),
            (WASM_CODESPACE, WASM_CODE_QUERY_FAILED) => ExecutionError::QueryFailed(resp.log),
            _ => ExecutionError::Rejected {
                codespace: resp.codespace,
                code: resp.code,
                log: resp.log,
            },
        });
    }

    let raw = match resp.value.as_deref() {
        Some(v) => STANDARD
            .decode(v)
            .map_err(|e| ExecutionError::malformed(format!("response value: {e}")))?,
        None => Vec::new(),
    };

    let decoded = QuerySmartContractStateResponse::decode(raw.as_slice())
        .map_err(|e| ExecutionError::malformed(format!("smart query response: {e}")))?;
    Ok(decoded.data)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn ok_response(data: &[u8]) -> AbciQueryResponse {
        let value = QuerySmartContractStateResponse {
            data: data.to_vec(),
        }
        .encode_to_vec();
        AbciQueryResponse {
            value: Some(STANDARD.encode(value)),
            ..Default::default()
        }
    }

    #[test]
    fn test_rpc_http_url() {
        assert_eq!(rpc_http_url("tcp://127.0.0.1:26657"), "http://127.0.0.1:26657");
        assert_eq!(rpc_http_url("https://rpc.hub.io"), "https://rpc.hub.io");
        assert_eq!(rpc_http_url("localhost:26657"), "http://localhost:26657");
    }

    #[test]
    fn test_request_encoding() {
        let req = QuerySmartContractStateRequest {
            address: "ab".to_string(),
            query_data: b"{}".to_vec(),
        };
        // field 1 (len 2) "ab", field 2 (len 2) "{}"
        assert_eq!(req.encode_to_vec(), vec![0x0a, 2, b'a', b'b', 0x12, 2, b'{', b'}']);
    }

    #[test]
    fn test_unpack_ok() {
        let data = br#"{"stateIndex":{"index":3}}"#;
        assert_eq!(unpack_abci_response(ok_response(data)).unwrap(), data.to_vec());
    }

    #[test]
    fn test_unpack_from_node_json() {
        let body = json!({
            "response": {
                "code": 0,
                "log": "",
                "info": "",
                "index": "0",
                "key": null,
                "value": STANDARD.encode(QuerySmartContractStateResponse { data: b"{}".to_vec() }.encode_to_vec()),
                "proofOps": null,
                "height": "1200",
                "codespace": ""
            }
        });
        let res: AbciQueryResult = serde_json::from_value(body).unwrap();
        assert_eq!(unpack_abci_response(res.response).unwrap(), b"{}".to_vec());
    }

    #[test]
    fn test_unpack_error_codes() {
        let resp = |codespace: &str, code| AbciQueryResponse {
            code,
            log: "boom".to_string(),
            codespace: codespace.to_string(),
            value: None,
        };

        assert_eq!(
            unpack_abci_response(resp("wasm", 8)).unwrap_err(),
            ExecutionError::ContractNotFound("boom".to_string())
        );
        assert_eq!(
            unpack_abci_response(resp("wasm", 9)).unwrap_err(),
            ExecutionError::QueryFailed("boom".to_string())
        );
        assert_eq!(
            unpack_abci_response(resp("sdk", 6)).unwrap_err(),
            ExecutionError::Rejected {
                codespace: "sdk".to_string(),
                code: 6,
                log: "boom".to_string(),
            }
        );
    }

    #[test]
    fn test_unpack_bad_base64() {
        let resp = AbciQueryResponse {
            value: Some("%%%".to_string()),
            ..Default::default()
        };
        assert!(matches!(
            unpack_abci_response(resp),
            Err(ExecutionError::MalformedResponse(_))
        ));
    }

    #[test]
    fn test_convert_timeout_is_transient() {
        assert!(convert_client_error(ClientError::RequestTimeout).is_transient());
    }
}
