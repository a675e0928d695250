//! Translation between typed requests/responses and contract query bytes.
//!
//! A request for operation `op` of domain `d` travels as
//! `{"<d>":{"<op>":<request>}}`. The contract answers with the bare response
//! object, which is decoded as-is.

use serde::{ser::SerializeMap, Serialize, Serializer};

use crate::{ContractOperation, Domain, QueryError};

/// Longest slice of an undecodable payload kept in [`QueryError::Decode`].
const DECODE_PREVIEW_LEN: usize = 128;

struct Envelope<'a, T: ?Sized> {
    domain: &'a str,
    operation: &'a str,
    request: &'a T,
}

struct Inner<'a, T: ?Sized> {
    operation: &'a str,
    request: &'a T,
}

impl<T: Serialize + ?Sized> Serialize for Envelope<'_, T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(1))?;
        map.serialize_entry(
            self.domain,
            &Inner {
                operation: self.operation,
                request: self.request,
            },
        )?;
        map.end()
    }
}

impl<T: Serialize + ?Sized> Serialize for Inner<'_, T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(1))?;
        map.serialize_entry(self.operation, self.request)?;
        map.end()
    }
}

/// Wraps `request` in the two-level query envelope.
pub fn encode_envelope<T: Serialize + ?Sized>(
    domain: &'static str,
    operation: &'static str,
    request: &T,
) -> Result<Vec<u8>, QueryError> {
    let envelope = Envelope {
        domain,
        operation,
        request,
    };
    serde_json::to_vec(&envelope).map_err(|source| QueryError::Encode {
        domain,
        operation,
        source,
    })
}

pub fn encode_query<O: ContractOperation>(request: &O::Request) -> Result<Vec<u8>, QueryError> {
    encode_envelope(<O::Domain as Domain>::NAME, O::NAME, request)
}

/// Decodes contract result bytes into the operation's response. Never
/// substitutes a default on failure.
pub fn decode_response<O: ContractOperation>(bytes: &[u8]) -> Result<O::Response, QueryError> {
    serde_json::from_slice(bytes).map_err(|source| QueryError::Decode {
        domain: <O::Domain as Domain>::NAME,
        operation: O::NAME,
        preview: preview(bytes),
        source,
    })
}

fn preview(bytes: &[u8]) -> String {
    let cut = bytes.len().min(DECODE_PREVIEW_LEN);
    let mut s = String::from_utf8_lossy(&bytes[..cut]).into_owned();
    if bytes.len() > cut {
        s.push_str("...");
    }
    s
}

#[cfg(test)]
mod tests {
    use hubclient_types::{rollapp, sequencer};

    use super::*;
    use crate::ops::{LatestStateIndexQuery, SequencersByRollappQuery, StateInfoQuery};

    #[test]
    fn test_state_info_envelope() {
        let req = rollapp::QueryGetStateInfoRequest {
            index: 42,
            ..Default::default()
        };
        let payload = encode_query::<StateInfoQuery>(&req).unwrap();
        assert_eq!(
            String::from_utf8(payload).unwrap(),
            r#"{"rollapp":{"stateInfo":{"index":42}}}"#
        );
    }

    #[test]
    fn test_latest_state_index_envelope_keeps_field_order() {
        let req = rollapp::QueryGetLatestStateIndexRequest::new("rollapp_1234-1", true);
        let payload = encode_query::<LatestStateIndexQuery>(&req).unwrap();
        assert_eq!(
            String::from_utf8(payload).unwrap(),
            r#"{"rollapp":{"latestStateIndex":{"rollappId":"rollapp_1234-1","finalized":true}}}"#
        );
    }

    #[test]
    fn test_sequencers_by_rollapp_envelope() {
        let req = sequencer::QueryGetSequencersByRollappRequest::new("rollapp_1234-1");
        let payload = encode_query::<SequencersByRollappQuery>(&req).unwrap();
        assert_eq!(
            String::from_utf8(payload).unwrap(),
            r#"{"sequencer":{"sequencersByRollapp":{"rollappId":"rollapp_1234-1"}}}"#
        );
    }

    #[test]
    fn test_empty_request_envelope() {
        let payload =
            encode_envelope("rollapp", "params", &rollapp::QueryParamsRequest {}).unwrap();
        assert_eq!(payload, br#"{"rollapp":{"params":{}}}"#);
    }

    #[test]
    fn test_decode_flat_response() {
        let bytes = br#"{"stateIndex":{"rollappId":"rollapp_1234-1","index":17}}"#;
        let resp = decode_response::<LatestStateIndexQuery>(bytes).unwrap();
        assert_eq!(resp.state_index.index, 17);
        assert_eq!(resp.state_index.rollapp_id, "rollapp_1234-1");
    }

    #[test]
    fn test_decode_rejects_enveloped_response() {
        let bytes = br#"{"rollapp":{"latestStateIndex":{"stateIndex":{"index":17}}}}"#;
        let err = decode_response::<LatestStateIndexQuery>(bytes).unwrap_err();
        assert!(matches!(
            err,
            QueryError::Decode {
                domain: "rollapp",
                operation: "latestStateIndex",
                ..
            }
        ));
    }

    #[test]
    fn test_decode_preview_is_bounded() {
        let bytes = vec![b'x'; DECODE_PREVIEW_LEN * 2];
        match decode_response::<StateInfoQuery>(&bytes).unwrap_err() {
            QueryError::Decode { preview, .. } => {
                assert_eq!(preview.len(), DECODE_PREVIEW_LEN + 3);
                assert!(preview.ends_with("..."));
            }
            other => panic!("expected decode error, got {other:?}"),
        }
    }
}
