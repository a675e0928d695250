use thiserror::Error;

use crate::ExecutionError;

/// Errors returned by the contract-backed query clients.
///
/// Every variant names the domain and operation it came from.
#[derive(Debug, Error)]
pub enum QueryError {
    /// The contract has no equivalent of this native query. Permanent, do not retry.
    #[error("{domain}.{operation} is not supported by the contract query surface")]
    Unsupported {
        domain: &'static str,
        operation: &'static str,
    },

    #[error("encoding {domain}.{operation} request: {source}")]
    Encode {
        domain: &'static str,
        operation: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error("executing {domain}.{operation}: {source}")]
    Execution {
        domain: &'static str,
        operation: &'static str,
        #[source]
        source: ExecutionError,
    },

    /// Contract result did not match the expected response shape.
    #[error("decoding {domain}.{operation} response: {source} (payload: {preview})")]
    Decode {
        domain: &'static str,
        operation: &'static str,
        preview: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("{domain}.{operation} cancelled")]
    Cancelled {
        domain: &'static str,
        operation: &'static str,
    },
}

impl QueryError {
    pub fn is_unsupported(&self) -> bool {
        matches!(self, Self::Unsupported { .. })
    }

    /// Only network-level execution failures are worth retrying.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Execution { source, .. } if source.is_transient())
    }

    pub fn execution_error(&self) -> Option<&ExecutionError> {
        match self {
            Self::Execution { source, .. } => Some(source),
            _ => None,
        }
    }

    /// Returns the `(domain, operation)` pair the error belongs to.
    pub fn operation(&self) -> (&'static str, &'static str) {
        match self {
            Self::Unsupported { domain, operation }
            | Self::Encode {
                domain, operation, ..
            }
            | Self::Execution {
                domain, operation, ..
            }
            | Self::Decode {
                domain, operation, ..
            }
            | Self::Cancelled { domain, operation } => (*domain, *operation),
        }
    }
}
