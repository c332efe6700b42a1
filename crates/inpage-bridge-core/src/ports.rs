use std::future::Future;

use alloy::primitives::Bytes;
use serde_json::Value;
use thiserror::Error;

use crate::domain::{JsonRpcErrorObject, JsonRpcRequest, JsonRpcResponse, OutboundEnvelope};
use crate::typed_data::TypedDataRequest;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ProviderError {
    #[error("unsupported method: {0}")]
    UnsupportedMethod(String),
    #[error("host rejected request: {0}")]
    HostRejection(Value),
    #[error("malformed parameter: {0}")]
    MalformedParameter(String),
    #[error("network error: {0}")]
    Network(String),
    #[error("rpc error {code}: {message}")]
    Rpc {
        code: i64,
        message: String,
        data: Option<Value>,
    },
    #[error("duplicate pending request id: {0}")]
    DuplicateId(u64),
    #[error("host did not respond within {0} ms")]
    HostTimeout(u64),
    #[error("transport error: {0}")]
    Transport(String),
}

impl ProviderError {
    /// EIP-1193 / JSON-RPC error code for this failure.
    pub fn code(&self) -> i64 {
        match self {
            Self::UnsupportedMethod(_) => 4200,
            Self::HostRejection(payload) => payload
                .get("code")
                .and_then(Value::as_i64)
                .unwrap_or(4001),
            Self::MalformedParameter(_) => -32602,
            Self::Rpc { code, .. } => *code,
            Self::Network(_)
            | Self::DuplicateId(_)
            | Self::HostTimeout(_)
            | Self::Transport(_) => -32603,
        }
    }

    pub fn to_rpc_error(&self) -> JsonRpcErrorObject {
        match self {
            Self::Rpc {
                code,
                message,
                data,
            } => JsonRpcErrorObject {
                code: *code,
                message: message.clone(),
                data: data.clone(),
            },
            Self::HostRejection(payload) => JsonRpcErrorObject {
                code: self.code(),
                message: payload
                    .get("message")
                    .and_then(Value::as_str)
                    .map(str::to_owned)
                    .or_else(|| payload.as_str().map(str::to_owned))
                    .unwrap_or_else(|| "host rejected request".to_owned()),
                data: Some(payload.clone()),
            },
            other => JsonRpcErrorObject {
                code: other.code(),
                message: other.to_string(),
                data: None,
            },
        }
    }
}

/// Outward message path to the host (or to an installed override).
pub trait HostPort: Send + Sync {
    fn post_message(&self, envelope: &OutboundEnvelope) -> Result<(), ProviderError>;
}

/// Remote JSON-RPC transport used for methods the host does not see.
pub trait RpcPort: Send + Sync {
    fn call(
        &self,
        rpc_url: &str,
        request: &JsonRpcRequest,
    ) -> impl Future<Output = Result<JsonRpcResponse, ProviderError>> + Send;
}

/// Computes the bytes whose keccak256 is the typed-data signing digest.
pub trait TypedDataHasher: Send + Sync {
    fn signing_preimage(&self, request: &TypedDataRequest) -> Result<Bytes, ProviderError>;
}
