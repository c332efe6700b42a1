use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::ports::ProviderError;

/// Configuration injected by the host when it installs a provider.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ProviderConfig {
    pub address: String,
    #[serde(deserialize_with = "deserialize_chain_id")]
    pub chain_id: u64,
    pub rpc_url: String,
    pub is_debug: bool,
}

impl ProviderConfig {
    pub fn new(address: impl Into<String>, chain_id: u64, rpc_url: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            chain_id,
            rpc_url: rpc_url.into(),
            is_debug: false,
        }
    }
}

pub fn format_chain_id(chain_id: u64) -> String {
    format!("0x{chain_id:x}")
}

pub fn parse_chain_id(raw: &str) -> Result<u64, ProviderError> {
    let raw = raw.trim();
    let (digits, radix) = match raw.strip_prefix("0x").or_else(|| raw.strip_prefix("0X")) {
        Some(hex) => (hex, 16),
        None => (raw, 10),
    };
    // from_str_radix takes a leading sign; chain ids never carry one.
    if digits.starts_with(['+', '-']) {
        return Err(ProviderError::MalformedParameter(format!(
            "chain id must not be signed: {raw}"
        )));
    }
    u64::from_str_radix(digits, radix).map_err(|e| {
        let kind = if radix == 16 { "hex chain id" } else { "chain id" };
        ProviderError::MalformedParameter(format!("invalid {kind} {raw}: {e}"))
    })
}

pub fn json_chain_id(value: &Value) -> Result<u64, ProviderError> {
    if let Some(n) = value.as_u64() {
        return Ok(n);
    }
    let s = value.as_str().ok_or_else(|| {
        ProviderError::MalformedParameter("chain id must be string or number".to_owned())
    })?;
    parse_chain_id(s)
}

fn deserialize_chain_id<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    match value {
        Value::Null => Ok(0),
        other => json_chain_id(&other).map_err(serde::de::Error::custom),
    }
}

/// Method category carried in the `name` field of an outbound envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum HostMethod {
    RequestAccounts,
    SignTransaction,
    SignMessage,
    SignPersonalMessage,
    SignTypedMessage,
    EcRecover,
    WatchAsset,
    AddEthereumChain,
    SwitchEthereumChain,
    /// Only sent on the `signMessageHash` override path.
    SignMessageHash,
    /// Only sent on the `personalEcRecover` override path.
    PersonalEcRecover,
}

impl HostMethod {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::RequestAccounts => "requestAccounts",
            Self::SignTransaction => "signTransaction",
            Self::SignMessage => "signMessage",
            Self::SignPersonalMessage => "signPersonalMessage",
            Self::SignTypedMessage => "signTypedMessage",
            Self::EcRecover => "ecRecover",
            Self::WatchAsset => "watchAsset",
            Self::AddEthereumChain => "addEthereumChain",
            Self::SwitchEthereumChain => "switchEthereumChain",
            Self::SignMessageHash => "signMessageHash",
            Self::PersonalEcRecover => "personalEcRecover",
        }
    }
}

impl fmt::Display for HostMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkContext {
    pub chain_id: String,
    pub rpc_url: String,
}

/// Message unit sent from the provider to the host. `id` correlates the
/// eventual response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutboundEnvelope {
    pub id: u64,
    pub name: HostMethod,
    pub object: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub network: Option<NetworkContext>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ProviderEventKind {
    AccountsChanged,
    ChainChanged,
    Connect,
    Disconnect,
}

impl ProviderEventKind {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::AccountsChanged => "accountsChanged",
            Self::ChainChanged => "chainChanged",
            Self::Connect => "connect",
            Self::Disconnect => "disconnect",
        }
    }
}

impl FromStr for ProviderEventKind {
    type Err = ProviderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "accountsChanged" => Ok(Self::AccountsChanged),
            "chainChanged" => Ok(Self::ChainChanged),
            "connect" => Ok(Self::Connect),
            "disconnect" => Ok(Self::Disconnect),
            other => Err(ProviderError::UnsupportedMethod(format!(
                "unknown event name: {other}"
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProviderEvent {
    pub kind: ProviderEventKind,
    pub payload: Value,
}

impl ProviderEvent {
    pub fn accounts_changed(address: &str) -> Self {
        let accounts = if address.is_empty() {
            Vec::new()
        } else {
            vec![address.to_owned()]
        };
        Self {
            kind: ProviderEventKind::AccountsChanged,
            payload: serde_json::json!(accounts),
        }
    }

    pub fn chain_changed(chain_id_hex: &str) -> Self {
        Self {
            kind: ProviderEventKind::ChainChanged,
            payload: Value::String(chain_id_hex.to_owned()),
        }
    }

    pub fn connect(chain_id_hex: &str) -> Self {
        Self {
            kind: ProviderEventKind::Connect,
            payload: serde_json::json!({ "chainId": chain_id_hex }),
        }
    }

    pub fn disconnect() -> Self {
        Self {
            kind: ProviderEventKind::Disconnect,
            payload: serde_json::json!({
                "code": 4900,
                "message": "provider disconnected: active account cleared",
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jsonrpc: Option<String>,
    pub method: String,
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub params: Value,
}

impl JsonRpcRequest {
    pub fn new(method: impl Into<String>, params: Value) -> Self {
        Self {
            id: None,
            jsonrpc: Some("2.0".to_owned()),
            method: method.into(),
            params,
        }
    }

    pub fn with_id(mut self, id: impl Into<Value>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Positional parameters; a missing `params` member reads as empty.
    pub fn positional(&self) -> &[Value] {
        match &self.params {
            Value::Array(items) => items,
            _ => &[],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcErrorObject {
    pub code: i64,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcResponse {
    #[serde(default)]
    pub id: Value,
    pub jsonrpc: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcErrorObject>,
}

impl JsonRpcResponse {
    pub fn success(id: Value, result: Value) -> Self {
        Self {
            id,
            jsonrpc: "2.0".to_owned(),
            result: Some(result),
            error: None,
        }
    }

    pub fn failure(id: Value, error: &ProviderError) -> Self {
        Self {
            id,
            jsonrpc: "2.0".to_owned(),
            result: None,
            error: Some(error.to_rpc_error()),
        }
    }

    pub fn into_result(self) -> Result<Value, ProviderError> {
        if let Some(err) = self.error {
            return Err(ProviderError::Rpc {
                code: err.code,
                message: err.message,
                data: err.data,
            });
        }
        Ok(self.result.unwrap_or(Value::Null))
    }
}

/// Unsolicited configuration change pushed by the host.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum HostPush {
    Address {
        address: String,
    },
    #[serde(rename_all = "camelCase")]
    ChainId {
        #[serde(deserialize_with = "deserialize_chain_id")]
        chain_id: u64,
        #[serde(default)]
        rpc_url: Option<String>,
    },
    #[serde(rename_all = "camelCase")]
    RpcUrl {
        rpc_url: String,
    },
    Config {
        config: ProviderConfig,
    },
}
