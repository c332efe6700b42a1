use std::sync::Arc;

use alloy::hex;
use serde_json::{Map, Value};

use crate::config_store::{normalize_address, ConfigSnapshot, ConfigStore};
use crate::domain::{
    format_chain_id, parse_chain_id, HostMethod, HostPush, JsonRpcRequest, JsonRpcResponse,
    OutboundEnvelope,
};
use crate::host_channel::HostChannel;
use crate::overrides::{OverrideRegistry, SubOperation};
use crate::ports::{ProviderError, RpcPort};
use crate::provider::ProviderOptions;
use crate::registry::RequestRegistry;
use crate::sign_message::{self, RecoverRequest, SignMessageRequest, SignMethod};
use crate::typed_data::{self, TypedDataRequest, TypedDataVersion};

/// Answered from configuration without touching the host or the network.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocalMethod {
    Accounts,
    Coinbase,
    ChainId,
    NetVersion,
}

/// Requires a host round-trip.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrivilegedMethod {
    RequestAccounts,
    EthSign,
    PersonalSign,
    PersonalEcRecover,
    SignTypedData(TypedDataVersion),
    SendTransaction,
    SignTransaction,
    SwitchEthereumChain,
    AddEthereumChain,
    WatchAsset,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Local(LocalMethod),
    Privileged(PrivilegedMethod),
    /// Sent to the configured remote JSON-RPC endpoint.
    Forward,
    Unsupported,
}

const METHOD_TABLE: &[(&str, Route)] = &[
    ("eth_accounts", Route::Local(LocalMethod::Accounts)),
    ("eth_coinbase", Route::Local(LocalMethod::Coinbase)),
    ("eth_chainId", Route::Local(LocalMethod::ChainId)),
    ("net_version", Route::Local(LocalMethod::NetVersion)),
    ("eth_requestAccounts", Route::Privileged(PrivilegedMethod::RequestAccounts)),
    ("eth_sign", Route::Privileged(PrivilegedMethod::EthSign)),
    ("personal_sign", Route::Privileged(PrivilegedMethod::PersonalSign)),
    ("personal_ecRecover", Route::Privileged(PrivilegedMethod::PersonalEcRecover)),
    (
        "eth_signTypedData",
        Route::Privileged(PrivilegedMethod::SignTypedData(TypedDataVersion::V1)),
    ),
    (
        "eth_signTypedData_v1",
        Route::Privileged(PrivilegedMethod::SignTypedData(TypedDataVersion::V1)),
    ),
    (
        "eth_signTypedData_v3",
        Route::Privileged(PrivilegedMethod::SignTypedData(TypedDataVersion::V3)),
    ),
    (
        "eth_signTypedData_v4",
        Route::Privileged(PrivilegedMethod::SignTypedData(TypedDataVersion::V4)),
    ),
    ("eth_sendTransaction", Route::Privileged(PrivilegedMethod::SendTransaction)),
    ("eth_signTransaction", Route::Privileged(PrivilegedMethod::SignTransaction)),
    (
        "wallet_switchEthereumChain",
        Route::Privileged(PrivilegedMethod::SwitchEthereumChain),
    ),
    ("wallet_addEthereumChain", Route::Privileged(PrivilegedMethod::AddEthereumChain)),
    ("wallet_watchAsset", Route::Privileged(PrivilegedMethod::WatchAsset)),
    ("eth_subscribe", Route::Unsupported),
    ("eth_unsubscribe", Route::Unsupported),
];

pub fn route(method: &str) -> Route {
    METHOD_TABLE
        .iter()
        .find(|(name, _)| *name == method)
        .map_or(Route::Forward, |(_, route)| *route)
}

impl LocalMethod {
    pub fn answer(&self, config: &ConfigSnapshot) -> Value {
        match self {
            Self::Accounts => serde_json::json!(config.accounts()),
            Self::Coinbase => config
                .accounts()
                .into_iter()
                .next()
                .map_or(Value::Null, Value::String),
            Self::ChainId | Self::NetVersion => Value::String(config.chain_id_hex.clone()),
        }
    }
}

/// A privileged call after parameter normalization, before an envelope is
/// built for it.
#[derive(Debug, Clone, PartialEq)]
pub enum PreparedCall {
    Message(SignMessageRequest),
    TypedData(TypedDataRequest),
    Recover(RecoverRequest),
    Generic {
        name: HostMethod,
        object: Value,
        with_network: bool,
    },
}

impl PreparedCall {
    pub fn host_method(&self) -> HostMethod {
        match self {
            Self::Message(req) => match req.method {
                SignMethod::EthSign => HostMethod::SignMessage,
                SignMethod::PersonalSign => HostMethod::SignPersonalMessage,
            },
            Self::TypedData(_) => HostMethod::SignTypedMessage,
            Self::Recover(_) => HostMethod::EcRecover,
            Self::Generic { name, .. } => *name,
        }
    }

    pub fn sub_operation(&self) -> Option<SubOperation> {
        match self {
            Self::Message(_) | Self::TypedData(_) => Some(SubOperation::SignMessageHash),
            Self::Recover(_) => Some(SubOperation::PersonalEcRecover),
            Self::Generic { .. } => None,
        }
    }

    pub fn default_object(&self) -> Result<Value, ProviderError> {
        match self {
            Self::Message(req) => Ok(req.to_wire()),
            Self::TypedData(req) => req.to_wire(),
            Self::Recover(req) => Ok(req.to_wire()),
            Self::Generic { object, .. } => Ok(object.clone()),
        }
    }

    fn with_network(&self) -> bool {
        match self {
            Self::Generic { with_network, .. } => *with_network,
            _ => false,
        }
    }
}

impl PrivilegedMethod {
    /// Validates and canonicalizes parameters. Runs before any id is
    /// registered, so a failure leaves nothing pending.
    pub fn prepare(&self, params: &Value, config: &ConfigSnapshot) -> Result<PreparedCall, ProviderError> {
        let positional = match params {
            Value::Array(items) => items.as_slice(),
            _ => &[],
        };
        match self {
            Self::RequestAccounts => Ok(PreparedCall::Generic {
                name: HostMethod::RequestAccounts,
                object: Value::Object(Map::new()),
                with_network: false,
            }),
            Self::EthSign => sign_message::normalize(SignMethod::EthSign, positional)
                .map(PreparedCall::Message),
            Self::PersonalSign => sign_message::normalize(SignMethod::PersonalSign, positional)
                .map(PreparedCall::Message),
            Self::PersonalEcRecover => {
                sign_message::normalize_recover(positional).map(PreparedCall::Recover)
            }
            Self::SignTypedData(version) => {
                typed_data::normalize(*version, positional).map(PreparedCall::TypedData)
            }
            Self::SendTransaction | Self::SignTransaction => {
                let transaction = prepare_transaction(first_object(params, "transaction")?, config)?;
                Ok(PreparedCall::Generic {
                    name: HostMethod::SignTransaction,
                    object: serde_json::json!({
                        "transaction": transaction,
                        "broadcast": matches!(self, Self::SendTransaction),
                    }),
                    with_network: true,
                })
            }
            Self::SwitchEthereumChain => {
                let request = first_object(params, "chain switch")?;
                let raw = request
                    .get("chainId")
                    .and_then(Value::as_str)
                    .filter(|s| s.starts_with("0x"))
                    .ok_or_else(|| {
                        ProviderError::MalformedParameter(
                            "wallet_switchEthereumChain needs a 0x-prefixed chainId".to_owned(),
                        )
                    })?;
                let chain_id = parse_chain_id(raw)?;
                Ok(PreparedCall::Generic {
                    name: HostMethod::SwitchEthereumChain,
                    object: serde_json::json!({ "chainId": format_chain_id(chain_id) }),
                    with_network: true,
                })
            }
            Self::AddEthereumChain => {
                let request = first_object(params, "chain definition")?;
                if request.get("chainId").and_then(Value::as_str).is_none() {
                    return Err(ProviderError::MalformedParameter(
                        "wallet_addEthereumChain needs a chainId".to_owned(),
                    ));
                }
                Ok(PreparedCall::Generic {
                    name: HostMethod::AddEthereumChain,
                    object: Value::Object(request.clone()),
                    with_network: true,
                })
            }
            Self::WatchAsset => {
                let request = first_object(params, "asset")?;
                if request.get("type").and_then(Value::as_str).is_none() {
                    return Err(ProviderError::MalformedParameter(
                        "wallet_watchAsset needs an asset type".to_owned(),
                    ));
                }
                Ok(PreparedCall::Generic {
                    name: HostMethod::WatchAsset,
                    object: Value::Object(request.clone()),
                    with_network: false,
                })
            }
        }
    }
}

/// Accepts `{..}` or `[{..}, ..]`.
fn first_object<'a>(params: &'a Value, what: &str) -> Result<&'a Map<String, Value>, ProviderError> {
    let candidate = match params {
        Value::Array(items) => items.first(),
        other => Some(other),
    };
    candidate
        .and_then(Value::as_object)
        .ok_or_else(|| ProviderError::MalformedParameter(format!("{what} must be an object")))
}

fn prepare_transaction(
    transaction: &Map<String, Value>,
    config: &ConfigSnapshot,
) -> Result<Value, ProviderError> {
    let mut transaction = transaction.clone();
    let from = match transaction.get("from") {
        Some(Value::String(from)) => normalize_address(from)?,
        Some(_) => {
            return Err(ProviderError::MalformedParameter(
                "transaction.from must be a string".to_owned(),
            ))
        }
        None if config.ready => config.address.clone(),
        None => {
            return Err(ProviderError::MalformedParameter(
                "transaction has no from and no account is active".to_owned(),
            ))
        }
    };
    transaction.insert("from".to_owned(), Value::String(from));
    Ok(Value::Object(transaction))
}

/// Routes each call to a local answer, a host round-trip or the remote
/// endpoint.
pub struct MethodDispatcher<R> {
    config: Arc<ConfigStore>,
    registry: Arc<RequestRegistry>,
    channel: Arc<HostChannel>,
    overrides: Arc<OverrideRegistry>,
    rpc: R,
    options: ProviderOptions,
}

impl<R> MethodDispatcher<R>
where
    R: RpcPort,
{
    pub fn new(
        config: Arc<ConfigStore>,
        registry: Arc<RequestRegistry>,
        channel: Arc<HostChannel>,
        overrides: Arc<OverrideRegistry>,
        rpc: R,
        options: ProviderOptions,
    ) -> Self {
        Self {
            config,
            registry,
            channel,
            overrides,
            rpc,
            options,
        }
    }

    pub async fn request(&self, request: &JsonRpcRequest) -> Result<Value, ProviderError> {
        match route(&request.method) {
            Route::Local(method) => Ok(method.answer(&self.config.snapshot()?)),
            Route::Privileged(method) => self.privileged(method, request).await,
            Route::Forward => self.forward(request).await?.into_result(),
            Route::Unsupported => Err(ProviderError::UnsupportedMethod(request.method.clone())),
        }
    }

    /// Answers from configuration when the method is local; `None` otherwise.
    pub fn answer_local(&self, request: &JsonRpcRequest) -> Option<Result<Value, ProviderError>> {
        match route(&request.method) {
            Route::Local(method) => Some(self.config.snapshot().map(|c| method.answer(&c))),
            _ => None,
        }
    }

    /// Sends the call to the remote endpoint; the response keeps the
    /// caller's id.
    pub async fn forward(&self, request: &JsonRpcRequest) -> Result<JsonRpcResponse, ProviderError> {
        let rpc_url = self.config.snapshot()?.rpc_url;
        if rpc_url.is_empty() {
            return Err(ProviderError::UnsupportedMethod(format!(
                "{} needs a remote rpc endpoint and none is configured",
                request.method
            )));
        }
        let mut outbound = request.clone();
        outbound.jsonrpc = Some("2.0".to_owned());
        let outbound_id = outbound
            .id
            .get_or_insert_with(|| Value::from(self.registry.next_id()))
            .clone();

        tracing::debug!(method = %request.method, rpc_url = %rpc_url, "forwarding to remote rpc");
        let mut response = self.rpc.call(&rpc_url, &outbound).await.inspect_err(|e| {
            tracing::warn!(method = %request.method, error = %e, "remote rpc call failed");
        })?;
        response.id = request.id.clone().unwrap_or(outbound_id);
        Ok(response)
    }

    async fn privileged(
        &self,
        method: PrivilegedMethod,
        request: &JsonRpcRequest,
    ) -> Result<Value, ProviderError> {
        let snapshot = self.config.snapshot()?;
        let prepared = method.prepare(&request.params, &snapshot)?;

        let override_port = prepared
            .sub_operation()
            .and_then(|op| self.overrides.get(op).map(|port| (op, port)));
        let (name, object, via) = match override_port {
            Some((op, port)) => (op.host_method(), self.override_object(&prepared, op)?, Some(port)),
            None => (prepared.host_method(), prepared.default_object()?, None),
        };

        let id = self.registry.next_id();
        let handle = self.registry.register(id, &request.method)?;
        let envelope = OutboundEnvelope {
            id,
            name,
            object,
            network: prepared.with_network().then(|| snapshot.network()),
        };
        self.channel.post_to_host(&envelope, via)?;

        let value = match self.options.host_timeout {
            Some(limit) => match tokio::time::timeout(limit, handle.wait()).await {
                Ok(outcome) => outcome?,
                Err(_) => {
                    let millis = u64::try_from(limit.as_millis()).unwrap_or(u64::MAX);
                    self.registry.abandon(id, ProviderError::HostTimeout(millis));
                    tracing::warn!(id, method = %request.method, millis, "host response timed out");
                    return Err(ProviderError::HostTimeout(millis));
                }
            },
            None => handle.wait().await?,
        };

        if method == PrivilegedMethod::RequestAccounts {
            self.adopt_accounts(&value, &snapshot)?;
        }
        Ok(value)
    }

    fn override_object(&self, prepared: &PreparedCall, op: SubOperation) -> Result<Value, ProviderError> {
        match (prepared, op) {
            (PreparedCall::Message(req), SubOperation::SignMessageHash) => Ok(serde_json::json!({
                "address": req.address,
                "data": hex::encode_prefixed(req.preimage()),
            })),
            (PreparedCall::TypedData(req), SubOperation::SignMessageHash) => {
                let hasher = self.options.typed_data_hasher.as_ref().ok_or_else(|| {
                    ProviderError::UnsupportedMethod(format!(
                        "{} typed data needs a typed data hasher for the {} override",
                        req.version,
                        op.key()
                    ))
                })?;
                let preimage = hasher.signing_preimage(req)?;
                Ok(serde_json::json!({
                    "address": req.from,
                    "data": hex::encode_prefixed(preimage),
                }))
            }
            (PreparedCall::Recover(req), SubOperation::PersonalEcRecover) => {
                let recovered = req.recover_address()?;
                let mut object = req.to_wire();
                object["data"] = Value::String(recovered);
                Ok(object)
            }
            (_, op) => Err(ProviderError::UnsupportedMethod(format!(
                "{} override does not apply to {}",
                op.key(),
                prepared.host_method()
            ))),
        }
    }

    /// Stores the first account the host granted when it differs from the
    /// active one. A granted value that is not an address is logged and left
    /// out of the configuration; the caller still gets the host's answer.
    fn adopt_accounts(&self, value: &Value, before: &ConfigSnapshot) -> Result<(), ProviderError> {
        let Some(first) = value
            .as_array()
            .and_then(|accounts| accounts.first())
            .and_then(Value::as_str)
        else {
            return Ok(());
        };
        let granted = match normalize_address(first) {
            Ok(granted) if !granted.is_empty() => granted,
            Ok(_) => return Ok(()),
            Err(e) => {
                tracing::warn!(account = first, error = %e, "host granted an account that is not an address");
                return Ok(());
            }
        };
        if granted != before.address {
            self.channel.receive_config_change(HostPush::Address { address: granted })?;
        }
        Ok(())
    }
}
