//! Reference host that holds a single local key and answers every envelope
//! the bridge can post.
//!
//! Meant for tests and the stdio harness; a real wallet would put an
//! authorization step in front of each signature.

use std::str::FromStr;

use alloy::hex;
use alloy::primitives::{keccak256, Bytes, B256};
use alloy::signers::local::PrivateKeySigner;
use alloy::signers::SignerSync;
use serde_json::{json, Value};
use tokio::sync::mpsc;

use inpage_bridge_core::{
    parse_chain_id, HostMethod, MessageEncoding, OutboundEnvelope, Provider, ProviderError,
    RecoverRequest, TypedDataRequest,
};

use crate::hashing::TypedDataHashAdapter;

#[derive(Debug, Clone)]
pub struct LocalSignerHost {
    signer: PrivateKeySigner,
    address: String,
    hasher: TypedDataHashAdapter,
}

impl LocalSignerHost {
    pub fn new(signer: PrivateKeySigner) -> Self {
        let address = hex::encode_prefixed(signer.address());
        Self {
            signer,
            address,
            hasher: TypedDataHashAdapter,
        }
    }

    pub fn from_key(key: &str) -> Result<Self, ProviderError> {
        let signer = PrivateKeySigner::from_str(key.trim())
            .map_err(|e| ProviderError::MalformedParameter(format!("invalid signer key: {e}")))?;
        Ok(Self::new(signer))
    }

    /// Lowercase `0x` address of the key.
    pub fn address(&self) -> &str {
        &self.address
    }

    /// Result for the envelope, or the error payload the host rejects with.
    pub fn answer(&self, envelope: &OutboundEnvelope) -> Result<Value, Value> {
        let object = &envelope.object;
        match envelope.name {
            HostMethod::RequestAccounts => Ok(json!([self.address])),
            HostMethod::SignMessage => self.sign_message(object, false),
            HostMethod::SignPersonalMessage => self.sign_message(object, true),
            HostMethod::SignTypedMessage => self.sign_typed(object),
            HostMethod::EcRecover => ec_recover(object),
            HostMethod::SignMessageHash => self.sign_preimage(object),
            HostMethod::PersonalEcRecover => Ok(object.get("data").cloned().unwrap_or(Value::Null)),
            HostMethod::SwitchEthereumChain | HostMethod::AddEthereumChain => Ok(Value::Null),
            HostMethod::WatchAsset => Ok(Value::Bool(true)),
            HostMethod::SignTransaction => Err(rejection(
                4200,
                "transaction signing is not supported by the local signer",
            )),
        }
    }

    /// Answers one envelope through the provider's completion entry point.
    pub fn handle<R>(&self, provider: &Provider<R>, envelope: &OutboundEnvelope) -> bool {
        let outcome = self.answer(envelope);
        if envelope.name == HostMethod::SwitchEthereumChain && outcome.is_ok() {
            self.apply_chain_switch(provider, &envelope.object);
        }
        match outcome {
            Ok(result) => provider.send_response(envelope.id, result),
            Err(payload) => {
                tracing::info!(id = envelope.id, name = %envelope.name, %payload, "local signer rejected envelope");
                provider.send_error(envelope.id, payload)
            }
        }
    }

    /// Drains `inbox` until every sender is gone.
    pub async fn serve<R>(
        &self,
        provider: Provider<R>,
        mut inbox: mpsc::UnboundedReceiver<OutboundEnvelope>,
    ) {
        while let Some(envelope) = inbox.recv().await {
            tracing::debug!(id = envelope.id, name = %envelope.name, "local signer received envelope");
            if !self.handle(&provider, &envelope) {
                tracing::debug!(id = envelope.id, "no pending request for signer answer");
            }
        }
    }

    fn apply_chain_switch<R>(&self, provider: &Provider<R>, object: &Value) {
        let Some(raw) = object.get("chainId").and_then(Value::as_str) else {
            return;
        };
        match parse_chain_id(raw) {
            Ok(chain_id) => {
                if let Err(e) = provider.change_chain_id(chain_id, None) {
                    tracing::warn!(chain_id, error = %e, "chain switch not applied");
                }
            }
            Err(e) => tracing::warn!(chain_id = raw, error = %e, "chain switch carried a bad id"),
        }
    }

    fn sign_message(&self, object: &Value, personal: bool) -> Result<Value, Value> {
        self.check_account(object.get("address"))?;
        let message = hex_field(object, "data")?;
        let encoding = encoding_field(object)?;
        let signature = if personal || encoding == MessageEncoding::Utf8 {
            self.signer.sign_message_sync(&message)
        } else {
            self.signer.sign_hash_sync(&keccak256(&message))
        }
        .map_err(|e| rejection(-32603, &format!("signing failed: {e}")))?;
        Ok(json!(hex::encode_prefixed(signature.as_bytes())))
    }

    fn sign_typed(&self, object: &Value) -> Result<Value, Value> {
        let request =
            TypedDataRequest::from_wire(object).map_err(|e| rejection(e.code(), &e.to_string()))?;
        self.check_account(Some(&Value::String(request.from.clone())))?;
        let hash = self
            .hasher
            .signing_hash(&request)
            .map_err(|e| rejection(e.code(), &e.to_string()))?;
        self.sign_digest(&hash)
    }

    fn sign_preimage(&self, object: &Value) -> Result<Value, Value> {
        self.check_account(object.get("address"))?;
        let preimage = hex_field(object, "data")?;
        self.sign_digest(&keccak256(&preimage))
    }

    fn sign_digest(&self, hash: &B256) -> Result<Value, Value> {
        let signature = self
            .signer
            .sign_hash_sync(hash)
            .map_err(|e| rejection(-32603, &format!("signing failed: {e}")))?;
        Ok(json!(hex::encode_prefixed(signature.as_bytes())))
    }

    fn check_account(&self, requested: Option<&Value>) -> Result<(), Value> {
        let requested = requested.and_then(Value::as_str).unwrap_or_default();
        if requested.eq_ignore_ascii_case(&self.address) {
            Ok(())
        } else {
            Err(rejection(
                4100,
                &format!("account {requested} is not held by this signer"),
            ))
        }
    }
}

fn ec_recover(object: &Value) -> Result<Value, Value> {
    let request = RecoverRequest {
        message: hex_field(object, "message")?,
        encoding: encoding_field(object)?,
        signature: hex_field(object, "signature")?,
    };
    request
        .recover_address()
        .map(Value::String)
        .map_err(|e| rejection(e.code(), &e.to_string()))
}

fn hex_field(object: &Value, key: &str) -> Result<Bytes, Value> {
    let raw = object
        .get(key)
        .and_then(Value::as_str)
        .ok_or_else(|| rejection(-32602, &format!("envelope object has no {key}")))?;
    hex::decode(raw)
        .map(Bytes::from)
        .map_err(|e| rejection(-32602, &format!("{key} is not hex: {e}")))
}

fn encoding_field(object: &Value) -> Result<MessageEncoding, Value> {
    match object.get("encoding") {
        None | Some(Value::Null) => Ok(MessageEncoding::Hex),
        Some(raw) => serde_json::from_value(raw.clone())
            .map_err(|e| rejection(-32602, &format!("unknown message encoding: {e}"))),
    }
}

fn rejection(code: i64, message: &str) -> Value {
    json!({ "code": code, "message": message })
}
