use alloy::hex;
use alloy::primitives::{Bytes, Signature};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config_store::normalize_address;
use crate::ports::ProviderError;

const EIP191_PREFIX: &str = "\x19Ethereum Signed Message:\n";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SignMethod {
    EthSign,
    PersonalSign,
}

impl SignMethod {
    /// Index of the account in the canonical parameter order.
    const fn address_position(&self) -> usize {
        match self {
            Self::EthSign => 0,
            Self::PersonalSign => 1,
        }
    }
}

/// How the message parameter was supplied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageEncoding {
    Hex,
    Utf8,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignMessageRequest {
    pub method: SignMethod,
    pub address: String,
    pub message: Bytes,
    pub encoding: MessageEncoding,
}

impl SignMessageRequest {
    /// Bytes whose keccak256 is the digest to sign. personal_sign always
    /// carries the EIP-191 prefix; eth_sign signs hex input raw and prefixes
    /// UTF-8 input.
    pub fn preimage(&self) -> Vec<u8> {
        match (self.method, self.encoding) {
            (SignMethod::EthSign, MessageEncoding::Hex) => self.message.to_vec(),
            _ => eip191_message(&self.message),
        }
    }

    pub fn to_wire(&self) -> Value {
        serde_json::json!({
            "address": self.address,
            "data": hex::encode_prefixed(&self.message),
            "encoding": self.encoding,
        })
    }
}

pub fn eip191_message(message: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(EIP191_PREFIX.len() + 20 + message.len());
    out.extend_from_slice(EIP191_PREFIX.as_bytes());
    out.extend_from_slice(message.len().to_string().as_bytes());
    out.extend_from_slice(message);
    out
}

/// Decodes `0x`-prefixed hex; anything else is taken as literal UTF-8.
pub fn decode_message(raw: &str) -> (Bytes, MessageEncoding) {
    if raw.starts_with("0x") {
        if let Ok(bytes) = hex::decode(raw) {
            return (Bytes::from(bytes), MessageEncoding::Hex);
        }
    }
    (Bytes::from(raw.as_bytes().to_vec()), MessageEncoding::Utf8)
}

/// eth_sign is `[address, message]`, personal_sign is `[message, address]`;
/// either order is accepted for both.
pub fn normalize(method: SignMethod, params: &[Value]) -> Result<SignMessageRequest, ProviderError> {
    if params.len() < 2 {
        return Err(ProviderError::MalformedParameter(format!(
            "{method:?} expects an address and a message, got {} params",
            params.len()
        )));
    }
    let canonical = method.address_position();
    let swapped = 1 - canonical;
    let address_at = if is_address(&params[canonical]) {
        canonical
    } else if is_address(&params[swapped]) {
        swapped
    } else {
        return Err(ProviderError::MalformedParameter(format!(
            "{method:?} params carry no account address"
        )));
    };
    let address = normalize_address(param_str(&params[address_at], "address")?)?;
    let raw = param_str(&params[1 - address_at], "message")?;
    let (message, encoding) = decode_message(raw);
    Ok(SignMessageRequest {
        method,
        address,
        message,
        encoding,
    })
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecoverRequest {
    pub message: Bytes,
    pub encoding: MessageEncoding,
    pub signature: Bytes,
}

impl RecoverRequest {
    /// Recovers the personal_sign signer as a lowercase address.
    pub fn recover_address(&self) -> Result<String, ProviderError> {
        let signature = Signature::try_from(self.signature.as_ref())
            .map_err(|e| ProviderError::MalformedParameter(format!("invalid signature: {e}")))?;
        let address = signature
            .recover_address_from_msg(self.message.as_ref())
            .map_err(|e| ProviderError::MalformedParameter(format!("signature recovery: {e}")))?;
        Ok(hex::encode_prefixed(address))
    }

    pub fn to_wire(&self) -> Value {
        serde_json::json!({
            "message": hex::encode_prefixed(&self.message),
            "signature": hex::encode_prefixed(&self.signature),
            "encoding": self.encoding,
        })
    }
}

/// personal_ecRecover takes `[message, signature]`.
pub fn normalize_recover(params: &[Value]) -> Result<RecoverRequest, ProviderError> {
    if params.len() < 2 {
        return Err(ProviderError::MalformedParameter(format!(
            "personal_ecRecover expects [message, signature], got {} params",
            params.len()
        )));
    }
    let (message, encoding) = decode_message(param_str(&params[0], "message")?);
    let signature = hex::decode(param_str(&params[1], "signature")?)
        .map_err(|e| ProviderError::MalformedParameter(format!("signature is not hex: {e}")))?;
    if signature.len() != 65 {
        return Err(ProviderError::MalformedParameter(format!(
            "signature must be 65 bytes, got {}",
            signature.len()
        )));
    }
    Ok(RecoverRequest {
        message,
        encoding,
        signature: Bytes::from(signature),
    })
}

fn is_address(value: &Value) -> bool {
    value
        .as_str()
        .is_some_and(|s| s.len() == 42 && normalize_address(s).is_ok())
}

fn param_str<'a>(value: &'a Value, what: &str) -> Result<&'a str, ProviderError> {
    value
        .as_str()
        .ok_or_else(|| ProviderError::MalformedParameter(format!("{what} must be a string")))
}
