//! Normalization of the three typed-data signing formats.
//!
//! `eth_signTypedData` (V1) carries a flat array of `{type, name, value}`
//! fields. `eth_signTypedData_v3` and `_v4` carry an EIP-712 document either
//! as JSON text or as an already-decoded object. All of them leave the
//! dispatcher as a [`TypedDataRequest`], whose wire form does not depend on
//! how the document was supplied.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::config_store::normalize_address;
use crate::ports::ProviderError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TypedDataVersion {
    V1,
    V3,
    V4,
}

impl TypedDataVersion {
    pub fn from_method(method: &str) -> Option<Self> {
        match method {
            "eth_signTypedData" | "eth_signTypedData_v1" => Some(Self::V1),
            "eth_signTypedData_v3" => Some(Self::V3),
            "eth_signTypedData_v4" => Some(Self::V4),
            _ => None,
        }
    }
}

impl fmt::Display for TypedDataVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::V1 => f.write_str("V1"),
            Self::V3 => f.write_str("V3"),
            Self::V4 => f.write_str("V4"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LegacyTypedField {
    #[serde(rename = "type")]
    pub kind: String,
    pub name: String,
    pub value: Value,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypedField {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TypedMessage {
    pub types: BTreeMap<String, Vec<TypedField>>,
    pub primary_type: String,
    #[serde(default)]
    pub domain: Map<String, Value>,
    pub message: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TypedDataPayload {
    Legacy(Vec<LegacyTypedField>),
    Structured(TypedMessage),
}

/// Canonical typed-data envelope handed to the host.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypedDataRequest {
    pub version: TypedDataVersion,
    pub from: String,
    pub data: TypedDataPayload,
    /// Diagnostic only; never part of the wire form.
    #[serde(skip)]
    pub raw_input_was_string: bool,
}

impl TypedDataRequest {
    pub fn to_wire(&self) -> Result<Value, ProviderError> {
        serde_json::to_value(self)
            .map_err(|e| ProviderError::MalformedParameter(format!("typed data encode: {e}")))
    }

    pub fn from_wire(value: &Value) -> Result<Self, ProviderError> {
        Self::deserialize(value)
            .map_err(|e| ProviderError::MalformedParameter(format!("typed data decode: {e}")))
    }
}

/// Accepts `[data, address]` or `[address, data]`; the address is whichever
/// positional argument parses as one.
pub fn normalize(
    version: TypedDataVersion,
    params: &[Value],
) -> Result<TypedDataRequest, ProviderError> {
    if params.len() < 2 {
        return Err(ProviderError::MalformedParameter(format!(
            "{version} typed data expects [data, address], got {} params",
            params.len()
        )));
    }
    let (raw, from) = match (as_address(&params[0]), as_address(&params[1])) {
        (Some(address), _) => (&params[1], address),
        (None, Some(address)) => (&params[0], address),
        (None, None) => {
            return Err(ProviderError::MalformedParameter(
                "typed data params carry no account address".to_owned(),
            ))
        }
    };

    let raw_input_was_string = raw.is_string();
    let decoded = match raw {
        Value::String(text) => serde_json::from_str::<Value>(text).map_err(|e| {
            ProviderError::MalformedParameter(format!("typed data is not valid JSON: {e}"))
        })?,
        other => other.clone(),
    };

    let data = match version {
        TypedDataVersion::V1 => TypedDataPayload::Legacy(decode_legacy(decoded)?),
        TypedDataVersion::V3 | TypedDataVersion::V4 => {
            TypedDataPayload::Structured(decode_structured(version, decoded)?)
        }
    };

    Ok(TypedDataRequest {
        version,
        from,
        data,
        raw_input_was_string,
    })
}

fn as_address(value: &Value) -> Option<String> {
    value
        .as_str()
        .filter(|s| s.len() == 42)
        .and_then(|s| normalize_address(s).ok())
}

fn decode_legacy(value: Value) -> Result<Vec<LegacyTypedField>, ProviderError> {
    if !value.is_array() {
        return Err(ProviderError::MalformedParameter(
            "V1 typed data must be an array of {type, name, value}".to_owned(),
        ));
    }
    let fields: Vec<LegacyTypedField> = serde_json::from_value(value)
        .map_err(|e| ProviderError::MalformedParameter(format!("V1 typed data field: {e}")))?;
    if fields.is_empty() {
        return Err(ProviderError::MalformedParameter(
            "V1 typed data must not be empty".to_owned(),
        ));
    }
    for field in &fields {
        if !is_elementary(&field.kind) {
            return Err(ProviderError::MalformedParameter(format!(
                "V1 field {} has unsupported type {}",
                field.name, field.kind
            )));
        }
    }
    Ok(fields)
}

fn decode_structured(
    version: TypedDataVersion,
    value: Value,
) -> Result<TypedMessage, ProviderError> {
    if !value.is_object() {
        return Err(ProviderError::MalformedParameter(format!(
            "{version} typed data must be an object"
        )));
    }
    let message: TypedMessage = serde_json::from_value(value)
        .map_err(|e| ProviderError::MalformedParameter(format!("{version} typed data: {e}")))?;

    if message.primary_type != "EIP712Domain" && !message.types.contains_key(&message.primary_type)
    {
        return Err(ProviderError::MalformedParameter(format!(
            "primaryType {} is not declared in types",
            message.primary_type
        )));
    }
    for (struct_name, fields) in &message.types {
        for field in fields {
            let base = field.kind.split('[').next().unwrap_or_default();
            let is_array = base.len() != field.kind.len();
            if is_array && version == TypedDataVersion::V3 {
                return Err(ProviderError::MalformedParameter(format!(
                    "{struct_name}.{} uses array type {}, which requires V4",
                    field.name, field.kind
                )));
            }
            if !message.types.contains_key(base) && !is_elementary(base) {
                return Err(ProviderError::MalformedParameter(format!(
                    "{struct_name}.{} references undeclared type {}",
                    field.name, field.kind
                )));
            }
        }
    }
    if !message.message.is_object() {
        return Err(ProviderError::MalformedParameter(
            "typed data message must be an object".to_owned(),
        ));
    }
    Ok(message)
}

fn is_elementary(kind: &str) -> bool {
    match kind {
        "address" | "bool" | "string" | "bytes" | "uint" | "int" => true,
        _ => {
            if let Some(size) = kind.strip_prefix("bytes") {
                return size.parse::<usize>().is_ok_and(|n| (1..=32).contains(&n));
            }
            let bits = kind
                .strip_prefix("uint")
                .or_else(|| kind.strip_prefix("int"));
            bits.and_then(|b| b.parse::<usize>().ok())
                .is_some_and(|n| n % 8 == 0 && (8..=256).contains(&n))
        }
    }
}
