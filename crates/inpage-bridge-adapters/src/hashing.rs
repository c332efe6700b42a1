use alloy::dyn_abi::{DynSolType, DynSolValue, TypedData};
use alloy::primitives::{keccak256, Bytes, B256};
use serde_json::{Map, Value};

use inpage_bridge_core::{
    LegacyTypedField, ProviderError, TypedDataHasher, TypedDataPayload, TypedDataRequest,
    TypedMessage,
};

/// Typed-data pre-images as wallets sign them: `0x1901 ‖ domainSeparator ‖
/// hashStruct(message)` for V3/V4 and `keccak(schema) ‖ keccak(values)` for
/// V1.
#[derive(Debug, Clone, Copy, Default)]
pub struct TypedDataHashAdapter;

impl TypedDataHasher for TypedDataHashAdapter {
    fn signing_preimage(&self, request: &TypedDataRequest) -> Result<Bytes, ProviderError> {
        match &request.data {
            TypedDataPayload::Legacy(fields) => legacy_preimage(fields),
            TypedDataPayload::Structured(message) => eip712_preimage(message),
        }
    }
}

impl TypedDataHashAdapter {
    /// keccak256 of the pre-image; the digest a signer signs.
    pub fn signing_hash(&self, request: &TypedDataRequest) -> Result<B256, ProviderError> {
        Ok(keccak256(self.signing_preimage(request)?))
    }
}

fn eip712_preimage(message: &TypedMessage) -> Result<Bytes, ProviderError> {
    let raw = serde_json::to_value(message)
        .map_err(|e| ProviderError::MalformedParameter(format!("typed data encode: {e}")))?;
    let typed: TypedData = serde_json::from_value(raw)
        .map_err(|e| ProviderError::MalformedParameter(format!("eip712 document: {e}")))?;

    let mut out = Vec::with_capacity(66);
    out.extend_from_slice(&[0x19, 0x01]);
    out.extend_from_slice(domain_separator(message, &typed)?.as_slice());
    if typed.primary_type != "EIP712Domain" {
        let struct_hash = typed
            .hash_struct()
            .map_err(|e| ProviderError::MalformedParameter(format!("eip712 hashStruct: {e}")))?;
        out.extend_from_slice(struct_hash.as_slice());
    }
    Ok(Bytes::from(out))
}

/// hashStruct of the domain over the fields `types.EIP712Domain` declares,
/// in declared order. Domain members the document does not declare are not
/// part of the separator.
fn domain_separator(message: &TypedMessage, typed: &TypedData) -> Result<B256, ProviderError> {
    let Some(declared) = message.types.get("EIP712Domain") else {
        return Ok(typed.domain.separator());
    };
    let fields: Map<String, Value> = declared
        .iter()
        .filter_map(|field| {
            message
                .domain
                .get(&field.name)
                .map(|value| (field.name.clone(), value.clone()))
        })
        .collect();

    let mut domain = typed.clone();
    domain.primary_type = "EIP712Domain".to_owned();
    domain.message = Value::Object(fields);
    domain
        .hash_struct()
        .map_err(|e| ProviderError::MalformedParameter(format!("eip712 domain: {e}")))
}

fn legacy_preimage(fields: &[LegacyTypedField]) -> Result<Bytes, ProviderError> {
    let mut schema = Vec::new();
    let mut values = Vec::new();
    for field in fields {
        schema.extend_from_slice(format!("{} {}", field.kind, field.name).as_bytes());
        values.extend_from_slice(&packed_value(field)?);
    }
    let mut out = Vec::with_capacity(64);
    out.extend_from_slice(keccak256(&schema).as_slice());
    out.extend_from_slice(keccak256(&values).as_slice());
    Ok(Bytes::from(out))
}

fn packed_value(field: &LegacyTypedField) -> Result<Vec<u8>, ProviderError> {
    let ty = DynSolType::parse(&field.kind).map_err(|e| {
        ProviderError::MalformedParameter(format!("V1 field {} type: {e}", field.name))
    })?;
    let text = match &field.value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        other => {
            return Err(ProviderError::MalformedParameter(format!(
                "V1 field {} has unsupported value {other}",
                field.name
            )))
        }
    };
    let value: DynSolValue = ty.coerce_str(&text).map_err(|e| {
        ProviderError::MalformedParameter(format!("V1 field {} value: {e}", field.name))
    })?;
    Ok(value.abi_encode_packed())
}
