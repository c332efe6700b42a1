mod common;

use common::TEST_ADDRESS;
use inpage_bridge_core::typed_data::normalize;
use inpage_bridge_core::{
    ProviderError, TypedDataPayload, TypedDataRequest, TypedDataVersion,
};
use serde_json::{json, Value};

fn mail_document() -> Value {
    json!({
        "types": {
            "EIP712Domain": [
                { "name": "name", "type": "string" },
                { "name": "version", "type": "string" },
                { "name": "chainId", "type": "uint256" },
                { "name": "verifyingContract", "type": "address" }
            ],
            "Person": [
                { "name": "name", "type": "string" },
                { "name": "wallet", "type": "address" }
            ],
            "Mail": [
                { "name": "from", "type": "Person" },
                { "name": "to", "type": "Person" },
                { "name": "contents", "type": "string" }
            ]
        },
        "primaryType": "Mail",
        "domain": {
            "name": "Ether Mail",
            "version": "1",
            "chainId": 1,
            "verifyingContract": "0xCcCCccccCCCCcCCCCCCcCcCccCcCCCcCcccccccC"
        },
        "message": {
            "from": { "name": "Cow", "wallet": "0xCD2a3d9F938E13CD947Ec05AbC7FE734Df8DD826" },
            "to": { "name": "Bob", "wallet": "0xbBbBBBBbbBBBbbbBbbBbbbbBBbBbbbbBbBbbBBbB" },
            "contents": "Hello, Bob!"
        }
    })
}

fn legacy_fields() -> Value {
    json!([
        { "type": "string", "name": "Message", "value": "Hi, Alice!" },
        { "type": "uint32", "name": "A number", "value": "1337" }
    ])
}

#[test]
fn v4_string_and_object_inputs_normalize_identically() {
    let doc = mail_document();
    let as_string = Value::String(doc.to_string());

    let from_object =
        normalize(TypedDataVersion::V4, &[json!(TEST_ADDRESS), doc.clone()]).expect("object");
    let from_string =
        normalize(TypedDataVersion::V4, &[json!(TEST_ADDRESS), as_string]).expect("string");

    assert!(!from_object.raw_input_was_string);
    assert!(from_string.raw_input_was_string);
    assert_eq!(
        from_object.to_wire().expect("wire"),
        from_string.to_wire().expect("wire")
    );
    assert_eq!(from_object.from, TEST_ADDRESS);
}

#[test]
fn address_may_come_first_or_second() {
    let doc = mail_document();
    let data_first =
        normalize(TypedDataVersion::V3, &[doc.clone(), json!(TEST_ADDRESS)]).expect("data first");
    let address_first =
        normalize(TypedDataVersion::V3, &[json!(TEST_ADDRESS), doc]).expect("address first");
    assert_eq!(data_first, address_first);
}

#[test]
fn v1_accepts_field_arrays() {
    let req = normalize(TypedDataVersion::V1, &[legacy_fields(), json!(TEST_ADDRESS)])
        .expect("v1");
    match &req.data {
        TypedDataPayload::Legacy(fields) => {
            assert_eq!(fields.len(), 2);
            assert_eq!(fields[1].kind, "uint32");
        }
        other => panic!("expected legacy payload, got {other:?}"),
    }
    let wire = req.to_wire().expect("wire");
    assert_eq!(wire["version"], json!("V1"));
    assert_eq!(wire["data"][0]["type"], json!("string"));
}

#[test]
fn wire_form_round_trips() {
    let req = normalize(TypedDataVersion::V4, &[json!(TEST_ADDRESS), mail_document()])
        .expect("v4");
    let wire = req.to_wire().expect("wire");
    assert_eq!(wire["data"]["primaryType"], json!("Mail"));
    assert!(wire.get("raw_input_was_string").is_none());
    let back = TypedDataRequest::from_wire(&wire).expect("decode");
    assert_eq!(back.data, req.data);
    assert_eq!(back.version, TypedDataVersion::V4);
}

#[test]
fn malformed_documents_are_rejected() {
    let bad_json = normalize(
        TypedDataVersion::V4,
        &[json!(TEST_ADDRESS), json!("{not json")],
    )
    .expect_err("bad json");
    assert!(matches!(bad_json, ProviderError::MalformedParameter(_)));

    let mut undeclared = mail_document();
    undeclared["primaryType"] = json!("Letter");
    assert!(normalize(TypedDataVersion::V4, &[json!(TEST_ADDRESS), undeclared]).is_err());

    let v1_object = normalize(TypedDataVersion::V1, &[mail_document(), json!(TEST_ADDRESS)]);
    assert!(v1_object.is_err());

    let v4_array = normalize(TypedDataVersion::V4, &[legacy_fields(), json!(TEST_ADDRESS)]);
    assert!(v4_array.is_err());

    let no_address = normalize(TypedDataVersion::V4, &[mail_document(), json!("nobody")]);
    assert!(no_address.is_err());

    let short = normalize(TypedDataVersion::V4, &[mail_document()]);
    assert!(short.is_err());
}

#[test]
fn array_members_need_v4() {
    let mut doc = mail_document();
    doc["types"]["Mail"] = json!([
        { "name": "from", "type": "Person" },
        { "name": "to", "type": "Person[]" },
        { "name": "contents", "type": "string" }
    ]);
    doc["message"]["to"] = json!([{ "name": "Bob", "wallet": "0xbBbBBBBbbBBBbbbBbbBbbbbBBbBbbbbBbBbbBBbB" }]);

    let err = normalize(TypedDataVersion::V3, &[json!(TEST_ADDRESS), doc.clone()])
        .expect_err("v3 array");
    assert!(err.to_string().contains("requires V4"));
    normalize(TypedDataVersion::V4, &[json!(TEST_ADDRESS), doc]).expect("v4 array");
}

#[test]
fn versions_map_from_method_names() {
    assert_eq!(
        TypedDataVersion::from_method("eth_signTypedData"),
        Some(TypedDataVersion::V1)
    );
    assert_eq!(
        TypedDataVersion::from_method("eth_signTypedData_v3"),
        Some(TypedDataVersion::V3)
    );
    assert_eq!(
        TypedDataVersion::from_method("eth_signTypedData_v4"),
        Some(TypedDataVersion::V4)
    );
    assert_eq!(TypedDataVersion::from_method("eth_sign"), None);
}
