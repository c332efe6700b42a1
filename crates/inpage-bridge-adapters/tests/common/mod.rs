#![allow(dead_code)]

use std::io::Read;
use std::sync::{Arc, Mutex};
use std::thread;

use serde_json::{json, Value};
use tiny_http::{Response, Server, StatusCode};

use inpage_bridge_adapters::{BridgeAdapterConfig, ChannelHost, HttpRpcAdapter, LocalSignerHost};
use inpage_bridge_core::{JsonRpcRequest, Provider, ProviderConfig};

pub const TEST_KEY: &str = "0x5e5c0a55709bfb193b97de696114ad97e9578126e47823e0edf3d5abecd74f71";
pub const TEST_ADDRESS: &str = "0xcaaf133b00d04b964798f6aa040b445263b458b0";

/// Mock JSON-RPC node: answers each request with `reply(method, params)` as
/// `(status, body)` and records every request body it sees.
pub fn spawn_mock_rpc<F>(
    max_requests: usize,
    seen: Arc<Mutex<Vec<Value>>>,
    reply: F,
) -> (String, thread::JoinHandle<()>)
where
    F: Fn(&str, &Value) -> (u16, Value) + Send + 'static,
{
    let server = Server::http("127.0.0.1:0").expect("start server");
    let addr = format!("http://{}", server.server_addr());

    let join = thread::spawn(move || {
        for _ in 0..max_requests {
            let mut req = match server.recv() {
                Ok(r) => r,
                Err(_) => break,
            };
            let mut body = String::new();
            if req.as_reader().read_to_string(&mut body).is_err() {
                break;
            }
            let parsed: Value = serde_json::from_str(&body).unwrap_or(Value::Null);
            if let Ok(mut g) = seen.lock() {
                g.push(parsed.clone());
            }
            let method = parsed.get("method").and_then(Value::as_str).unwrap_or_default();
            let params = parsed.get("params").cloned().unwrap_or(Value::Null);
            let (code, payload) = reply(method, &params);
            let payload = match payload {
                Value::Object(mut map) if !map.contains_key("id") => {
                    map.insert("id".to_owned(), parsed.get("id").cloned().unwrap_or(Value::Null));
                    Value::Object(map)
                }
                other => other,
            };
            let response =
                Response::from_string(payload.to_string()).with_status_code(StatusCode(code));
            let _ = req.respond(response);
        }
    });

    (addr, join)
}

pub fn rpc_result(result: Value) -> (u16, Value) {
    (200, json!({ "jsonrpc": "2.0", "result": result }))
}

pub fn rpc_adapter() -> HttpRpcAdapter {
    HttpRpcAdapter::with_config(&BridgeAdapterConfig {
        rpc_timeout_ms: 5_000,
        ..BridgeAdapterConfig::default()
    })
    .expect("rpc adapter")
}

pub fn test_signer() -> LocalSignerHost {
    LocalSignerHost::from_key(TEST_KEY).expect("signer")
}

/// Provider whose host is the local signer, served on the current runtime.
pub fn signer_provider(config: ProviderConfig) -> Provider<HttpRpcAdapter> {
    let (host, inbox) = ChannelHost::new();
    let cfg = BridgeAdapterConfig::default();
    let provider = Provider::with_options(config, host, rpc_adapter(), cfg.provider_options())
        .expect("provider");
    let signer = test_signer();
    let served = provider.clone();
    tokio::spawn(async move { signer.serve(served, inbox).await });
    provider
}

pub fn request(method: &str, params: Value) -> JsonRpcRequest {
    JsonRpcRequest::new(method, params)
}

pub fn mail_document() -> Value {
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

pub fn legacy_fields() -> Value {
    json!([
        { "type": "string", "name": "Message", "value": "Hi, Alice!" },
        { "type": "uint32", "name": "A number", "value": "1337" }
    ])
}
