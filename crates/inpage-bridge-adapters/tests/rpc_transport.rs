mod common;

use std::sync::{Arc, Mutex};

use common::{request, rpc_adapter, rpc_result, spawn_mock_rpc, TEST_ADDRESS};
use inpage_bridge_adapters::ChannelHost;
use inpage_bridge_core::{Provider, ProviderConfig, ProviderError, RpcPort};
use serde_json::{json, Value};

#[tokio::test]
async fn http_adapter_posts_json_rpc() {
    let seen = Arc::new(Mutex::new(Vec::<Value>::new()));
    let (url, _join) = spawn_mock_rpc(1, Arc::clone(&seen), |method, _| match method {
        "eth_blockNumber" => rpc_result(json!("0x10d4f")),
        _ => (404, json!({ "error": "unexpected" })),
    });

    let response = rpc_adapter()
        .call(&url, &request("eth_blockNumber", json!([])).with_id(1))
        .await
        .expect("call");
    assert_eq!(response.id, json!(1));
    assert_eq!(response.result, Some(json!("0x10d4f")));

    let seen = seen.lock().expect("seen lock");
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0]["jsonrpc"], json!("2.0"));
    assert_eq!(seen[0]["method"], json!("eth_blockNumber"));
}

#[tokio::test]
async fn provider_forwards_with_the_callers_id() {
    let seen = Arc::new(Mutex::new(Vec::<Value>::new()));
    let (url, _join) = spawn_mock_rpc(1, Arc::clone(&seen), |method, params| {
        assert_eq!(method, "eth_getBalance");
        assert_eq!(params[1], json!("latest"));
        rpc_result(json!("0xde0b6b3a7640000"))
    });
    let (host, _inbox) = ChannelHost::new();
    let provider = Provider::new(ProviderConfig::new(TEST_ADDRESS, 1, url), host, rpc_adapter())
        .expect("provider");

    let balance = provider
        .request(request("eth_getBalance", json!([TEST_ADDRESS, "latest"])).with_id("abc"))
        .await
        .expect("balance");
    assert_eq!(balance, json!("0xde0b6b3a7640000"));
    assert_eq!(seen.lock().expect("seen lock")[0]["id"], json!("abc"));
}

#[tokio::test]
async fn node_error_objects_become_rpc_errors() {
    let seen = Arc::new(Mutex::new(Vec::<Value>::new()));
    let (url, _join) = spawn_mock_rpc(2, seen, |_, _| {
        (
            200,
            json!({
                "jsonrpc": "2.0",
                "error": { "code": -32000, "message": "execution reverted", "data": "0x08c379a0" }
            }),
        )
    });
    let (host, _inbox) = ChannelHost::new();
    let provider = Provider::new(ProviderConfig::new(TEST_ADDRESS, 1, url), host, rpc_adapter())
        .expect("provider");

    let err = provider
        .request(request("eth_call", json!([{ "to": TEST_ADDRESS }, "latest"])))
        .await
        .expect_err("reverted");
    assert_eq!(
        err,
        ProviderError::Rpc {
            code: -32000,
            message: "execution reverted".to_owned(),
            data: Some(json!("0x08c379a0")),
        }
    );
    assert_eq!(err.code(), -32000);
}

#[tokio::test]
async fn http_status_failures_are_network_errors() {
    let seen = Arc::new(Mutex::new(Vec::<Value>::new()));
    let (url, _join) = spawn_mock_rpc(1, seen, |_, _| (503, json!({ "status": "unavailable" })));
    let err = rpc_adapter()
        .call(&url, &request("eth_chainId", json!([])).with_id(2))
        .await
        .expect_err("503");
    assert!(matches!(err, ProviderError::Network(_)));
    assert!(err.to_string().contains("503"));
}

#[tokio::test]
async fn unreachable_node_is_a_network_error() {
    let err = rpc_adapter()
        .call("http://127.0.0.1:1", &request("eth_chainId", json!([])).with_id(3))
        .await
        .expect_err("refused");
    assert!(matches!(err, ProviderError::Network(_)));
    assert_eq!(err.code(), -32603);
}
