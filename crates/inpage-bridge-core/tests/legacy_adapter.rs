mod common;

use common::{bsc_config, new_provider, request, RecordingHost, StaticRpc, TEST_ADDRESS};
use inpage_bridge_core::{HostMethod, JsonRpcResponse, Provider, ProviderError};
use serde_json::{json, Value};
use tokio::sync::oneshot;

#[tokio::test]
async fn send_method_resolves_to_the_bare_result() {
    let (provider, _host, _rx) = new_provider(bsc_config());
    let chain = provider.send_method("eth_chainId").await.expect("chain");
    assert_eq!(chain, json!("0x38"));
    let accounts = provider.send_method("eth_accounts").await.expect("accounts");
    assert_eq!(accounts, json!([TEST_ADDRESS]));
}

#[tokio::test]
async fn synchronous_send_answers_local_methods() {
    let (provider, _host, _rx) = new_provider(bsc_config());
    let response = provider.send(&request("eth_chainId", json!([])).with_id(7));
    assert_eq!(response, JsonRpcResponse::success(json!(7), json!("0x38")));

    let response = provider.send(&request("net_version", json!([])).with_id("abc"));
    assert_eq!(response.id, json!("abc"));
    assert_eq!(response.result, Some(json!("0x38")));
}

#[tokio::test]
async fn synchronous_send_refuses_remote_methods() {
    let (provider, host, _rx) = new_provider(bsc_config());
    let response = provider.send(&request("eth_blockNumber", json!([])).with_id(3));
    assert_eq!(response.id, json!(3));
    assert!(response.result.is_none());
    let error = response.error.expect("error object");
    assert_eq!(error.code, 4200);
    assert!(error.message.contains("send_async"));

    let response = provider.send(&request("personal_sign", json!(["hi", TEST_ADDRESS])));
    assert!(response.error.is_some());
    assert!(host.posted().is_empty());
}

#[tokio::test]
async fn send_async_delivers_the_envelope_once() {
    let (provider, _host, _rx) = new_provider(bsc_config());
    let (tx, rx) = oneshot::channel();
    provider
        .send_async(request("eth_chainId", json!([])).with_id(9), move |outcome| {
            let _ = tx.send(outcome);
        })
        .await
        .expect("join");
    let response = rx.await.expect("callback").expect("response");
    assert_eq!(response, JsonRpcResponse::success(json!(9), json!("0x38")));
}

#[tokio::test]
async fn send_async_forwards_remote_methods() {
    let (host, _rx) = RecordingHost::new();
    let rpc = StaticRpc::returning(json!("0x3b9aca00"));
    let provider = Provider::new(bsc_config(), host, rpc.clone()).expect("provider");
    let (tx, rx) = oneshot::channel();
    provider.send_async(request("eth_gasPrice", json!([])).with_id(11), move |outcome| {
        let _ = tx.send(outcome);
    });
    let response = rx.await.expect("callback").expect("response");
    assert_eq!(response.id, json!(11));
    assert_eq!(response.result, Some(json!("0x3b9aca00")));
    assert_eq!(rpc.calls().len(), 1);
}

#[tokio::test]
async fn send_with_callback_waits_for_the_host() {
    let (provider, _host, mut envelopes) = new_provider(bsc_config());
    let (tx, rx) = oneshot::channel();
    provider.legacy().send_with_callback(
        request("personal_sign", json!(["0x48656c6c6f", TEST_ADDRESS])).with_id(5),
        move |outcome| {
            let _ = tx.send(outcome);
        },
    );

    let envelope = envelopes.recv().await.expect("envelope");
    assert_eq!(envelope.name, HostMethod::SignPersonalMessage);
    provider.send_error(
        envelope.id,
        json!({ "code": 4001, "message": "User rejected the request." }),
    );

    let err = rx.await.expect("callback").expect_err("rejected");
    assert!(matches!(err, ProviderError::HostRejection(_)));
    assert_eq!(err.to_rpc_error().message, "User rejected the request.");
    assert_eq!(err.code(), 4001);
}

#[tokio::test]
async fn send_method_on_privileged_call_needs_params() {
    let (provider, _host, _rx) = new_provider(bsc_config());
    let err = provider
        .send_method("personal_sign")
        .await
        .expect_err("no params");
    assert_eq!(err.code(), -32602);
    assert_eq!(provider.send(&request("eth_coinbase", Value::Null)).result, Some(json!(TEST_ADDRESS)));
}
