#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use serde_json::{json, Value};
use tokio::sync::mpsc;

use inpage_bridge_core::{
    HostPort, JsonRpcRequest, JsonRpcResponse, OutboundEnvelope, Provider, ProviderConfig,
    ProviderError, RpcPort,
};

pub const TEST_ADDRESS: &str = "0xcaaf133b00d04b964798f6aa040b445263b458b0";
pub const OTHER_ADDRESS: &str = "0x1000000000000000000000000000000000000001";
pub const TEST_KEY: &str = "0x5e5c0a55709bfb193b97de696114ad97e9578126e47823e0edf3d5abecd74f71";

pub const MAINNET_RPC: &str = "https://mainnet.example.invalid/rpc";
pub const ROPSTEN_RPC: &str = "https://ropsten.example.invalid/rpc";
pub const BSC_RPC: &str = "https://bsc.example.invalid/rpc";

/// Host that records every envelope and forwards it to the test.
#[derive(Debug)]
pub struct RecordingHost {
    posted: Mutex<Vec<OutboundEnvelope>>,
    tx: mpsc::UnboundedSender<OutboundEnvelope>,
    fail_with: Option<ProviderError>,
}

impl RecordingHost {
    pub fn new() -> (Arc<Self>, mpsc::UnboundedReceiver<OutboundEnvelope>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            Arc::new(Self {
                posted: Mutex::new(Vec::new()),
                tx,
                fail_with: None,
            }),
            rx,
        )
    }

    pub fn failing(error: ProviderError) -> Arc<Self> {
        let (tx, _rx) = mpsc::unbounded_channel();
        Arc::new(Self {
            posted: Mutex::new(Vec::new()),
            tx,
            fail_with: Some(error),
        })
    }

    pub fn posted(&self) -> Vec<OutboundEnvelope> {
        self.posted.lock().expect("posted lock").clone()
    }
}

impl HostPort for RecordingHost {
    fn post_message(&self, envelope: &OutboundEnvelope) -> Result<(), ProviderError> {
        if let Some(e) = &self.fail_with {
            return Err(e.clone());
        }
        self.posted.lock().expect("posted lock").push(envelope.clone());
        let _ = self.tx.send(envelope.clone());
        Ok(())
    }
}

/// Remote endpoint stand-in that answers every call with the same result and
/// remembers what it was asked.
#[derive(Debug, Clone, Default)]
pub struct StaticRpc {
    pub result: Value,
    pub error: Option<ProviderError>,
    pub calls: Arc<Mutex<Vec<(String, JsonRpcRequest)>>>,
}

impl StaticRpc {
    pub fn returning(result: Value) -> Self {
        Self {
            result,
            ..Self::default()
        }
    }

    pub fn failing(error: ProviderError) -> Self {
        Self {
            error: Some(error),
            ..Self::default()
        }
    }

    pub fn calls(&self) -> Vec<(String, JsonRpcRequest)> {
        self.calls.lock().expect("calls lock").clone()
    }
}

impl RpcPort for StaticRpc {
    async fn call(
        &self,
        rpc_url: &str,
        request: &JsonRpcRequest,
    ) -> Result<JsonRpcResponse, ProviderError> {
        self.calls
            .lock()
            .expect("calls lock")
            .push((rpc_url.to_owned(), request.clone()));
        if let Some(e) = &self.error {
            return Err(e.clone());
        }
        Ok(JsonRpcResponse::success(
            request.id.clone().unwrap_or(Value::Null),
            self.result.clone(),
        ))
    }
}

pub fn mainnet_config() -> ProviderConfig {
    ProviderConfig::new(TEST_ADDRESS, 1, MAINNET_RPC)
}

pub fn ropsten_config() -> ProviderConfig {
    ProviderConfig::new(TEST_ADDRESS, 3, ROPSTEN_RPC)
}

pub fn bsc_config() -> ProviderConfig {
    ProviderConfig::new(TEST_ADDRESS, 56, BSC_RPC)
}

pub fn new_provider(
    config: ProviderConfig,
) -> (
    Provider<StaticRpc>,
    Arc<RecordingHost>,
    mpsc::UnboundedReceiver<OutboundEnvelope>,
) {
    let (host, rx) = RecordingHost::new();
    let provider = Provider::new(config, host.clone(), StaticRpc::returning(json!("0x0")))
        .expect("provider");
    (provider, host, rx)
}

pub fn request(method: &str, params: Value) -> JsonRpcRequest {
    JsonRpcRequest::new(method, params)
}
