use std::time::Duration;

use serde_json::Value;

use inpage_bridge_core::{JsonRpcRequest, JsonRpcResponse, ProviderError, RpcPort};

use crate::BridgeAdapterConfig;

/// Remote JSON-RPC transport over HTTP POST.
#[derive(Debug, Clone)]
pub struct HttpRpcAdapter {
    client: reqwest::Client,
}

impl HttpRpcAdapter {
    pub fn new(timeout: Duration) -> Result<Self, ProviderError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ProviderError::Network(format!("rpc client init failed: {e}")))?;
        Ok(Self { client })
    }

    pub fn with_config(config: &BridgeAdapterConfig) -> Result<Self, ProviderError> {
        Self::new(config.rpc_timeout())
    }
}

impl RpcPort for HttpRpcAdapter {
    async fn call(
        &self,
        rpc_url: &str,
        request: &JsonRpcRequest,
    ) -> Result<JsonRpcResponse, ProviderError> {
        let response = self
            .client
            .post(rpc_url)
            .json(request)
            .send()
            .await
            .map_err(|e| ProviderError::Network(format!("rpc request failed: {e}")))?;
        let status = response.status();
        let body: Value = response
            .json()
            .await
            .map_err(|e| ProviderError::Network(format!("rpc json decode failed: {e}")))?;

        // Nodes answer some JSON-RPC errors with a non-2xx status; keep the
        // error object when there is one.
        if !status.is_success() && body.get("error").is_none() {
            return Err(ProviderError::Network(format!(
                "rpc status {status}: {body}"
            )));
        }
        let decoded: JsonRpcResponse = serde_json::from_value(body)
            .map_err(|e| ProviderError::Network(format!("rpc response malformed: {e}")))?;
        if decoded.result.is_none() && decoded.error.is_none() {
            tracing::debug!(method = %request.method, "rpc response carried a null result");
        }
        Ok(decoded)
    }
}
