//! `send` / `sendAsync` compatibility surface over the promise-style
//! `request` entry point.

use std::sync::Arc;

use serde_json::Value;
use tokio::task::JoinHandle;

use crate::dispatcher::MethodDispatcher;
use crate::domain::{JsonRpcRequest, JsonRpcResponse};
use crate::ports::{ProviderError, RpcPort};

pub struct LegacyAdapter<R> {
    dispatcher: Arc<MethodDispatcher<R>>,
}

impl<R> Clone for LegacyAdapter<R> {
    fn clone(&self) -> Self {
        Self {
            dispatcher: Arc::clone(&self.dispatcher),
        }
    }
}

impl<R> LegacyAdapter<R>
where
    R: RpcPort + 'static,
{
    pub fn new(dispatcher: Arc<MethodDispatcher<R>>) -> Self {
        Self { dispatcher }
    }

    /// `send("eth_chainId")`: resolves to the bare result.
    pub async fn send_method(&self, method: &str) -> Result<Value, ProviderError> {
        self.dispatcher
            .request(&JsonRpcRequest::new(method, Value::Null))
            .await
    }

    /// `send(payload)` without a callback. Only configuration-backed methods
    /// can be answered synchronously; everything else comes back as an error
    /// response instead of blocking.
    pub fn send(&self, request: &JsonRpcRequest) -> JsonRpcResponse {
        let id = request.id.clone().unwrap_or(Value::Null);
        match self.dispatcher.answer_local(request) {
            Some(Ok(result)) => JsonRpcResponse::success(id, result),
            Some(Err(e)) => JsonRpcResponse::failure(id, &e),
            None => {
                tracing::debug!(method = %request.method, "synchronous send needs the async path");
                JsonRpcResponse::failure(
                    id,
                    &ProviderError::UnsupportedMethod(format!(
                        "{} cannot be answered synchronously; use send_async",
                        request.method
                    )),
                )
            }
        }
    }

    /// `send(payload, callback)`; identical to [`Self::send_async`].
    pub fn send_with_callback<F>(&self, request: JsonRpcRequest, callback: F) -> JoinHandle<()>
    where
        F: FnOnce(Result<JsonRpcResponse, ProviderError>) + Send + 'static,
    {
        self.send_async(request, callback)
    }

    /// Runs the call on the tokio runtime and invokes `callback` exactly once
    /// with the JSON-RPC envelope or the error.
    pub fn send_async<F>(&self, request: JsonRpcRequest, callback: F) -> JoinHandle<()>
    where
        F: FnOnce(Result<JsonRpcResponse, ProviderError>) + Send + 'static,
    {
        let this = self.clone();
        tokio::spawn(async move {
            let outcome = this.respond(&request).await;
            callback(outcome);
        })
    }

    /// Envelope-shaped result of a call: `{id, jsonrpc, result}`.
    pub async fn respond(&self, request: &JsonRpcRequest) -> Result<JsonRpcResponse, ProviderError> {
        let result = self.dispatcher.request(request).await?;
        Ok(JsonRpcResponse::success(
            request.id.clone().unwrap_or(Value::Null),
            result,
        ))
    }
}
