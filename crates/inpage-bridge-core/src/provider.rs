use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tokio::task::JoinHandle;

use crate::config_store::{ConfigSnapshot, ConfigStore};
use crate::dispatcher::MethodDispatcher;
use crate::domain::{
    HostPush, JsonRpcRequest, JsonRpcResponse, ProviderConfig, ProviderEvent, ProviderEventKind,
};
use crate::events::EventBus;
use crate::host_channel::HostChannel;
use crate::legacy::LegacyAdapter;
use crate::overrides::{OverrideRegistry, SubOperation};
use crate::ports::{HostPort, ProviderError, RpcPort, TypedDataHasher};
use crate::registry::RequestRegistry;

#[derive(Clone, Default)]
pub struct ProviderOptions {
    /// `None` keeps a privileged call waiting for as long as the host takes.
    pub host_timeout: Option<Duration>,
    pub typed_data_hasher: Option<Arc<dyn TypedDataHasher>>,
}

impl fmt::Debug for ProviderOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderOptions")
            .field("host_timeout", &self.host_timeout)
            .field("typed_data_hasher", &self.typed_data_hasher.is_some())
            .finish()
    }
}

/// The wallet provider object exposed to page scripts. Cloning shares the
/// same instance.
pub struct Provider<R> {
    inner: Arc<ProviderInner<R>>,
}

struct ProviderInner<R> {
    config: Arc<ConfigStore>,
    events: Arc<EventBus>,
    registry: Arc<RequestRegistry>,
    channel: Arc<HostChannel>,
    overrides: Arc<OverrideRegistry>,
    dispatcher: Arc<MethodDispatcher<R>>,
    legacy: LegacyAdapter<R>,
}

impl<R> Clone for Provider<R> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<R> fmt::Debug for Provider<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Provider")
            .field("config", &self.inner.config)
            .field("pending", &self.inner.registry.pending_count())
            .field("overrides", &self.inner.overrides)
            .finish_non_exhaustive()
    }
}

impl<R> Provider<R>
where
    R: RpcPort + 'static,
{
    pub fn new(config: ProviderConfig, host: Arc<dyn HostPort>, rpc: R) -> Result<Self, ProviderError> {
        Self::with_options(config, host, rpc, ProviderOptions::default())
    }

    pub fn with_options(
        config: ProviderConfig,
        host: Arc<dyn HostPort>,
        rpc: R,
        options: ProviderOptions,
    ) -> Result<Self, ProviderError> {
        let config = Arc::new(ConfigStore::new(&config)?);
        let events = Arc::new(EventBus::default());
        let registry = Arc::new(RequestRegistry::default());
        let overrides = Arc::new(OverrideRegistry::default());
        let channel = Arc::new(HostChannel::new(
            host,
            Arc::clone(&registry),
            Arc::clone(&config),
            Arc::clone(&events),
        ));
        let dispatcher = Arc::new(MethodDispatcher::new(
            Arc::clone(&config),
            Arc::clone(&registry),
            Arc::clone(&channel),
            Arc::clone(&overrides),
            rpc,
            options,
        ));
        let legacy = LegacyAdapter::new(Arc::clone(&dispatcher));
        Ok(Self {
            inner: Arc::new(ProviderInner {
                config,
                events,
                registry,
                channel,
                overrides,
                dispatcher,
                legacy,
            }),
        })
    }

    pub async fn request(&self, request: JsonRpcRequest) -> Result<Value, ProviderError> {
        self.inner.dispatcher.request(&request).await
    }

    /// Legacy `enable()`: asks the host for account access.
    pub async fn enable(&self) -> Result<Value, ProviderError> {
        self.request(JsonRpcRequest::new("eth_requestAccounts", Value::Array(Vec::new())))
            .await
    }

    pub fn legacy(&self) -> &LegacyAdapter<R> {
        &self.inner.legacy
    }

    pub async fn send_method(&self, method: &str) -> Result<Value, ProviderError> {
        self.inner.legacy.send_method(method).await
    }

    pub fn send(&self, request: &JsonRpcRequest) -> JsonRpcResponse {
        self.inner.legacy.send(request)
    }

    pub fn send_async<F>(&self, request: JsonRpcRequest, callback: F) -> JoinHandle<()>
    where
        F: FnOnce(Result<JsonRpcResponse, ProviderError>) + Send + 'static,
    {
        self.inner.legacy.send_async(request, callback)
    }
}

impl<R> Provider<R> {
    pub fn on<F>(&self, kind: ProviderEventKind, handler: F)
    where
        F: Fn(&Value) + Send + Sync + 'static,
    {
        self.inner.events.on(kind, handler);
    }

    /// Subscribes by event name, e.g. `"accountsChanged"`.
    pub fn on_named<F>(&self, name: &str, handler: F) -> Result<(), ProviderError>
    where
        F: Fn(&Value) + Send + Sync + 'static,
    {
        self.on(name.parse()?, handler);
        Ok(())
    }

    pub fn set_config(&self, config: &ProviderConfig) -> Result<Vec<ProviderEvent>, ProviderError> {
        self.inner.channel.set_config(config)
    }

    pub fn set_address(&self, address: &str) -> Result<Vec<ProviderEvent>, ProviderError> {
        self.receive_config_change(HostPush::Address {
            address: address.to_owned(),
        })
    }

    pub fn change_address(&self, address: &str) -> Result<Vec<ProviderEvent>, ProviderError> {
        self.set_address(address)
    }

    pub fn change_chain_id(
        &self,
        chain_id: u64,
        rpc_url: Option<&str>,
    ) -> Result<Vec<ProviderEvent>, ProviderError> {
        self.receive_config_change(HostPush::ChainId {
            chain_id,
            rpc_url: rpc_url.map(str::to_owned),
        })
    }

    pub fn change_rpc_url(&self, rpc_url: &str) -> Result<Vec<ProviderEvent>, ProviderError> {
        self.receive_config_change(HostPush::RpcUrl {
            rpc_url: rpc_url.to_owned(),
        })
    }

    pub fn receive_config_change(&self, push: HostPush) -> Result<Vec<ProviderEvent>, ProviderError> {
        self.inner.channel.receive_config_change(push)
    }

    /// Host completion entry point (`sendResponse`). Unknown ids are dropped.
    pub fn receive_response(&self, id: u64, value: Value, is_error: bool) -> bool {
        self.inner.channel.receive_response(id, value, is_error)
    }

    pub fn send_response(&self, id: u64, result: Value) -> bool {
        self.receive_response(id, result, false)
    }

    pub fn send_error(&self, id: u64, error: Value) -> bool {
        self.receive_response(id, error, true)
    }

    pub fn install_override(
        &self,
        operation: SubOperation,
        port: Arc<dyn HostPort>,
    ) -> Result<(), ProviderError> {
        self.inner.overrides.install(operation, port)
    }

    pub fn remove_override(&self, operation: SubOperation) -> Result<bool, ProviderError> {
        self.inner.overrides.remove(operation)
    }

    pub fn config(&self) -> Result<ConfigSnapshot, ProviderError> {
        self.inner.config.snapshot()
    }

    pub fn address(&self) -> String {
        self.config().map(|c| c.address).unwrap_or_default()
    }

    /// Active chain as `0x` hex.
    pub fn chain_id(&self) -> String {
        self.config().map(|c| c.chain_id_hex).unwrap_or_default()
    }

    pub fn net_version(&self) -> String {
        self.chain_id()
    }

    pub fn rpc_url(&self) -> String {
        self.config().map(|c| c.rpc_url).unwrap_or_default()
    }

    pub fn ready(&self) -> bool {
        self.config().map(|c| c.ready).unwrap_or(false)
    }

    pub fn is_debug(&self) -> bool {
        self.config().map(|c| c.is_debug).unwrap_or(false)
    }

    pub fn set_debug(&self, is_debug: bool) -> Result<(), ProviderError> {
        self.inner.config.set_debug(is_debug)
    }

    pub fn pending_requests(&self) -> usize {
        self.inner.registry.pending_count()
    }
}
