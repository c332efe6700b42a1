use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use crate::config_store::ConfigStore;
use crate::domain::{HostPush, OutboundEnvelope, ProviderConfig, ProviderEvent};
use crate::events::EventBus;
use crate::ports::{HostPort, ProviderError};
use crate::registry::RequestRegistry;

/// Boundary between the provider and the host application.
pub struct HostChannel {
    host: Arc<dyn HostPort>,
    registry: Arc<RequestRegistry>,
    config: Arc<ConfigStore>,
    events: Arc<EventBus>,
}

impl fmt::Debug for HostChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HostChannel")
            .field("pending", &self.registry.pending_count())
            .finish_non_exhaustive()
    }
}

impl HostChannel {
    pub fn new(
        host: Arc<dyn HostPort>,
        registry: Arc<RequestRegistry>,
        config: Arc<ConfigStore>,
        events: Arc<EventBus>,
    ) -> Self {
        Self {
            host,
            registry,
            config,
            events,
        }
    }

    /// Posts an envelope whose id is already registered. `via` routes it
    /// through an installed override instead of the default host path.
    pub fn post_to_host(
        &self,
        envelope: &OutboundEnvelope,
        via: Option<Arc<dyn HostPort>>,
    ) -> Result<(), ProviderError> {
        self.registry.mark_posted(envelope.id)?;

        let is_debug = self.config.snapshot().map(|c| c.is_debug).unwrap_or(false);
        if is_debug {
            tracing::info!(
                id = envelope.id,
                name = %envelope.name,
                object = %envelope.object,
                overridden = via.is_some(),
                "posting envelope to host"
            );
        } else {
            tracing::debug!(
                id = envelope.id,
                name = %envelope.name,
                overridden = via.is_some(),
                "posting envelope to host"
            );
        }

        let port = via.unwrap_or_else(|| Arc::clone(&self.host));
        if let Err(e) = port.post_message(envelope) {
            tracing::warn!(id = envelope.id, name = %envelope.name, error = %e, "host post failed");
            self.registry.abandon(envelope.id, e.clone());
            return Err(e);
        }
        Ok(())
    }

    /// Host completion entry point. Returns whether a pending call matched.
    pub fn receive_response(&self, id: u64, value: Value, is_error: bool) -> bool {
        let outcome = if is_error {
            Err(ProviderError::HostRejection(value))
        } else {
            Ok(value)
        };
        self.registry.settle(id, outcome)
    }

    /// Applies an unsolicited host push and emits the events it produced.
    pub fn receive_config_change(&self, push: HostPush) -> Result<Vec<ProviderEvent>, ProviderError> {
        tracing::debug!(?push, "host configuration push");
        let events = match push {
            HostPush::Address { address } => self.config.set_address(&address)?,
            HostPush::ChainId { chain_id, rpc_url } => {
                self.config.set_chain_id(chain_id, rpc_url.as_deref())?
            }
            HostPush::RpcUrl { rpc_url } => self.config.set_rpc_url(&rpc_url)?,
            HostPush::Config { config } => self.config.set_config(&config)?,
        };
        self.events.emit_all(&events);
        Ok(events)
    }

    pub fn set_config(&self, config: &ProviderConfig) -> Result<Vec<ProviderEvent>, ProviderError> {
        self.receive_config_change(HostPush::Config {
            config: config.clone(),
        })
    }
}
