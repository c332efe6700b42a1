use std::sync::Arc;

use tokio::sync::mpsc;

use inpage_bridge_core::{HostPort, OutboundEnvelope, ProviderError};

/// Host port that hands envelopes to an async consumer.
#[derive(Debug, Clone)]
pub struct ChannelHost {
    tx: mpsc::UnboundedSender<OutboundEnvelope>,
}

impl ChannelHost {
    pub fn new() -> (Arc<Self>, mpsc::UnboundedReceiver<OutboundEnvelope>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Arc::new(Self { tx }), rx)
    }
}

impl HostPort for ChannelHost {
    fn post_message(&self, envelope: &OutboundEnvelope) -> Result<(), ProviderError> {
        self.tx.send(envelope.clone()).map_err(|_| {
            ProviderError::Transport(format!("host channel closed; dropped envelope {}", envelope.id))
        })
    }
}
