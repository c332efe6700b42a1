use std::collections::HashMap;
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, RwLock};

use serde_json::Value;

use crate::domain::{ProviderEvent, ProviderEventKind};

pub type EventHandler = Arc<dyn Fn(&Value) + Send + Sync>;

/// Publish/subscribe for provider events. Handlers run synchronously in
/// registration order; a panicking handler does not stop its siblings.
#[derive(Default)]
pub struct EventBus {
    handlers: RwLock<HashMap<ProviderEventKind, Vec<EventHandler>>>,
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let counts = self
            .handlers
            .read()
            .map(|g| g.iter().map(|(k, v)| (*k, v.len())).collect::<Vec<_>>())
            .unwrap_or_default();
        f.debug_struct("EventBus").field("handlers", &counts).finish()
    }
}

impl EventBus {
    pub fn on<F>(&self, kind: ProviderEventKind, handler: F)
    where
        F: Fn(&Value) + Send + Sync + 'static,
    {
        match self.handlers.write() {
            Ok(mut g) => g.entry(kind).or_default().push(Arc::new(handler)),
            Err(e) => tracing::error!(event = kind.as_str(), error = %e, "event bus lock poisoned"),
        }
    }

    /// Returns how many handlers ran to completion.
    pub fn emit(&self, event: &ProviderEvent) -> usize {
        // Snapshot so handlers may subscribe while being dispatched.
        let handlers = match self.handlers.read() {
            Ok(g) => g.get(&event.kind).cloned().unwrap_or_default(),
            Err(e) => {
                tracing::error!(event = event.kind.as_str(), error = %e, "event bus lock poisoned");
                return 0;
            }
        };
        tracing::debug!(
            event = event.kind.as_str(),
            handlers = handlers.len(),
            "emitting provider event"
        );

        let mut completed = 0;
        for (index, handler) in handlers.iter().enumerate() {
            match catch_unwind(AssertUnwindSafe(|| handler(&event.payload))) {
                Ok(()) => completed += 1,
                Err(_) => tracing::warn!(
                    event = event.kind.as_str(),
                    handler = index,
                    "event handler panicked"
                ),
            }
        }
        completed
    }

    pub fn emit_all(&self, events: &[ProviderEvent]) {
        for event in events {
            self.emit(event);
        }
    }

    pub fn listener_count(&self, kind: ProviderEventKind) -> usize {
        self.handlers
            .read()
            .map(|g| g.get(&kind).map_or(0, Vec::len))
            .unwrap_or(0)
    }
}
