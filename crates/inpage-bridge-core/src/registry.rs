use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use serde_json::Value;
use tokio::sync::oneshot;

use crate::ports::ProviderError;
use crate::state_machine::{request_transition, RequestAction, RequestState};

type Completion = oneshot::Sender<Result<Value, ProviderError>>;

#[derive(Debug)]
struct PendingRequest {
    method: String,
    state: RequestState,
    completion: Completion,
}

/// Correlates host responses with the calls that are waiting for them.
#[derive(Debug)]
pub struct RequestRegistry {
    next_id: AtomicU64,
    pending: Mutex<HashMap<u64, PendingRequest>>,
}

impl Default for RequestRegistry {
    fn default() -> Self {
        Self {
            next_id: AtomicU64::new(1),
            pending: Mutex::new(HashMap::new()),
        }
    }
}

/// Receiving half of a registered request.
#[derive(Debug)]
pub struct PendingHandle {
    id: u64,
    receiver: oneshot::Receiver<Result<Value, ProviderError>>,
}

impl PendingHandle {
    pub fn id(&self) -> u64 {
        self.id
    }

    pub async fn wait(self) -> Result<Value, ProviderError> {
        let id = self.id;
        self.receiver
            .await
            .map_err(|_| ProviderError::Transport(format!("pending request {id} dropped")))?
    }
}

impl RequestRegistry {
    /// Ids increase strictly for the lifetime of the registry.
    pub fn next_id(&self) -> u64 {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }

    pub fn register(&self, id: u64, method: &str) -> Result<PendingHandle, ProviderError> {
        let mut g = self
            .pending
            .lock()
            .map_err(|e| ProviderError::Transport(format!("registry lock poisoned: {e}")))?;
        if g.contains_key(&id) {
            return Err(ProviderError::DuplicateId(id));
        }
        let (completion, receiver) = oneshot::channel();
        g.insert(
            id,
            PendingRequest {
                method: method.to_owned(),
                state: RequestState::Created,
                completion,
            },
        );
        tracing::trace!(id, method, "pending request registered");
        Ok(PendingHandle { id, receiver })
    }

    /// Marks a registered request as handed to the host. Must run before the
    /// envelope is posted so a synchronous host response finds it waiting.
    pub fn mark_posted(&self, id: u64) -> Result<(), ProviderError> {
        let mut g = self
            .pending
            .lock()
            .map_err(|e| ProviderError::Transport(format!("registry lock poisoned: {e}")))?;
        let entry = g
            .get_mut(&id)
            .ok_or_else(|| ProviderError::Transport(format!("request {id} is not pending")))?;
        let (next, _) = request_transition(entry.state, RequestAction::Post)?;
        entry.state = next;
        Ok(())
    }

    /// Completes the request with `id`. Unknown or already settled ids are
    /// dropped and reported as `false`.
    pub fn settle(&self, id: u64, outcome: Result<Value, ProviderError>) -> bool {
        let action = if outcome.is_ok() {
            RequestAction::Resolve
        } else {
            RequestAction::Reject
        };
        self.finish(id, action, outcome)
    }

    /// Removes a request that will never see a host response and fails it
    /// with `error`.
    pub fn abandon(&self, id: u64, error: ProviderError) -> bool {
        self.finish(id, RequestAction::Abandon, Err(error))
    }

    fn finish(
        &self,
        id: u64,
        action: RequestAction,
        outcome: Result<Value, ProviderError>,
    ) -> bool {
        let entry = {
            let mut g = match self.pending.lock() {
                Ok(g) => g,
                Err(e) => {
                    tracing::error!(id, error = %e, "registry lock poisoned");
                    return false;
                }
            };
            let Some(entry) = g.get(&id) else {
                tracing::debug!(id, "dropping response for unknown request id");
                return false;
            };
            if let Err(e) = request_transition(entry.state, action) {
                tracing::warn!(id, method = %entry.method, error = %e, "ignoring settlement");
                return false;
            }
            g.remove(&id)
        };
        let Some(entry) = entry else {
            return false;
        };
        tracing::debug!(id, method = %entry.method, ?action, "pending request settled");
        if entry.completion.send(outcome).is_err() {
            tracing::debug!(id, "caller stopped waiting before settlement");
        }
        true
    }

    pub fn pending_count(&self) -> usize {
        self.pending.lock().map(|g| g.len()).unwrap_or(0)
    }

    pub fn is_pending(&self, id: u64) -> bool {
        self.pending
            .lock()
            .map(|g| g.contains_key(&id))
            .unwrap_or(false)
    }
}
