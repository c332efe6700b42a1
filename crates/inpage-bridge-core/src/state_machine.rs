use crate::ports::ProviderError;

/// Lifecycle of a privileged call that requires a host round-trip.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestState {
    Created,
    AwaitingHost,
    Fulfilled,
    Rejected,
}

impl RequestState {
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Fulfilled | Self::Rejected)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestAction {
    Post,
    Resolve,
    Reject,
    /// Posting failed or the optional host timeout elapsed.
    Abandon,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateTransition {
    pub from: RequestState,
    pub to: RequestState,
    pub reason: &'static str,
}

pub fn request_transition(
    from: RequestState,
    action: RequestAction,
) -> Result<(RequestState, StateTransition), ProviderError> {
    let (to, reason) = match (from, action) {
        (RequestState::Created, RequestAction::Post) => {
            (RequestState::AwaitingHost, "envelope posted to host")
        }
        (RequestState::AwaitingHost, RequestAction::Resolve) => {
            (RequestState::Fulfilled, "host resolved request")
        }
        (RequestState::AwaitingHost, RequestAction::Reject) => {
            (RequestState::Rejected, "host rejected request")
        }
        (RequestState::Created | RequestState::AwaitingHost, RequestAction::Abandon) => {
            (RequestState::Rejected, "request abandoned before host response")
        }
        (from, action) => {
            return Err(ProviderError::Transport(format!(
                "illegal request transition: {from:?} --{action:?}-->"
            )))
        }
    };
    Ok((to, StateTransition { from, to, reason }))
}
