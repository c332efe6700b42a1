use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::{Arc, RwLock};

use crate::domain::HostMethod;
use crate::ports::{HostPort, ProviderError};

/// Internal sub-operations a host may intercept at a finer grain than the
/// public method name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SubOperation {
    /// Sign keccak256 of a pre-image computed by the bridge.
    SignMessageHash,
    /// Confirm an address the bridge recovered from a personal signature.
    PersonalEcRecover,
}

impl SubOperation {
    pub const fn key(&self) -> &'static str {
        match self {
            Self::SignMessageHash => "signMessageHash",
            Self::PersonalEcRecover => "personalEcRecover",
        }
    }

    pub const fn host_method(&self) -> HostMethod {
        match self {
            Self::SignMessageHash => HostMethod::SignMessageHash,
            Self::PersonalEcRecover => HostMethod::PersonalEcRecover,
        }
    }
}

impl FromStr for SubOperation {
    type Err = ProviderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "signMessageHash" => Ok(Self::SignMessageHash),
            "personalEcRecover" => Ok(Self::PersonalEcRecover),
            other => Err(ProviderError::UnsupportedMethod(format!(
                "unknown override key: {other}"
            ))),
        }
    }
}

#[derive(Default)]
pub struct OverrideRegistry {
    entries: RwLock<HashMap<SubOperation, Arc<dyn HostPort>>>,
}

impl fmt::Debug for OverrideRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let keys = self
            .entries
            .read()
            .map(|g| g.keys().map(SubOperation::key).collect::<Vec<_>>())
            .unwrap_or_default();
        f.debug_struct("OverrideRegistry").field("installed", &keys).finish()
    }
}

impl OverrideRegistry {
    /// Replaces any override already installed for `operation`.
    pub fn install(&self, operation: SubOperation, port: Arc<dyn HostPort>) -> Result<(), ProviderError> {
        let mut g = self
            .entries
            .write()
            .map_err(|e| ProviderError::Transport(format!("override lock poisoned: {e}")))?;
        g.insert(operation, port);
        tracing::debug!(operation = operation.key(), "host override installed");
        Ok(())
    }

    pub fn remove(&self, operation: SubOperation) -> Result<bool, ProviderError> {
        let mut g = self
            .entries
            .write()
            .map_err(|e| ProviderError::Transport(format!("override lock poisoned: {e}")))?;
        Ok(g.remove(&operation).is_some())
    }

    pub fn get(&self, operation: SubOperation) -> Option<Arc<dyn HostPort>> {
        self.entries
            .read()
            .ok()
            .and_then(|g| g.get(&operation).cloned())
    }
}
