use std::sync::Mutex;

use alloy::primitives::Address;

use crate::domain::{format_chain_id, NetworkContext, ProviderConfig, ProviderEvent};
use crate::ports::ProviderError;

/// Point-in-time copy of the live configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigSnapshot {
    pub address: String,
    pub chain_id: u64,
    pub chain_id_hex: String,
    pub rpc_url: String,
    pub is_debug: bool,
    pub ready: bool,
}

impl ConfigSnapshot {
    fn from_config(config: &ProviderConfig, address: String) -> Self {
        let ready = !address.is_empty();
        Self {
            address,
            chain_id: config.chain_id,
            chain_id_hex: format_chain_id(config.chain_id),
            rpc_url: config.rpc_url.clone(),
            is_debug: config.is_debug,
            ready,
        }
    }

    /// Accounts visible to page scripts; empty until an account is set.
    pub fn accounts(&self) -> Vec<String> {
        if self.ready {
            vec![self.address.clone()]
        } else {
            Vec::new()
        }
    }

    pub fn network(&self) -> NetworkContext {
        NetworkContext {
            chain_id: self.chain_id_hex.clone(),
            rpc_url: self.rpc_url.clone(),
        }
    }
}

/// Holds the single live configuration of a provider. Mutators return the
/// events their change implies; callers emit them once the store is unlocked.
#[derive(Debug)]
pub struct ConfigStore {
    state: Mutex<ConfigSnapshot>,
}

impl ConfigStore {
    pub fn new(config: &ProviderConfig) -> Result<Self, ProviderError> {
        let address = normalize_address(&config.address)?;
        Ok(Self {
            state: Mutex::new(ConfigSnapshot::from_config(config, address)),
        })
    }

    pub fn snapshot(&self) -> Result<ConfigSnapshot, ProviderError> {
        self.state
            .lock()
            .map(|g| g.clone())
            .map_err(|e| ProviderError::Transport(format!("config lock poisoned: {e}")))
    }

    pub fn set_config(&self, config: &ProviderConfig) -> Result<Vec<ProviderEvent>, ProviderError> {
        let address = normalize_address(&config.address)?;
        let mut g = self.lock()?;
        let before = g.clone();
        *g = ConfigSnapshot::from_config(config, address);
        let mut events = Vec::new();
        if before.address != g.address {
            events.push(ProviderEvent::accounts_changed(&g.address));
        }
        if before.chain_id != g.chain_id {
            events.push(ProviderEvent::chain_changed(&g.chain_id_hex));
        }
        push_lifecycle(&before, &g, &mut events);
        Ok(events)
    }

    /// Always reports `accountsChanged`, even when the address is unchanged.
    pub fn set_address(&self, address: &str) -> Result<Vec<ProviderEvent>, ProviderError> {
        let address = normalize_address(address)?;
        let mut g = self.lock()?;
        let before = g.clone();
        g.ready = !address.is_empty();
        g.address = address;
        let mut events = vec![ProviderEvent::accounts_changed(&g.address)];
        push_lifecycle(&before, &g, &mut events);
        Ok(events)
    }

    pub fn set_rpc_url(&self, rpc_url: &str) -> Result<Vec<ProviderEvent>, ProviderError> {
        let mut g = self.lock()?;
        g.rpc_url = rpc_url.to_owned();
        Ok(Vec::new())
    }

    /// Updates the chain and, when given, the rpc url in one step. A new rpc
    /// url never produces an event of its own.
    pub fn set_chain_id(
        &self,
        chain_id: u64,
        rpc_url: Option<&str>,
    ) -> Result<Vec<ProviderEvent>, ProviderError> {
        let mut g = self.lock()?;
        let changed = g.chain_id != chain_id;
        g.chain_id = chain_id;
        g.chain_id_hex = format_chain_id(chain_id);
        if let Some(url) = rpc_url {
            g.rpc_url = url.to_owned();
        }
        if changed {
            Ok(vec![ProviderEvent::chain_changed(&g.chain_id_hex)])
        } else {
            Ok(Vec::new())
        }
    }

    pub fn set_debug(&self, is_debug: bool) -> Result<(), ProviderError> {
        self.lock()?.is_debug = is_debug;
        Ok(())
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, ConfigSnapshot>, ProviderError> {
        self.state
            .lock()
            .map_err(|e| ProviderError::Transport(format!("config lock poisoned: {e}")))
    }
}

fn push_lifecycle(before: &ConfigSnapshot, after: &ConfigSnapshot, events: &mut Vec<ProviderEvent>) {
    match (before.ready, after.ready) {
        (false, true) => events.push(ProviderEvent::connect(&after.chain_id_hex)),
        (true, false) => events.push(ProviderEvent::disconnect()),
        _ => {}
    }
}

/// Lowercases a non-empty account after checking it is a 20-byte hex address.
pub fn normalize_address(raw: &str) -> Result<String, ProviderError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(String::new());
    }
    if !raw.starts_with("0x") && !raw.starts_with("0X") {
        return Err(ProviderError::MalformedParameter(format!(
            "account address must be 0x-prefixed: {raw}"
        )));
    }
    raw.parse::<Address>()
        .map_err(|e| ProviderError::MalformedParameter(format!("invalid account address {raw}: {e}")))?;
    Ok(raw.to_ascii_lowercase())
}
