use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;

use inpage_bridge_core::{parse_chain_id, ProviderConfig, ProviderOptions};

use crate::hashing::TypedDataHashAdapter;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{key} is not a valid chain id: {value}")]
    ChainId { key: &'static str, value: String },
    #[error("{key} must be an integer: {value}")]
    Integer { key: &'static str, value: String },
    #[error("{key} must be a boolean: {value}")]
    Boolean { key: &'static str, value: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BridgeAdapterConfig {
    pub address: String,
    pub chain_id: u64,
    pub rpc_url: String,
    pub is_debug: bool,
    pub rpc_timeout_ms: u64,
    /// `None` waits on the host indefinitely.
    pub host_timeout_ms: Option<u64>,
    pub signer_key: Option<String>,
}

impl Default for BridgeAdapterConfig {
    fn default() -> Self {
        Self {
            address: String::new(),
            chain_id: 1,
            rpc_url: String::new(),
            is_debug: false,
            rpc_timeout_ms: 15_000,
            host_timeout_ms: None,
            signer_key: None,
        }
    }
}

impl BridgeAdapterConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from `INPAGE_BRIDGE_*` keys; absent or empty keys
    /// keep their defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let mut cfg = Self::default();

        if let Some(v) = get("INPAGE_BRIDGE_ADDRESS") {
            cfg.address = v.trim().to_owned();
        }
        if let Some(v) = get("INPAGE_BRIDGE_CHAIN_ID") {
            cfg.chain_id = parse_chain_id(&v).map_err(|_| ConfigError::ChainId {
                key: "INPAGE_BRIDGE_CHAIN_ID",
                value: v.clone(),
            })?;
        }
        if let Some(v) = get("INPAGE_BRIDGE_RPC_URL") {
            cfg.rpc_url = v.trim().to_owned();
        }
        if let Some(v) = get("INPAGE_BRIDGE_DEBUG") {
            cfg.is_debug = match v.trim().to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" | "on" => true,
                "0" | "false" | "no" | "off" => false,
                _ => {
                    return Err(ConfigError::Boolean {
                        key: "INPAGE_BRIDGE_DEBUG",
                        value: v,
                    })
                }
            };
        }
        if let Some(v) = get("INPAGE_BRIDGE_RPC_TIMEOUT_MS") {
            cfg.rpc_timeout_ms = parse_ms("INPAGE_BRIDGE_RPC_TIMEOUT_MS", &v)?;
        }
        if let Some(v) = get("INPAGE_BRIDGE_HOST_TIMEOUT_MS") {
            cfg.host_timeout_ms = Some(parse_ms("INPAGE_BRIDGE_HOST_TIMEOUT_MS", &v)?);
        }
        cfg.signer_key = get("INPAGE_BRIDGE_SIGNER_KEY").map(|v| v.trim().to_owned());
        Ok(cfg)
    }

    pub fn provider_config(&self) -> ProviderConfig {
        ProviderConfig {
            address: self.address.clone(),
            chain_id: self.chain_id,
            rpc_url: self.rpc_url.clone(),
            is_debug: self.is_debug,
        }
    }

    pub fn provider_options(&self) -> ProviderOptions {
        ProviderOptions {
            host_timeout: self.host_timeout_ms.map(Duration::from_millis),
            typed_data_hasher: Some(Arc::new(TypedDataHashAdapter)),
        }
    }

    pub fn rpc_timeout(&self) -> Duration {
        Duration::from_millis(self.rpc_timeout_ms)
    }
}

fn parse_ms(key: &'static str, value: &str) -> Result<u64, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::Integer {
        key,
        value: value.to_owned(),
    })
}
