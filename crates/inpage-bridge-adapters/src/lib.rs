pub mod channel;
pub mod config;
pub mod hashing;
pub mod rpc;
pub mod signer;

pub use channel::ChannelHost;
pub use config::{BridgeAdapterConfig, ConfigError};
pub use hashing::TypedDataHashAdapter;
pub use rpc::HttpRpcAdapter;
pub use signer::LocalSignerHost;
