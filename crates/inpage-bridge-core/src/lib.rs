pub mod config_store;
pub mod dispatcher;
pub mod domain;
pub mod events;
pub mod host_channel;
pub mod legacy;
pub mod overrides;
pub mod ports;
pub mod provider;
pub mod registry;
pub mod sign_message;
pub mod state_machine;
pub mod typed_data;

pub use config_store::{ConfigSnapshot, ConfigStore};
pub use dispatcher::{route, LocalMethod, MethodDispatcher, PreparedCall, PrivilegedMethod, Route};
pub use domain::{
    format_chain_id, parse_chain_id, HostMethod, HostPush, JsonRpcErrorObject, JsonRpcRequest,
    JsonRpcResponse, NetworkContext, OutboundEnvelope, ProviderConfig, ProviderEvent,
    ProviderEventKind,
};
pub use events::{EventBus, EventHandler};
pub use host_channel::HostChannel;
pub use legacy::LegacyAdapter;
pub use overrides::{OverrideRegistry, SubOperation};
pub use ports::{HostPort, ProviderError, RpcPort, TypedDataHasher};
pub use provider::{Provider, ProviderOptions};
pub use registry::{PendingHandle, RequestRegistry};
pub use sign_message::{MessageEncoding, RecoverRequest, SignMessageRequest, SignMethod};
pub use state_machine::{request_transition, RequestAction, RequestState, StateTransition};
pub use typed_data::{
    LegacyTypedField, TypedDataPayload, TypedDataRequest, TypedDataVersion, TypedField,
    TypedMessage,
};
