//! `statecast-core`: the realtime delivery engine.
//!
//! Provides:
//! - `ClientRegistry` of live streams keyed by client id
//! - `Broker` fanning `ChannelMessage`s out to every subscribed stream
//! - `Dispatcher` routing actions to guarded, long-lived handlers
//! - `ConnectionServer`, the per-stream loop, and `LifecycleNotifier` for teardown

pub mod broker;
pub mod connection;
pub mod dispatcher;
pub mod error;
pub mod hub;
pub mod lifecycle;
pub mod message;
pub mod registry;
pub mod traits;
pub mod transport;

pub use broker::{Broker, Subscription};
pub use connection::{validate_client_id, ConnectionServer, ConnectionState};
pub use dispatcher::{ActionRegistration, Dispatcher, StoreDescriptor};
pub use error::{DeliveryError, DispatchError, GuardError, ValidationError};
pub use hub::Hub;
pub use lifecycle::LifecycleNotifier;
pub use message::{
    action_type_for, update_type_for, ActionResponse, ChannelMessage, ClientFilter, Message,
    CONNECTED_TYPE,
};
pub use registry::{ClientConnection, ClientRegistry, Removal};
pub use traits::{ActionContext, ActionHandler, AuthorizationGuard, TeardownHook};
pub use transport::{ChannelTransport, Transport};
