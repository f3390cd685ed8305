use std::sync::Arc;

use crate::broker::Broker;
use crate::connection::ConnectionServer;
use crate::dispatcher::Dispatcher;
use crate::error::{DispatchError, ValidationError};
use crate::lifecycle::LifecycleNotifier;
use crate::message::Message;
use crate::registry::ClientRegistry;
use crate::traits::ActionContext;
use crate::transport::Transport;

/// The process-wide registry, broker and dispatcher, built once at startup.
///
/// Cheap to clone; every clone shares the same state.
#[derive(Clone)]
pub struct Hub {
    registry: ClientRegistry,
    broker: Broker,
    dispatcher: Arc<Dispatcher>,
    lifecycle: LifecycleNotifier,
}

impl Hub {
    pub fn new(dispatcher: Dispatcher) -> Self {
        Self::with_broker(dispatcher, Broker::new())
    }

    pub fn with_broker(dispatcher: Dispatcher, broker: Broker) -> Self {
        let lifecycle = LifecycleNotifier::from_dispatcher(&dispatcher);
        Self {
            registry: ClientRegistry::new(),
            broker,
            dispatcher: Arc::new(dispatcher),
            lifecycle,
        }
    }

    pub fn registry(&self) -> &ClientRegistry {
        &self.registry
    }

    pub fn broker(&self) -> &Broker {
        &self.broker
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    /// Route an action sent by `client_id` to its handler.
    pub async fn dispatch(
        &self,
        message: Message,
        client_id: Option<String>,
    ) -> Result<(), DispatchError> {
        let ctx = ActionContext::new(client_id, self.broker.clone());
        self.dispatcher.dispatch(message, &ctx).await
    }

    /// Validate and register a new stream for `raw_client_id` writing to `transport`.
    pub async fn open_connection<T: Transport>(
        &self,
        raw_client_id: Option<&str>,
        transport: T,
    ) -> Result<ConnectionServer<T>, ValidationError> {
        ConnectionServer::open(
            raw_client_id,
            transport,
            self.registry.clone(),
            self.broker.clone(),
            self.lifecycle.clone(),
        )
        .await
    }
}
