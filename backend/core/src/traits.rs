use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;

use crate::broker::Broker;
use crate::error::GuardError;
use crate::message::{action_type_for, update_type_for, ChannelMessage, Message};

/// What a guard or handler knows about the request that carried an action.
#[derive(Clone)]
pub struct ActionContext {
    /// Client id the caller sent alongside the action, if any.
    pub client_id: Option<String>,
    broker: Broker,
}

impl ActionContext {
    pub fn new(client_id: Option<String>, broker: Broker) -> Self {
        Self { client_id, broker }
    }

    /// Publish to every subscribed connection whose filter matches.
    pub fn publish(&self, message: ChannelMessage) -> usize {
        self.broker.publish(message)
    }
}

/// A long-lived unit owning a slice of application state.
///
/// One instance serves every request for its action type, concurrently.
/// Implementations guard their own mutable state; nothing around `handle`
/// serializes calls.
#[async_trait]
pub trait ActionHandler: Send + Sync + 'static {
    /// Unique name of the handler (e.g., "counter").
    fn name(&self) -> &str;

    fn action_type(&self) -> String {
        action_type_for(self.name())
    }

    fn update_type(&self) -> String {
        update_type_for(self.name())
    }

    /// JSON snapshot of the state a freshly loaded client starts from.
    async fn default_state(&self) -> Value;

    /// Apply the action and publish any resulting updates.
    async fn handle(&self, message: Message, ctx: &ActionContext) -> Result<()>;
}

/// Runs before a handler; an error aborts the dispatch.
#[async_trait]
pub trait AuthorizationGuard: Send + Sync + 'static {
    async fn authorize(&self, message: &Message, ctx: &ActionContext) -> Result<(), GuardError>;
}

/// Releases per-client resources when a client's last connection closes.
#[async_trait]
pub trait TeardownHook: Send + Sync + 'static {
    async fn on_destroy(&self, client_id: &str);
}
