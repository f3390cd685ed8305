//! Routes inbound actions to their registered handler.
//!
//! Routing is fixed at startup: each [`ActionRegistration`] declares up front
//! whether it carries a guard and/or a teardown hook.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, info, warn};

use crate::error::DispatchError;
use crate::message::Message;
use crate::traits::{ActionContext, ActionHandler, AuthorizationGuard, TeardownHook};

/// A handler plus its optional capabilities.
#[derive(Clone)]
pub struct ActionRegistration {
    pub handler: Arc<dyn ActionHandler>,
    pub guard: Option<Arc<dyn AuthorizationGuard>>,
    pub teardown: Option<Arc<dyn TeardownHook>>,
}

impl ActionRegistration {
    pub fn new(handler: Arc<dyn ActionHandler>) -> Self {
        Self {
            handler,
            guard: None,
            teardown: None,
        }
    }

    pub fn with_guard(mut self, guard: Arc<dyn AuthorizationGuard>) -> Self {
        self.guard = Some(guard);
        self
    }

    pub fn with_teardown(mut self, teardown: Arc<dyn TeardownHook>) -> Self {
        self.teardown = Some(teardown);
        self
    }

    pub fn name(&self) -> &str {
        self.handler.name()
    }
}

/// A handler's client-facing description, as served to bootstrapping clients.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreDescriptor {
    pub name: String,
    pub action_type: String,
    pub update_type: String,
    pub state: Value,
}

#[derive(Default)]
pub struct Dispatcher {
    routes: HashMap<String, ActionRegistration>,
    // Registration order, for stable listings.
    order: Vec<String>,
}

impl Dispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register under the handler's action type. A type may only be claimed once.
    pub fn register(&mut self, registration: ActionRegistration) -> Result<(), DispatchError> {
        let action_type = registration.handler.action_type();
        if self.routes.contains_key(&action_type) {
            return Err(DispatchError::DuplicateActionType(action_type));
        }
        info!(
            name = registration.name(),
            action_type = %action_type,
            guarded = registration.guard.is_some(),
            teardown = registration.teardown.is_some(),
            "Registered action handler"
        );
        self.order.push(action_type.clone());
        self.routes.insert(action_type, registration);
        Ok(())
    }

    /// Guard (if any), then handler. Guard errors come back unchanged.
    pub async fn dispatch(
        &self,
        message: Message,
        ctx: &ActionContext,
    ) -> Result<(), DispatchError> {
        let registration = self
            .routes
            .get(&message.kind)
            .ok_or_else(|| DispatchError::HandlerNotFound(message.kind.clone()))?;

        if let Some(guard) = &registration.guard {
            if let Err(e) = guard.authorize(&message, ctx).await {
                warn!(action_type = %message.kind, error = %e, "Action rejected by guard");
                return Err(e.into());
            }
        }

        debug!(action_type = %message.kind, client_id = ?ctx.client_id, "Dispatching action");
        registration
            .handler
            .handle(message, ctx)
            .await
            .map_err(|e| DispatchError::Handler(e.to_string()))
    }

    pub fn registrations(&self) -> impl Iterator<Item = &ActionRegistration> {
        self.order.iter().filter_map(|t| self.routes.get(t))
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// Each handler's name, topics and current default state.
    pub async fn stores(&self) -> Vec<StoreDescriptor> {
        let mut stores = Vec::with_capacity(self.routes.len());
        for registration in self.registrations() {
            let handler = &registration.handler;
            stores.push(StoreDescriptor {
                name: handler.name().to_string(),
                action_type: handler.action_type(),
                update_type: handler.update_type(),
                state: handler.default_state().await,
            });
        }
        stores
    }
}
