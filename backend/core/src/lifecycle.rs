use std::sync::Arc;

use futures::future::join_all;
use tracing::info;

use crate::dispatcher::Dispatcher;
use crate::traits::TeardownHook;

/// Calls every registered teardown hook when a client's last connection closes.
#[derive(Clone, Default)]
pub struct LifecycleNotifier {
    hooks: Arc<Vec<(String, Arc<dyn TeardownHook>)>>,
}

impl LifecycleNotifier {
    /// Collect the hooks of every registration that declared one.
    pub fn from_dispatcher(dispatcher: &Dispatcher) -> Self {
        let hooks = dispatcher
            .registrations()
            .filter_map(|r| r.teardown.clone().map(|hook| (r.name().to_string(), hook)))
            .collect();
        Self {
            hooks: Arc::new(hooks),
        }
    }

    pub fn hook_count(&self) -> usize {
        self.hooks.len()
    }

    /// Run all hooks for `client_id` concurrently; order between handlers is unspecified.
    pub async fn client_gone(&self, client_id: &str) {
        if self.hooks.is_empty() {
            return;
        }
        info!(
            client_id,
            hooks = self.hooks.len(),
            "Last connection closed; tearing down client state"
        );
        join_all(self.hooks.iter().map(|(_, hook)| hook.on_destroy(client_id))).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatcher::ActionRegistration;
    use crate::traits::{ActionContext, ActionHandler};
    use crate::Message;
    use async_trait::async_trait;
    use serde_json::Value;
    use tokio::sync::Mutex;

    #[derive(Default)]
    struct Tracked {
        name: &'static str,
        destroyed: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl ActionHandler for Tracked {
        fn name(&self) -> &str {
            self.name
        }

        async fn default_state(&self) -> Value {
            Value::Null
        }

        async fn handle(&self, _: Message, _: &ActionContext) -> anyhow::Result<()> {
            Ok(())
        }
    }

    #[async_trait]
    impl TeardownHook for Tracked {
        async fn on_destroy(&self, client_id: &str) {
            self.destroyed.lock().await.push(client_id.to_string());
        }
    }

    #[tokio::test]
    async fn test_only_declared_hooks_run() {
        let with_hook = Arc::new(Tracked { name: "a", ..Default::default() });
        let without = Arc::new(Tracked { name: "b", ..Default::default() });

        let mut dispatcher = Dispatcher::new();
        dispatcher
            .register(ActionRegistration::new(with_hook.clone()).with_teardown(with_hook.clone()))
            .unwrap();
        dispatcher.register(ActionRegistration::new(without.clone())).unwrap();

        let notifier = LifecycleNotifier::from_dispatcher(&dispatcher);
        assert_eq!(notifier.hook_count(), 1);

        notifier.client_gone("client-1").await;
        assert_eq!(*with_hook.destroyed.lock().await, vec!["client-1".to_string()]);
        assert!(without.destroyed.lock().await.is_empty());
    }
}
