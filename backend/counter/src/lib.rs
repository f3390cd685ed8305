//! `statecast-counter`: a shared counter with an undo-style history.
//!
//! Every client sees the same counter. `add` records the previous value in the
//! history before adding; `sub` only applies while the value is positive and
//! drops the newest history entry. Each handled action broadcasts the full
//! state under `[counter] update`.

use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::Mutex;
use tracing::{debug, info};

use statecast_core::{
    ActionContext, ActionHandler, AuthorizationGuard, ChannelMessage, GuardError, Message,
    TeardownHook,
};

pub const NAME: &str = "counter";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub id: usize,
    pub counter: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CounterState {
    pub value: i64,
    pub history: Vec<HistoryEntry>,
}

#[derive(Debug, Deserialize)]
struct Arguments {
    #[serde(default)]
    operation: String,
    #[serde(default)]
    value: i64,
}

impl CounterState {
    /// Apply one operation. On overflow the state is left as it was.
    fn apply(&mut self, args: &Arguments) -> Result<()> {
        match args.operation.as_str() {
            "add" => {
                let value = self
                    .value
                    .checked_add(args.value)
                    .ok_or_else(|| anyhow!("counter overflow: {} + {}", self.value, args.value))?;
                self.history.push(HistoryEntry {
                    id: self.history.len() + 1,
                    counter: format!("Counter {}", self.value),
                });
                self.value = value;
            }
            "sub" => {
                if self.value > 0 {
                    let value = self.value.checked_sub(args.value).ok_or_else(|| {
                        anyhow!("counter overflow: {} - {}", self.value, args.value)
                    })?;
                    self.history.pop();
                    self.value = value;
                }
            }
            other => debug!(operation = other, "Ignoring unknown counter operation"),
        }
        Ok(())
    }
}

/// The counter handler. Register it as handler, guard and teardown hook.
#[derive(Default)]
pub struct Counter {
    state: Mutex<CounterState>,
    frozen: AtomicBool,
}

impl Counter {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn snapshot(&self) -> CounterState {
        self.state.lock().await.clone()
    }

    /// Reject all further operations until [`Counter::thaw`].
    pub fn freeze(&self) {
        self.frozen.store(true, Ordering::SeqCst);
    }

    pub fn thaw(&self) {
        self.frozen.store(false, Ordering::SeqCst);
    }
}

#[async_trait]
impl ActionHandler for Counter {
    fn name(&self) -> &str {
        NAME
    }

    async fn default_state(&self) -> Value {
        let state = self.state.lock().await;
        serde_json::to_value(&*state).unwrap_or(Value::Null)
    }

    async fn handle(&self, message: Message, ctx: &ActionContext) -> Result<()> {
        let args: Arguments =
            serde_json::from_value(message.payload).context("invalid counter arguments")?;

        // Held through the publish so subscribers see updates in mutation order.
        let mut state = self.state.lock().await;
        state.apply(&args)?;
        let payload = serde_json::to_value(&*state).context("failed to serialize counter state")?;
        ctx.publish(ChannelMessage::to_all(Message::new(self.update_type(), payload)));
        Ok(())
    }
}

#[async_trait]
impl AuthorizationGuard for Counter {
    async fn authorize(&self, _message: &Message, _ctx: &ActionContext) -> Result<(), GuardError> {
        if self.frozen.load(Ordering::SeqCst) {
            return Err(GuardError::new("forbidden"));
        }
        Ok(())
    }
}

#[async_trait]
impl TeardownHook for Counter {
    async fn on_destroy(&self, client_id: &str) {
        info!(client_id, "Client disconnected; resetting counter");
        *self.state.lock().await = CounterState::default();
    }
}
