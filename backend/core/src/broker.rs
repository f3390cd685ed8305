use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, warn};

use crate::message::ChannelMessage;

/// Default per-subscriber buffer before a slow subscriber starts skipping messages.
pub const DEFAULT_CAPACITY: usize = 1024;

/// In-process fan-out of [`ChannelMessage`]s to every live subscription.
///
/// Each subscription owns its own receive position, so every subscriber sees
/// every message published while it is attached. A subscriber that falls more
/// than `capacity` messages behind skips the oldest ones; publishers never wait.
#[derive(Clone)]
pub struct Broker {
    sender: broadcast::Sender<Arc<ChannelMessage>>,
    next_id: Arc<AtomicU64>,
}

impl Broker {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        debug!(capacity, "Broker initialized");
        Self {
            sender,
            next_id: Arc::new(AtomicU64::new(1)),
        }
    }

    /// Hand `message` to every current subscriber. Returns how many received it.
    pub fn publish(&self, message: ChannelMessage) -> usize {
        let kind = message.message.kind.clone();
        match self.sender.send(Arc::new(message)) {
            Ok(n) => {
                debug!(message_type = %kind, subscribers = n, "Published");
                n
            }
            // No subscribers: the message is simply dropped.
            Err(_) => 0,
        }
    }

    /// Attach a new subscription. It only sees messages published from now on.
    pub fn subscribe(&self) -> Subscription {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        debug!(subscription_id = id, "Subscribed");
        Subscription {
            id,
            receiver: Some(self.sender.subscribe()),
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for Broker {
    fn default() -> Self {
        Self::new()
    }
}

/// One subscriber's private receive path. Dropping it unsubscribes.
pub struct Subscription {
    id: u64,
    receiver: Option<broadcast::Receiver<Arc<ChannelMessage>>>,
}

impl Subscription {
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn is_active(&self) -> bool {
        self.receiver.is_some()
    }

    /// Next message for this subscriber, or `None` once unsubscribed or the broker is gone.
    ///
    /// Lagging skips the missed messages and carries on with the oldest retained one.
    pub async fn recv(&mut self) -> Option<Arc<ChannelMessage>> {
        let receiver = self.receiver.as_mut()?;
        loop {
            match receiver.recv().await {
                Ok(msg) => return Some(msg),
                Err(RecvError::Lagged(skipped)) => {
                    warn!(
                        subscription_id = self.id,
                        skipped,
                        "Subscriber lagged; dropped oldest messages"
                    );
                }
                Err(RecvError::Closed) => return None,
            }
        }
    }

    /// Detach from the broker. Safe to call more than once.
    pub fn unsubscribe(&mut self) {
        if self.receiver.take().is_some() {
            debug!(subscription_id = self.id, "Unsubscribed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::Message;
    use crate::registry::ClientConnection;
    use serde_json::json;
    use std::time::Duration;
    use tokio::time::timeout;

    fn msg(kind: &str) -> ChannelMessage {
        ChannelMessage::to_all(Message::new(kind, json!(null)))
    }

    #[tokio::test]
    async fn test_every_subscriber_gets_a_copy() {
        let broker = Broker::new();
        let mut subs: Vec<_> = (0..5).map(|_| broker.subscribe()).collect();

        assert_eq!(broker.publish(msg("[counter] update")), 5);

        for sub in &mut subs {
            let got = sub.recv().await.unwrap();
            assert_eq!(got.message.kind, "[counter] update");
        }
    }

    #[tokio::test]
    async fn test_filter_evaluated_per_subscriber() {
        let broker = Broker::new();
        let mut sub = broker.subscribe();
        let a = ClientConnection::new("a");
        let b = ClientConnection::new("b");

        broker.publish(ChannelMessage::to_client(Message::new("x", json!(1)), "a"));
        let got = sub.recv().await.unwrap();
        assert!(got.matches(&a));
        assert!(!got.matches(&b));
    }

    #[tokio::test]
    async fn test_no_replay_for_late_subscriber() {
        let broker = Broker::new();
        let _early = broker.subscribe();
        broker.publish(msg("before"));

        let mut late = broker.subscribe();
        broker.publish(msg("after"));

        let got = late.recv().await.unwrap();
        assert_eq!(got.message.kind, "after");
    }

    #[tokio::test]
    async fn test_publish_without_subscribers() {
        let broker = Broker::new();
        assert_eq!(broker.publish(msg("lost")), 0);
    }

    #[tokio::test]
    async fn test_slow_subscriber_does_not_block_others() {
        let broker = Broker::with_capacity(2);
        let mut slow = broker.subscribe();
        let mut fast = broker.subscribe();

        for i in 0..5 {
            broker.publish(msg(&format!("m{i}")));
            let got = fast.recv().await.unwrap();
            assert_eq!(got.message.kind, format!("m{i}"));
        }

        // The slow subscriber skips the oldest and resumes with what is retained.
        let got = slow.recv().await.unwrap();
        assert_eq!(got.message.kind, "m3");
    }

    #[tokio::test]
    async fn test_unsubscribe_is_idempotent() {
        let broker = Broker::new();
        let mut sub = broker.subscribe();
        assert_eq!(broker.subscriber_count(), 1);

        sub.unsubscribe();
        sub.unsubscribe();
        assert!(!sub.is_active());
        assert_eq!(broker.subscriber_count(), 0);
        assert_eq!(broker.publish(msg("x")), 0);

        let next = timeout(Duration::from_millis(50), sub.recv()).await.unwrap();
        assert!(next.is_none());
    }

    #[tokio::test]
    async fn test_fifo_per_subscriber() {
        let broker = Broker::new();
        let mut sub = broker.subscribe();
        for i in 0..10 {
            broker.publish(msg(&i.to_string()));
        }
        for i in 0..10 {
            assert_eq!(sub.recv().await.unwrap().message.kind, i.to_string());
        }
    }
}
