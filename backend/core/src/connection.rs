//! Per-connection streaming loop.
//!
//! `Connecting → Streaming → Closing → Closed`. A connection is registered and
//! subscribed on open, drains its subscription until the peer disconnects, and
//! on close detaches itself and notifies teardown hooks if it was the client's
//! last connection.

use std::time::Duration;

use serde_json::json;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::broker::{Broker, Subscription};
use crate::error::{DeliveryError, ValidationError};
use crate::lifecycle::LifecycleNotifier;
use crate::message::{ChannelMessage, Message, CONNECTED_TYPE};
use crate::registry::{ClientConnection, ClientRegistry};
use crate::transport::Transport;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Connecting,
    Streaming,
    Closing,
    Closed,
}

/// Accept only a present, well-formed UUID as a client id.
pub fn validate_client_id(raw: Option<&str>) -> Result<String, ValidationError> {
    let raw = raw.map(str::trim).filter(|s| !s.is_empty());
    let Some(raw) = raw else {
        return Err(ValidationError::MissingClientId);
    };
    Uuid::parse_str(raw).map_err(|_| ValidationError::InvalidClientId(raw.to_string()))?;
    Ok(raw.to_string())
}

pub struct ConnectionServer<T: Transport> {
    connection: ClientConnection,
    transport: T,
    subscription: Subscription,
    registry: ClientRegistry,
    broker: Broker,
    lifecycle: LifecycleNotifier,
    state: ConnectionState,
}

impl<T: Transport> ConnectionServer<T> {
    /// Validate the client id, then subscribe and register a fresh connection.
    ///
    /// Nothing is registered when validation fails.
    pub async fn open(
        raw_client_id: Option<&str>,
        transport: T,
        registry: ClientRegistry,
        broker: Broker,
        lifecycle: LifecycleNotifier,
    ) -> Result<Self, ValidationError> {
        let client_id = validate_client_id(raw_client_id)?;
        let connection = ClientConnection::new(client_id);

        // Subscribe first so nothing addressed to a registered connection slips past it.
        let subscription = broker.subscribe();
        registry.add(connection.clone()).await;

        info!(
            client_id = %connection.client_id,
            connection_id = %connection.connection_id,
            "Stream opened"
        );

        Ok(Self {
            connection,
            transport,
            subscription,
            registry,
            broker,
            lifecycle,
            state: ConnectionState::Streaming,
        })
    }

    pub fn connection(&self) -> &ClientConnection {
        &self.connection
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Stream until the peer disconnects or the broker goes away, then close.
    pub async fn run(mut self, connected_delay: Duration) {
        self.announce(connected_delay);

        loop {
            tokio::select! {
                biased;
                _ = self.transport.closed() => {
                    debug!(connection_id = %self.connection.connection_id, "Peer disconnected");
                    break;
                }
                next = self.subscription.recv() => match next {
                    Some(msg) => {
                        if !self.deliver(&msg).await {
                            break;
                        }
                    }
                    None => break,
                },
            }
        }

        self.close().await;
    }

    /// Publish the `connected` notification to this client after `delay`.
    fn announce(&self, delay: Duration) {
        let broker = self.broker.clone();
        let client_id = self.connection.client_id.clone();
        tokio::spawn(async move {
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            let message = Message::new(CONNECTED_TYPE, json!(client_id));
            broker.publish(ChannelMessage::to_client(message, client_id));
        });
    }

    /// Write `msg` if it targets this connection. Returns `false` once the transport is gone.
    ///
    /// Every other failure is logged and swallowed.
    async fn deliver(&mut self, msg: &ChannelMessage) -> bool {
        if !msg.matches(&self.connection) {
            return true;
        }

        match self.send(&msg.message).await {
            Ok(()) => {
                debug!(
                    connection_id = %self.connection.connection_id,
                    message_type = %msg.message.kind,
                    "Delivered"
                );
                true
            }
            Err(DeliveryError::Closed) => false,
            Err(e) => {
                warn!(
                    connection_id = %self.connection.connection_id,
                    message_type = %msg.message.kind,
                    error = %e,
                    "Delivery failed; frame dropped"
                );
                true
            }
        }
    }

    /// Frame, write and flush one message. A transport without flush is not an error.
    async fn send(&mut self, message: &Message) -> Result<(), DeliveryError> {
        let frame = message.to_frame()?;
        self.transport.write(frame).await?;
        match self.transport.flush().await {
            Err(DeliveryError::FlushUnsupported) => {
                debug!(
                    connection_id = %self.connection.connection_id,
                    "Flush unsupported; frame left buffered"
                );
                Ok(())
            }
            other => other,
        }
    }

    /// Unsubscribe, unregister and, for the client's last connection, run teardown hooks.
    ///
    /// Calling it again is a no-op.
    pub async fn close(&mut self) {
        if matches!(self.state, ConnectionState::Closing | ConnectionState::Closed) {
            return;
        }
        self.state = ConnectionState::Closing;
        self.connection.closed = true;
        self.subscription.unsubscribe();

        let removal = self.registry.remove(&self.connection).await;
        if removal.last_for_client {
            self.lifecycle.client_gone(&self.connection.client_id).await;
        }

        self.state = ConnectionState::Closed;
        info!(
            client_id = %self.connection.client_id,
            connection_id = %self.connection.connection_id,
            last = removal.last_for_client,
            "Stream closed"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatcher::{ActionRegistration, Dispatcher};
    use crate::traits::{ActionContext, ActionHandler, TeardownHook};
    use crate::transport::ChannelTransport;
    use async_trait::async_trait;
    use serde_json::Value;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use tokio::sync::mpsc;
    use tokio::time::timeout;

    const CLIENT: &str = "6f1c3a52-3c0e-4c57-9a8e-3f6f1d2b9a10";
    const OTHER: &str = "0b7d51c4-8d7e-4a8c-b1b0-2a4a5d6e7f80";

    #[derive(Default)]
    struct Sessions {
        torn_down: AtomicUsize,
    }

    #[async_trait]
    impl ActionHandler for Sessions {
        fn name(&self) -> &str {
            "sessions"
        }

        async fn default_state(&self) -> Value {
            Value::Null
        }

        async fn handle(&self, _: Message, _: &ActionContext) -> anyhow::Result<()> {
            Ok(())
        }
    }

    #[async_trait]
    impl TeardownHook for Sessions {
        async fn on_destroy(&self, _client_id: &str) {
            self.torn_down.fetch_add(1, Ordering::SeqCst);
        }
    }

    struct Fixture {
        registry: ClientRegistry,
        broker: Broker,
        lifecycle: LifecycleNotifier,
        sessions: Arc<Sessions>,
    }

    impl Fixture {
        fn new() -> Self {
            let sessions = Arc::new(Sessions::default());
            let mut dispatcher = Dispatcher::new();
            dispatcher
                .register(ActionRegistration::new(sessions.clone()).with_teardown(sessions.clone()))
                .unwrap();
            Self {
                registry: ClientRegistry::new(),
                broker: Broker::new(),
                lifecycle: LifecycleNotifier::from_dispatcher(&dispatcher),
                sessions,
            }
        }

        async fn open(
            &self,
            client_id: &str,
        ) -> (ConnectionServer<ChannelTransport>, mpsc::Receiver<String>) {
            let (transport, rx) = ChannelTransport::pair(16);
            let server = ConnectionServer::open(
                Some(client_id),
                transport,
                self.registry.clone(),
                self.broker.clone(),
                self.lifecycle.clone(),
            )
            .await
            .unwrap();
            (server, rx)
        }

        fn teardowns(&self) -> usize {
            self.sessions.torn_down.load(Ordering::SeqCst)
        }
    }

    async fn next_frame(rx: &mut mpsc::Receiver<String>) -> Message {
        let frame = timeout(Duration::from_secs(1), rx.recv()).await.unwrap().unwrap();
        let json = frame.strip_prefix("data: ").unwrap().strip_suffix("\n\n").unwrap();
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_client_id_validation() {
        assert_eq!(validate_client_id(None), Err(ValidationError::MissingClientId));
        assert_eq!(validate_client_id(Some("")), Err(ValidationError::MissingClientId));
        assert!(matches!(
            validate_client_id(Some("not-a-uuid")),
            Err(ValidationError::InvalidClientId(_))
        ));
        assert_eq!(validate_client_id(Some(CLIENT)).unwrap(), CLIENT);
    }

    #[tokio::test]
    async fn test_invalid_client_is_not_registered() {
        let fx = Fixture::new();
        let (transport, _rx) = ChannelTransport::pair(1);
        let result = ConnectionServer::open(
            Some("nope"),
            transport,
            fx.registry.clone(),
            fx.broker.clone(),
            fx.lifecycle.clone(),
        )
        .await;
        assert!(result.is_err());
        assert_eq!(fx.registry.connection_count().await, 0);
        assert_eq!(fx.broker.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn test_teardown_fires_once_after_last_close() {
        let fx = Fixture::new();
        let (mut c1, _rx1) = fx.open(CLIENT).await;
        let (mut c2, _rx2) = fx.open(CLIENT).await;
        assert_eq!(fx.registry.connections_for(CLIENT).await.len(), 2);

        c1.close().await;
        assert_eq!(fx.teardowns(), 0);

        c2.close().await;
        assert_eq!(fx.teardowns(), 1);
        assert_eq!(c2.state(), ConnectionState::Closed);
    }

    #[tokio::test]
    async fn test_close_is_idempotent() {
        let fx = Fixture::new();
        let (mut c1, _rx) = fx.open(CLIENT).await;

        c1.close().await;
        c1.close().await;

        assert_eq!(fx.teardowns(), 1);
        assert_eq!(fx.registry.connection_count().await, 0);
        assert_eq!(fx.broker.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn test_connected_notification_first() {
        let fx = Fixture::new();
        let (server, mut rx) = fx.open(CLIENT).await;
        tokio::spawn(server.run(Duration::ZERO));

        let msg = next_frame(&mut rx).await;
        assert_eq!(msg, Message::new(CONNECTED_TYPE, json!(CLIENT)));
    }

    #[tokio::test]
    async fn test_fan_out_respects_filter() {
        let fx = Fixture::new();
        let (a1, mut rx_a1) = fx.open(CLIENT).await;
        let (a2, mut rx_a2) = fx.open(CLIENT).await;
        let (b, mut rx_b) = fx.open(OTHER).await;
        for server in [a1, a2, b] {
            tokio::spawn(server.run(Duration::ZERO));
        }
        // Drain the connected notifications: two for CLIENT reach both tabs.
        for _ in 0..2 {
            next_frame(&mut rx_a1).await;
            next_frame(&mut rx_a2).await;
        }
        next_frame(&mut rx_b).await;

        fx.broker.publish(ChannelMessage::to_client(Message::new("only-a", Value::Null), CLIENT));
        fx.broker.publish(ChannelMessage::to_all(Message::new("everyone", Value::Null)));

        assert_eq!(next_frame(&mut rx_a1).await.kind, "only-a");
        assert_eq!(next_frame(&mut rx_a2).await.kind, "only-a");
        assert_eq!(next_frame(&mut rx_b).await.kind, "everyone");
        assert_eq!(next_frame(&mut rx_a1).await.kind, "everyone");
        assert_eq!(next_frame(&mut rx_a2).await.kind, "everyone");
    }

    #[tokio::test]
    async fn test_disconnect_closes_and_tears_down() {
        let fx = Fixture::new();
        let (server, rx) = fx.open(CLIENT).await;
        let handle = tokio::spawn(server.run(Duration::from_secs(60)));

        drop(rx);
        timeout(Duration::from_secs(1), handle).await.unwrap().unwrap();

        assert_eq!(fx.registry.connection_count().await, 0);
        assert_eq!(fx.broker.subscriber_count(), 0);
        assert_eq!(fx.teardowns(), 1);
    }

    struct NoFlush {
        frames: mpsc::UnboundedSender<String>,
    }

    #[async_trait]
    impl Transport for NoFlush {
        async fn write(&mut self, frame: String) -> Result<(), DeliveryError> {
            self.frames.send(frame).map_err(|_| DeliveryError::Closed)
        }

        async fn closed(&self) {
            self.frames.closed().await;
        }
    }

    /// Fails the first write of a frame containing `fail_on`.
    struct FlakyWrite {
        frames: mpsc::UnboundedSender<String>,
        fail_on: &'static str,
        failed: bool,
    }

    #[async_trait]
    impl Transport for FlakyWrite {
        async fn write(&mut self, frame: String) -> Result<(), DeliveryError> {
            if !self.failed && frame.contains(self.fail_on) {
                self.failed = true;
                return Err(DeliveryError::Write("connection reset".into()));
            }
            self.frames.send(frame).map_err(|_| DeliveryError::Closed)
        }

        async fn flush(&mut self) -> Result<(), DeliveryError> {
            Ok(())
        }

        async fn closed(&self) {
            self.frames.closed().await;
        }
    }

    #[tokio::test]
    async fn test_write_failure_is_isolated_to_one_connection() {
        let fx = Fixture::new();
        let (tx, mut flaky_rx) = mpsc::unbounded_channel();
        let flaky = ConnectionServer::open(
            Some(CLIENT),
            FlakyWrite {
                frames: tx,
                fail_on: "dropped",
                failed: false,
            },
            fx.registry.clone(),
            fx.broker.clone(),
            fx.lifecycle.clone(),
        )
        .await
        .unwrap();
        let (healthy, mut healthy_rx) = fx.open(OTHER).await;
        let flaky_handle = tokio::spawn(flaky.run(Duration::ZERO));
        tokio::spawn(healthy.run(Duration::ZERO));

        let frame = timeout(Duration::from_secs(1), flaky_rx.recv()).await.unwrap().unwrap();
        assert!(frame.contains("\"connected\""));
        assert_eq!(next_frame(&mut healthy_rx).await.kind, CONNECTED_TYPE);

        fx.broker.publish(ChannelMessage::to_all(Message::new("dropped", Value::Null)));
        fx.broker.publish(ChannelMessage::to_all(Message::new("after", Value::Null)));

        assert_eq!(next_frame(&mut healthy_rx).await.kind, "dropped");
        assert_eq!(next_frame(&mut healthy_rx).await.kind, "after");

        // The failed frame is skipped and the loop keeps streaming.
        let frame = timeout(Duration::from_secs(1), flaky_rx.recv()).await.unwrap().unwrap();
        assert!(frame.contains("\"after\""));
        assert!(!flaky_handle.is_finished());
        assert_eq!(fx.registry.connection_count().await, 2);
        assert_eq!(fx.teardowns(), 0);
    }

    #[tokio::test]
    async fn test_transport_without_flush_still_delivers() {
        let fx = Fixture::new();
        let (tx, mut rx) = mpsc::unbounded_channel();
        let server = ConnectionServer::open(
            Some(CLIENT),
            NoFlush { frames: tx },
            fx.registry.clone(),
            fx.broker.clone(),
            fx.lifecycle.clone(),
        )
        .await
        .unwrap();
        tokio::spawn(server.run(Duration::ZERO));

        let frame = timeout(Duration::from_secs(1), rx.recv()).await.unwrap().unwrap();
        assert!(frame.starts_with("data: {\"type\":\"connected\""));

        fx.broker.publish(ChannelMessage::to_all(Message::new("later", json!(1))));
        let frame = timeout(Duration::from_secs(1), rx.recv()).await.unwrap().unwrap();
        assert!(frame.contains("\"later\""));
    }
}
