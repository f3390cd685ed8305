//! Directory of live streaming connections, keyed by client id.
//!
//! One client id may hold several connections at once (one per open tab).
//! Every mutation goes through a single exclusive lock; reads copy a snapshot
//! out under that lock so callers never do I/O while holding it.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::debug;
use uuid::Uuid;

/// One physical streaming connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConnection {
    /// Caller-chosen, stable across reconnects.
    pub client_id: String,
    /// Server-generated, unique per stream.
    pub connection_id: String,
    pub closed: bool,
}

impl ClientConnection {
    /// A fresh connection for `client_id` with a newly generated connection id.
    pub fn new(client_id: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            connection_id: Uuid::new_v4().to_string(),
            closed: false,
        }
    }
}

/// Outcome of [`ClientRegistry::remove`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Removal {
    /// The connection was registered and is now gone.
    pub removed: bool,
    /// The removed connection was the client's last one.
    pub last_for_client: bool,
}

#[derive(Clone, Default)]
pub struct ClientRegistry {
    clients: Arc<Mutex<HashMap<String, Vec<ClientConnection>>>>,
}

impl ClientRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `connection` to its client's connection set.
    pub async fn add(&self, connection: ClientConnection) {
        let mut clients = self.clients.lock().await;
        debug!(
            client_id = %connection.client_id,
            connection_id = %connection.connection_id,
            "Registering connection"
        );
        clients
            .entry(connection.client_id.clone())
            .or_default()
            .push(connection);
    }

    /// Remove `connection` by its connection id. Absent connections are a no-op.
    ///
    /// `last_for_client` is decided under the same lock as the removal, so of
    /// several concurrent removals for one client exactly one observes it.
    pub async fn remove(&self, connection: &ClientConnection) -> Removal {
        let mut clients = self.clients.lock().await;
        let Some(set) = clients.get_mut(&connection.client_id) else {
            return Removal {
                removed: false,
                last_for_client: false,
            };
        };

        let before = set.len();
        set.retain(|c| c.connection_id != connection.connection_id);
        let removed = set.len() < before;
        let empty = set.is_empty();
        if empty {
            clients.remove(&connection.client_id);
        }

        Removal {
            removed,
            last_for_client: removed && empty,
        }
    }

    /// Snapshot of every connection matching `filter`.
    pub async fn query<F>(&self, filter: F) -> Vec<ClientConnection>
    where
        F: Fn(&ClientConnection) -> bool,
    {
        let clients = self.clients.lock().await;
        clients
            .values()
            .flatten()
            .filter(|c| filter(c))
            .cloned()
            .collect()
    }

    pub async fn connections_for(&self, client_id: &str) -> Vec<ClientConnection> {
        let clients = self.clients.lock().await;
        clients.get(client_id).cloned().unwrap_or_default()
    }

    pub async fn connection_count(&self) -> usize {
        self.clients.lock().await.values().map(Vec::len).sum()
    }

    pub async fn client_count(&self) -> usize {
        self.clients.lock().await.len()
    }
}
