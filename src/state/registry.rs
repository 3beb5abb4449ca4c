use std::fmt;
use std::str::FromStr;

use axum::extract::ws::Message;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::dto::ws::ServerMessage;

/// Role a live connection is registered under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionRole {
    /// The big shared screen.
    Display,
    /// The host controller client.
    Host,
    /// A participant mobile client.
    User,
}

impl FromStr for ConnectionRole {
    type Err = UnknownRole;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "display" => Ok(ConnectionRole::Display),
            "host" => Ok(ConnectionRole::Host),
            "user" => Ok(ConnectionRole::User),
            other => Err(UnknownRole(other.to_string())),
        }
    }
}

impl fmt::Display for ConnectionRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ConnectionRole::Display => "display",
            ConnectionRole::Host => "host",
            ConnectionRole::User => "user",
        };
        f.write_str(label)
    }
}

/// Error returned when a WebSocket path carries an unknown role segment.
#[derive(Debug, thiserror::Error)]
#[error("unknown connection role `{0}`")]
pub struct UnknownRole(String);

#[derive(Clone)]
/// Handle used to push messages to a connected client.
pub struct ClientConnection {
    /// Registry identifier for the connection.
    pub id: Uuid,
    /// Role bucket the connection is filed under.
    pub role: ConnectionRole,
    /// Outbound channel drained by the connection's writer task.
    pub tx: mpsc::UnboundedSender<Message>,
}

/// Live WebSocket connections partitioned by role.
///
/// Sends are enqueue-only onto per-connection channels, so a stalled peer
/// never blocks delivery to its siblings. A failed send is swallowed and the
/// connection stays registered; removal only happens through [`Self::unregister`]
/// when the socket handler observes the disconnect.
pub struct ConnectionRegistry {
    connections: DashMap<Uuid, ClientConnection>,
}

impl ConnectionRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            connections: DashMap::new(),
        }
    }

    /// File a connection under its role bucket.
    pub fn register(&self, connection: ClientConnection) {
        self.connections.insert(connection.id, connection);
    }

    /// Remove a connection; a no-op when the id is not registered.
    pub fn unregister(&self, id: Uuid) {
        self.connections.remove(&id);
    }

    /// Send a message to every registered connection regardless of role.
    pub fn broadcast(&self, message: &ServerMessage) {
        self.send_where(message, |_| true);
    }

    /// Send a message to every connection registered under `role`.
    pub fn broadcast_to_role(&self, role: ConnectionRole, message: &ServerMessage) {
        self.send_where(message, |connection| connection.role == role);
    }

    fn send_where(&self, message: &ServerMessage, filter: impl Fn(&ClientConnection) -> bool) {
        let payload = match serde_json::to_string(message) {
            Ok(payload) => payload,
            Err(err) => {
                warn!(error = %err, "failed to serialize broadcast payload");
                return;
            }
        };

        for connection in self.connections.iter().filter(|entry| filter(entry.value())) {
            if connection.tx.send(Message::Text(payload.clone().into())).is_err() {
                // Writer already gone; the socket handler unregisters on
                // disconnect, delivery simply skips this connection.
                debug!(id = %connection.id, role = %connection.role, "dropping message for closed connection");
            }
        }
    }
}

impl Default for ConnectionRegistry {
    fn default() -> Self {
        Self::new()
    }
}
