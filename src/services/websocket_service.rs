use axum::extract::ws::{Message, WebSocket};
use futures::{SinkExt, StreamExt};
use tokio::{sync::mpsc, task::JoinHandle};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::state::{
    SharedState,
    registry::{ClientConnection, ConnectionRole},
};

/// Handle the full lifecycle for one client WebSocket connection.
///
/// The role comes from the URL path, so the connection is registered right
/// away; a dedicated writer task drains the outbound channel, keeping
/// broadcasts flowing even while we await inbound frames. The connection is
/// only removed from the registry here, on observed disconnect.
pub async fn handle_socket(state: SharedState, socket: WebSocket, role: ConnectionRole) {
    let (mut sender, mut receiver) = socket.split();
    let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel::<Message>();

    let writer_task = tokio::spawn(async move {
        while let Some(message) = outbound_rx.recv().await {
            if sender.send(message).await.is_err() {
                break;
            }
        }
    });

    let connection_id = Uuid::new_v4();
    state.registry().register(ClientConnection {
        id: connection_id,
        role,
        tx: outbound_tx.clone(),
    });
    info!(id = %connection_id, %role, "client connected");

    while let Some(message) = receiver.next().await {
        match message {
            Ok(Message::Text(text)) => {
                // Clients only listen; inbound text doubles as a keep-alive.
                debug!(id = %connection_id, payload = %text, "ignoring inbound client message");
            }
            Ok(Message::Ping(payload)) => {
                let _ = outbound_tx.send(Message::Pong(payload));
            }
            Ok(Message::Close(frame)) => {
                info!(id = %connection_id, %role, "client closed");
                let _ = outbound_tx.send(Message::Close(frame));
                break;
            }
            Ok(Message::Binary(_)) => {}
            Ok(Message::Pong(_)) => {}
            Err(err) => {
                warn!(id = %connection_id, %role, error = %err, "websocket error");
                break;
            }
        }
    }

    state.registry().unregister(connection_id);
    info!(id = %connection_id, %role, "client disconnected");

    finalize(writer_task, outbound_tx).await;
}

/// Ensure the writer task winds down before we return from the socket handler.
async fn finalize(writer_task: JoinHandle<()>, outbound_tx: mpsc::UnboundedSender<Message>) {
    drop(outbound_tx);
    let _ = writer_task.await;
}
