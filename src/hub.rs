use crate::registry::ConnectionId;
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use thiserror::Error;
use tokio::sync::mpsc::UnboundedSender;
use tokio::sync::RwLock;
use tracing::error;
use wordchain_protocol::{ServerEvent, ServerMessage};

/// Delivery of room-wide events. Fire-and-forget: failures are logged by the
/// implementation and never reach the game logic.
#[async_trait]
pub trait Broadcaster: Send + Sync {
    async fn subscribe(&self, code: &str, conn: ConnectionId);
    async fn unsubscribe(&self, code: &str, conn: ConnectionId);
    async fn publish(&self, code: &str, event: ServerEvent);
    /// Direct reply to a single connection.
    async fn send_to(&self, conn: ConnectionId, message: ServerMessage);
}

#[derive(Debug, Error)]
pub enum HubError {
    #[error("unknown connection")]
    UnknownConnection,
    #[error("connection closed")]
    Closed,
}

/// Live websocket connections and the rooms they listen to.
#[derive(Debug, Default)]
pub struct ConnectionHub {
    peers: RwLock<HashMap<ConnectionId, UnboundedSender<String>>>,
    rooms: RwLock<HashMap<String, HashSet<ConnectionId>>>,
}

impl ConnectionHub {
    pub fn new() -> Self {
        Default::default()
    }

    pub async fn connect(&self, conn: ConnectionId, sender: UnboundedSender<String>) {
        self.peers.write().await.insert(conn, sender);
    }

    pub async fn disconnect(&self, conn: ConnectionId) {
        self.peers.write().await.remove(&conn);
        let mut rooms = self.rooms.write().await;
        for members in rooms.values_mut() {
            members.remove(&conn);
        }
        rooms.retain(|_, members| !members.is_empty());
    }

    /// Send a frame to one connection without blocking.
    pub async fn try_send(&self, conn: ConnectionId, text: String) -> Result<(), HubError> {
        let peers = self.peers.read().await;
        let sender = peers.get(&conn).ok_or(HubError::UnknownConnection)?;
        sender.send(text).map_err(|_| HubError::Closed)
    }
}

#[async_trait]
impl Broadcaster for ConnectionHub {
    async fn subscribe(&self, code: &str, conn: ConnectionId) {
        self.rooms
            .write()
            .await
            .entry(code.to_string())
            .or_default()
            .insert(conn);
    }

    async fn unsubscribe(&self, code: &str, conn: ConnectionId) {
        let mut rooms = self.rooms.write().await;
        if let Some(members) = rooms.get_mut(code) {
            members.remove(&conn);
            if members.is_empty() {
                rooms.remove(code);
            }
        }
    }

    async fn publish(&self, code: &str, event: ServerEvent) {
        let name = event.name();
        let text = match serde_json::to_string(&ServerMessage::Event(event)) {
            Ok(text) => text,
            Err(e) => {
                error!(room = %code, event = name, "failed to encode event: {e}");
                return;
            }
        };
        let members: Vec<ConnectionId> = match self.rooms.read().await.get(code) {
            Some(members) => members.iter().copied().collect(),
            None => return,
        };
        for conn in members {
            if let Err(e) = self.try_send(conn, text.clone()).await {
                error!(room = %code, %conn, event = name, "error sending event: {e}");
            }
        }
    }

    async fn send_to(&self, conn: ConnectionId, message: ServerMessage) {
        let text = match serde_json::to_string(&message) {
            Ok(text) => text,
            Err(e) => {
                error!(%conn, "failed to encode message: {e}");
                return;
            }
        };
        if let Err(e) = self.try_send(conn, text).await {
            error!(%conn, "error sending message: {e}");
        }
    }
}
