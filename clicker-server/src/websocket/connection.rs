use async_trait::async_trait;
use clicker_types::{ClanId, PlayerId, ServerMessage};
use std::collections::HashMap;
use std::fmt;
use std::time::Instant;
use tokio::sync::{RwLock, mpsc};
use tracing::debug;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(Uuid);

impl ConnectionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone)]
pub struct Connection {
    pub id: ConnectionId,
    pub player_id: Option<PlayerId>,
    /// Group the connection receives scoped messages for.
    pub clan_id: Option<ClanId>,
    pub connected_at: Instant,
    pub sender: mpsc::UnboundedSender<ServerMessage>,
}

impl Connection {
    pub fn new(id: ConnectionId) -> (Self, mpsc::UnboundedReceiver<ServerMessage>) {
        let (sender, receiver) = mpsc::unbounded_channel();

        let connection = Self {
            id,
            player_id: None,
            clan_id: None,
            connected_at: Instant::now(),
            sender,
        };

        (connection, receiver)
    }

    pub fn send_message(&self, message: ServerMessage) -> Result<(), String> {
        self.sender
            .send(message)
            .map_err(|_| "Connection closed".to_string())
    }

    pub fn is_open(&self) -> bool {
        !self.sender.is_closed()
    }

    pub fn in_group(&self, group: &str) -> bool {
        self.clan_id.as_deref() == Some(group)
    }
}

/// Delivery scopes for server-pushed messages. Both are best effort:
/// connections that are gone are skipped, nothing is queued.
#[async_trait]
pub trait Broadcaster: Send + Sync {
    /// Returns how many connections the message was handed to.
    async fn publish_global(&self, message: ServerMessage) -> usize;

    async fn publish_to_group(&self, group: &str, message: ServerMessage) -> usize;
}

pub struct ConnectionManager {
    connections: RwLock<HashMap<ConnectionId, Connection>>,
}

impl ConnectionManager {
    pub fn new() -> Self {
        Self {
            connections: RwLock::new(HashMap::new()),
        }
    }

    pub async fn create_connection(
        &self,
        id: ConnectionId,
    ) -> mpsc::UnboundedReceiver<ServerMessage> {
        let (conn, receiver) = Connection::new(id);

        {
            let mut connections = self.connections.write().await;
            connections.insert(id, conn);
        }

        receiver
    }

    pub async fn remove_connection(&self, id: ConnectionId) {
        let mut connections = self.connections.write().await;
        connections.remove(&id);
    }

    /// Records who is on the other end and which clan they belong to.
    pub async fn identify(&self, id: ConnectionId, player_id: PlayerId, clan_id: Option<ClanId>) {
        let mut connections = self.connections.write().await;
        if let Some(connection) = connections.get_mut(&id) {
            debug!(
                "Connection {} is player {} in clan {:?}",
                id, player_id, clan_id
            );
            connection.player_id = Some(player_id);
            connection.clan_id = clan_id;
        }
    }

    pub async fn set_group(&self, id: ConnectionId, clan_id: Option<ClanId>) {
        let mut connections = self.connections.write().await;
        if let Some(connection) = connections.get_mut(&id) {
            connection.clan_id = clan_id;
        }
    }

    pub async fn send_to_connection(
        &self,
        id: ConnectionId,
        message: ServerMessage,
    ) -> Result<(), String> {
        let connections = self.connections.read().await;
        if let Some(connection) = connections.get(&id) {
            connection.send_message(message)
        } else {
            Err("Connection not found".to_string())
        }
    }

    async fn deliver(&self, message: ServerMessage, filter: impl Fn(&Connection) -> bool) -> usize {
        let connections = self.connections.read().await;
        connections
            .values()
            .filter(|conn| conn.is_open() && filter(conn))
            .filter(|conn| conn.send_message(message.clone()).is_ok())
            .count()
    }

    pub async fn connection_count(&self) -> usize {
        let connections = self.connections.read().await;
        connections.len()
    }

    pub async fn group_size(&self, group: &str) -> usize {
        let connections = self.connections.read().await;
        connections.values().filter(|conn| conn.in_group(group)).count()
    }
}

impl Default for ConnectionManager {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Broadcaster for ConnectionManager {
    async fn publish_global(&self, message: ServerMessage) -> usize {
        self.deliver(message, |_| true).await
    }

    async fn publish_to_group(&self, group: &str, message: ServerMessage) -> usize {
        self.deliver(message, |conn| conn.in_group(group)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clicker_types::ChatMessage;
    use std::time::Duration;

    fn chat(text: &str) -> ServerMessage {
        ServerMessage::GlobalChat(ChatMessage {
            player_id: "p1".to_string(),
            player_name: "Ala".to_string(),
            message: text.to_string(),
            timestamp: "2024-01-01T00:00:00.000Z".to_string(),
            clan_id: None,
        })
    }

    #[tokio::test]
    async fn test_connection_creation_and_removal() {
        let manager = ConnectionManager::new();
        let conn_id = ConnectionId::new();

        // Create connection
        let _receiver = manager.create_connection(conn_id).await;
        assert_eq!(manager.connection_count().await, 1);

        // Remove connection
        manager.remove_connection(conn_id).await;
        assert_eq!(manager.connection_count().await, 0);
    }

    #[tokio::test]
    async fn test_rapid_connect_disconnect_cycles() {
        let manager = ConnectionManager::new();
        let mut connections = Vec::new();

        for _ in 0..100 {
            let conn_id = ConnectionId::new();
            let _receiver = manager.create_connection(conn_id).await;
            connections.push(conn_id);
        }

        assert_eq!(manager.connection_count().await, 100);

        for conn_id in connections {
            manager.remove_connection(conn_id).await;
        }

        assert_eq!(manager.connection_count().await, 0);
    }

    #[tokio::test]
    async fn test_message_sending_to_nonexistent_connection() {
        let manager = ConnectionManager::new();

        let result = manager
            .send_to_connection(ConnectionId::new(), chat("test"))
            .await;

        assert_eq!(result.unwrap_err(), "Connection not found");
    }

    #[tokio::test]
    async fn test_message_sending_after_connection_close() {
        let manager = ConnectionManager::new();
        let conn_id = ConnectionId::new();

        let receiver = manager.create_connection(conn_id).await;
        drop(receiver); // Close the receiver to simulate connection close

        let result = manager.send_to_connection(conn_id, chat("test")).await;

        assert_eq!(result.unwrap_err(), "Connection closed");
    }

    #[tokio::test]
    async fn test_global_publish_skips_closed_connections() {
        let manager = ConnectionManager::new();
        let mut open = manager.create_connection(ConnectionId::new()).await;
        let closed = manager.create_connection(ConnectionId::new()).await;
        drop(closed);

        let delivered = manager.publish_global(chat("hello")).await;

        assert_eq!(delivered, 1);
        assert_eq!(open.try_recv().unwrap(), chat("hello"));
    }

    #[tokio::test]
    async fn test_group_publish_reaches_only_members() {
        let manager = ConnectionManager::new();
        let (smoki_a, smoki_b, other) = (ConnectionId::new(), ConnectionId::new(), ConnectionId::new());

        let mut rx_a = manager.create_connection(smoki_a).await;
        let mut rx_b = manager.create_connection(smoki_b).await;
        let mut rx_other = manager.create_connection(other).await;
        let mut rx_anonymous = manager.create_connection(ConnectionId::new()).await;

        manager.identify(smoki_a, "p1".to_string(), Some("smoki".to_string())).await;
        manager.set_group(smoki_b, Some("smoki".to_string())).await;
        manager.identify(other, "p3".to_string(), Some("wilki".to_string())).await;

        let delivered = manager.publish_to_group("smoki", chat("clan only")).await;

        assert_eq!(delivered, 2);
        assert_eq!(manager.group_size("smoki").await, 2);
        assert!(rx_a.try_recv().is_ok());
        assert!(rx_b.try_recv().is_ok());
        assert!(rx_other.try_recv().is_err());
        assert!(rx_anonymous.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_changing_group_moves_delivery() {
        let manager = ConnectionManager::new();
        let conn_id = ConnectionId::new();
        let mut rx = manager.create_connection(conn_id).await;

        manager.set_group(conn_id, Some("smoki".to_string())).await;
        manager.set_group(conn_id, Some("wilki".to_string())).await;

        assert_eq!(manager.publish_to_group("smoki", chat("old")).await, 0);
        assert_eq!(manager.publish_to_group("wilki", chat("new")).await, 1);
        assert_eq!(rx.try_recv().unwrap(), chat("new"));
    }

    #[tokio::test]
    async fn test_concurrent_connection_operations() {
        let manager = std::sync::Arc::new(ConnectionManager::new());
        let mut handles = Vec::new();

        // Spawn 50 concurrent tasks creating, identifying and removing connections
        for i in 0..50 {
            let manager_clone = manager.clone();
            let handle = tokio::spawn(async move {
                let conn_id = ConnectionId::new();
                let _receiver = manager_clone.create_connection(conn_id).await;

                tokio::time::sleep(Duration::from_millis(1)).await;

                manager_clone
                    .identify(conn_id, format!("player_{}", i), Some("smoki".to_string()))
                    .await;
                manager_clone.publish_to_group("smoki", chat("ping")).await;
                manager_clone.remove_connection(conn_id).await;
            });
            handles.push(handle);
        }

        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(manager.connection_count().await, 0);
        assert_eq!(manager.group_size("smoki").await, 0);
    }
}
