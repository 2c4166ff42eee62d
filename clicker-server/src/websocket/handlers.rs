use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::websocket::connection::{Broadcaster, ConnectionId, ConnectionManager};
use clicker_types::{ChatMessage, ClientMessage, Identify, ServerMessage};

/// Dispatches one connection's envelopes to a delivery scope.
#[derive(Clone)]
pub struct MessageHandler {
    connection_id: ConnectionId,
    connection_manager: Arc<ConnectionManager>,
}

impl MessageHandler {
    pub fn new(connection_id: ConnectionId, connection_manager: Arc<ConnectionManager>) -> Self {
        Self {
            connection_id,
            connection_manager,
        }
    }

    pub async fn handle_message(&self, message: ClientMessage) {
        match message {
            ClientMessage::TradeOffer(payload) => self.handle_trade_offer(payload).await,
            ClientMessage::ClanMessage(chat) => self.handle_clan_message(chat).await,
            ClientMessage::GlobalMessage(chat) => self.handle_global_message(chat).await,
            ClientMessage::Identify(identify) => self.handle_identify(identify).await,
        }
    }

    pub async fn handle_disconnect(&self) {
        info!("Handling disconnect for connection {}", self.connection_id);
        self.connection_manager
            .remove_connection(self.connection_id)
            .await;
    }

    async fn handle_trade_offer(&self, payload: serde_json::Value) {
        let delivered = self
            .connection_manager
            .publish_global(ServerMessage::TradeUpdate(payload))
            .await;
        debug!(
            "Trade offer from {} relayed to {} connections",
            self.connection_id, delivered
        );
    }

    async fn handle_clan_message(&self, chat: ChatMessage) {
        let Some(clan_id) = chat.clan_id.clone() else {
            warn!(
                "Dropping clan message without clanId from {}",
                self.connection_id
            );
            return;
        };

        // Speaking in a clan implies belonging to it
        self.connection_manager
            .set_group(self.connection_id, Some(clan_id.clone()))
            .await;

        let delivered = self
            .connection_manager
            .publish_to_group(&clan_id, ServerMessage::ClanChat(chat))
            .await;
        debug!("Clan {} message reached {} connections", clan_id, delivered);
    }

    async fn handle_global_message(&self, chat: ChatMessage) {
        self.connection_manager
            .publish_global(ServerMessage::GlobalChat(chat))
            .await;
    }

    async fn handle_identify(&self, identify: Identify) {
        self.connection_manager
            .identify(self.connection_id, identify.player_id, identify.clan_id)
            .await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chat(clan_id: Option<&str>) -> ChatMessage {
        ChatMessage {
            player_id: "p1".to_string(),
            player_name: "Ala".to_string(),
            message: "hej".to_string(),
            timestamp: "2024-01-01T00:00:00.000Z".to_string(),
            clan_id: clan_id.map(str::to_string),
        }
    }

    async fn setup() -> (
        Arc<ConnectionManager>,
        MessageHandler,
        tokio::sync::mpsc::UnboundedReceiver<ServerMessage>,
    ) {
        let manager = Arc::new(ConnectionManager::new());
        let conn_id = ConnectionId::new();
        let receiver = manager.create_connection(conn_id).await;
        (manager.clone(), MessageHandler::new(conn_id, manager), receiver)
    }

    #[tokio::test]
    async fn test_trade_offer_is_relayed_as_trade_update() {
        let (_manager, handler, mut rx) = setup().await;
        let payload = serde_json::json!({"offerMoney": 10});

        handler
            .handle_message(ClientMessage::TradeOffer(payload.clone()))
            .await;

        assert_eq!(rx.try_recv().unwrap(), ServerMessage::TradeUpdate(payload));
    }

    #[tokio::test]
    async fn test_clan_message_joins_sender_to_group() {
        let (manager, handler, mut rx) = setup().await;

        handler
            .handle_message(ClientMessage::ClanMessage(chat(Some("smoki"))))
            .await;

        assert_eq!(manager.group_size("smoki").await, 1);
        assert_eq!(
            rx.try_recv().unwrap(),
            ServerMessage::ClanChat(chat(Some("smoki")))
        );
    }

    #[tokio::test]
    async fn test_clan_message_without_clan_is_dropped() {
        let (_manager, handler, mut rx) = setup().await;

        handler
            .handle_message(ClientMessage::ClanMessage(chat(None)))
            .await;

        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_identify_sets_group() {
        let (manager, handler, _rx) = setup().await;

        handler
            .handle_message(ClientMessage::Identify(Identify {
                player_id: "p1".to_string(),
                clan_id: Some("wilki".to_string()),
            }))
            .await;

        assert_eq!(manager.group_size("wilki").await, 1);
    }

    #[tokio::test]
    async fn test_disconnect_removes_connection() {
        let (manager, handler, _rx) = setup().await;
        handler.handle_disconnect().await;
        assert_eq!(manager.connection_count().await, 0);
    }
}
