use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::{ChatMessage, ClanId, PlayerId, Trade};

/// Envelopes a client sends over the socket, `{type, payload}` on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(tag = "type", content = "payload", rename_all = "SCREAMING_SNAKE_CASE")]
#[ts(export)]
pub enum ClientMessage {
    /// Relayed to everyone as `TRADE_UPDATE`.
    TradeOffer(serde_json::Value),
    /// Relayed to the sender's clan as `CLAN_CHAT`.
    ClanMessage(ChatMessage),
    /// Relayed to everyone as `GLOBAL_CHAT`.
    GlobalMessage(ChatMessage),
    /// Registers which player and clan the connection belongs to.
    Identify(Identify),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Identify {
    pub player_id: PlayerId,
    #[serde(default)]
    pub clan_id: Option<ClanId>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(tag = "type", content = "payload", rename_all = "SCREAMING_SNAKE_CASE")]
#[ts(export)]
pub enum ServerMessage {
    NewTrade(Trade),
    TradeUpdate(serde_json::Value),
    ClanChat(ChatMessage),
    GlobalChat(ChatMessage),
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

    #[test]
    fn test_client_envelope_shape() {
        let json = serde_json::to_value(ClientMessage::ClanMessage(chat(Some("c1")))).unwrap();
        assert_eq!(json["type"], "CLAN_MESSAGE");
        assert_eq!(json["payload"]["clanId"], "c1");
        assert_eq!(json["payload"]["playerName"], "Ala");
    }

    #[test]
    fn test_parses_reference_client_envelope() {
        let raw = r#"{"type":"GLOBAL_MESSAGE","payload":{"playerId":"p1","playerName":"Ala","message":"hej","timestamp":"2024-01-01T00:00:00.000Z","clanId":null}}"#;
        let message: ClientMessage = serde_json::from_str(raw).unwrap();
        assert_eq!(message, ClientMessage::GlobalMessage(chat(None)));
    }

    #[test]
    fn test_trade_offer_payload_is_opaque() {
        let raw = r#"{"type":"TRADE_OFFER","payload":{"anything":[1,2,3]}}"#;
        let message: ClientMessage = serde_json::from_str(raw).unwrap();
        assert_eq!(
            message,
            ClientMessage::TradeOffer(serde_json::json!({"anything": [1, 2, 3]}))
        );
    }

    #[test]
    fn test_unknown_type_is_rejected() {
        let raw = r#"{"type":"SELF_DESTRUCT","payload":{}}"#;
        assert!(serde_json::from_str::<ClientMessage>(raw).is_err());
    }

    #[test]
    fn test_server_envelope_shape() {
        let json = serde_json::to_value(ServerMessage::GlobalChat(chat(None))).unwrap();
        assert_eq!(json["type"], "GLOBAL_CHAT");
        assert_eq!(json["payload"]["message"], "hej");
    }
}
