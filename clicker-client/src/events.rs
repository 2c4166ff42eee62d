use clicker_core::EconomyEvent;
use clicker_types::{ChatMessage, Clan, Trade};

use crate::realtime::ConnectionState;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatScope {
    Clan,
    Global,
}

/// Everything the client reports to whatever is presenting the game.
#[derive(Debug, Clone, PartialEq)]
pub enum ClientEvent {
    Economy(EconomyEvent),
    /// Short-lived, user-facing message.
    Notification(String),
    Chat {
        scope: ChatScope,
        message: ChatMessage,
    },
    /// Active trades only.
    TradesUpdated(Vec<Trade>),
    ClansUpdated(Vec<Clan>),
    ConnectionChanged(ConnectionState),
}

impl ClientEvent {
    pub fn notification(text: impl Into<String>) -> Self {
        ClientEvent::Notification(text.into())
    }
}
