use std::sync::Arc;

use tokio::sync::{RwLock, mpsc};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use clicker_core::timestamp_now;
use clicker_types::{
    ChatMessage, Clan, ClanId, ClientMessage, Identify, ServerMessage, Trade, TradeDraft,
    TradeStatus,
};

use crate::api::{ApiClient, ApiError};
use crate::events::{ChatScope, ClientEvent};
use crate::local_cache::Identity;
use crate::realtime::{ConnectionState, RealtimeClient, TransportError};
use crate::session::SessionHandle;

/// Clans, trades and chat: everything that goes through the server rather
/// than the local economy.
pub struct Social {
    api: ApiClient,
    realtime: RealtimeClient,
    session: SessionHandle,
    identity: Identity,
    clan: RwLock<Option<ClanId>>,
    clans: RwLock<Vec<Clan>>,
    trades: RwLock<Vec<Trade>>,
}

impl Social {
    pub fn new(
        api: ApiClient,
        realtime: RealtimeClient,
        session: SessionHandle,
        identity: Identity,
        clan: Option<ClanId>,
    ) -> Self {
        Self {
            api,
            realtime,
            session,
            identity,
            clan: RwLock::new(clan),
            clans: RwLock::new(Vec::new()),
            trades: RwLock::new(Vec::new()),
        }
    }

    pub fn realtime(&self) -> &RealtimeClient {
        &self.realtime
    }

    pub async fn clan_id(&self) -> Option<ClanId> {
        self.clan.read().await.clone()
    }

    pub async fn clans(&self) -> Vec<Clan> {
        self.clans.read().await.clone()
    }

    pub async fn trades(&self) -> Vec<Trade> {
        self.trades.read().await.clone()
    }

    pub fn identify_message(identity: &Identity, clan: Option<ClanId>) -> Identify {
        Identify {
            player_id: identity.player_id.clone(),
            clan_id: clan,
        }
    }

    pub async fn create_clan(&self, name: &str) -> Result<Clan, ApiError> {
        let result = self
            .api
            .create_clan(name, &self.identity.player_id, &self.identity.player_name)
            .await;

        match result {
            Ok(clan) => {
                self.adopt_clan(&clan).await;
                self.session
                    .notify(format!("Stworzyłeś klan: {}!", clan.name));
                Ok(clan)
            }
            Err(e) => {
                let text = match &e {
                    ApiError::Validation(_) => "Nazwa klanu nie może być pusta!",
                    _ => "Błąd tworzenia klanu",
                };
                self.session.notify(text);
                Err(e)
            }
        }
    }

    pub async fn join_clan(&self, clan_id: &str) -> Result<Clan, ApiError> {
        let result = self
            .api
            .join_clan(clan_id, &self.identity.player_id, &self.identity.player_name)
            .await;

        match result {
            Ok(clan) => {
                self.adopt_clan(&clan).await;
                self.session
                    .notify(format!("Dołączyłeś do klanu: {}!", clan.name));
                Ok(clan)
            }
            Err(e) => {
                self.session.notify("Błąd dołączania do klanu");
                Err(e)
            }
        }
    }

    /// Records membership locally, saves, re-announces the group and refreshes the list.
    async fn adopt_clan(&self, clan: &Clan) {
        *self.clan.write().await = Some(clan.id.clone());

        if let Err(e) = self.session.set_clan(Some(clan.id.clone())).await {
            warn!("Could not record clan {} in session: {}", clan.id, e);
        }
        self.realtime
            .set_identity(Self::identify_message(&self.identity, Some(clan.id.clone())));

        if let Err(e) = self.refresh_clans().await {
            warn!("Could not refresh clans: {}", e);
        }
    }

    pub async fn refresh_clans(&self) -> Result<Vec<Clan>, ApiError> {
        let clans = self.api.list_clans().await?;
        *self.clans.write().await = clans.clone();
        self.session.publish(ClientEvent::ClansUpdated(clans.clone()));
        Ok(clans)
    }

    /// Reloads trades; only active ones are kept and reported.
    pub async fn refresh_trades(&self) -> Result<Vec<Trade>, ApiError> {
        let trades: Vec<Trade> = self
            .api
            .list_trades()
            .await?
            .into_iter()
            .filter(|trade| trade.status == TradeStatus::Active)
            .collect();

        *self.trades.write().await = trades.clone();
        self.session
            .publish(ClientEvent::TradesUpdated(trades.clone()));
        Ok(trades)
    }

    pub async fn post_trade(&self, mut draft: TradeDraft) -> Result<Trade, ApiError> {
        draft.player_id = self.identity.player_id.clone();
        draft.player_name = self.identity.player_name.clone();
        self.api.create_trade(&draft).await
    }

    pub async fn set_trade_status(
        &self,
        trade_id: &str,
        status: TradeStatus,
    ) -> Result<Trade, ApiError> {
        self.api.update_trade_status(trade_id, status).await
    }

    /// Pushes an offer to everyone connected without storing it.
    pub fn offer_trade(&self, payload: serde_json::Value) -> Result<(), TransportError> {
        self.realtime.send(ClientMessage::TradeOffer(payload))
    }

    pub async fn send_chat(
        &self,
        text: &str,
        scope: ChatScope,
    ) -> Result<ChatMessage, TransportError> {
        if !self.realtime.is_open() {
            self.session.notify("Nie jesteś połączony z serwerem");
            return Err(TransportError::NotConnected);
        }

        let message = ChatMessage {
            player_id: self.identity.player_id.clone(),
            player_name: self.identity.player_name.clone(),
            message: text.to_string(),
            timestamp: timestamp_now(),
            clan_id: self.clan_id().await,
        };
        let envelope = match scope {
            ChatScope::Clan => ClientMessage::ClanMessage(message.clone()),
            ChatScope::Global => ClientMessage::GlobalMessage(message.clone()),
        };

        self.realtime.send(envelope)?;
        self.session.publish(ClientEvent::Chat {
            scope,
            message: message.clone(),
        });
        Ok(message)
    }

    pub async fn handle_server_message(&self, message: ServerMessage) {
        match message {
            ServerMessage::NewTrade(trade) => {
                self.session
                    .notify(format!("Nowa oferta handlowa: {}", trade.player_name));
                self.refresh_trades_logged().await;
            }
            ServerMessage::TradeUpdate(_) => {
                self.session.notify("Aktualizacja handlu");
                self.refresh_trades_logged().await;
            }
            ServerMessage::ClanChat(message) => self.session.publish(ClientEvent::Chat {
                scope: ChatScope::Clan,
                message,
            }),
            ServerMessage::GlobalChat(message) => self.session.publish(ClientEvent::Chat {
                scope: ChatScope::Global,
                message,
            }),
        }
    }

    async fn refresh_trades_logged(&self) {
        if let Err(e) = self.refresh_trades().await {
            warn!("Could not refresh trades: {}", e);
        }
    }

    /// Feeds server pushes into `handle_server_message` until the transport goes away.
    pub fn spawn_inbound(
        self: &Arc<Self>,
        mut inbound: mpsc::UnboundedReceiver<ServerMessage>,
    ) -> JoinHandle<()> {
        let social = self.clone();
        tokio::spawn(async move {
            while let Some(message) = inbound.recv().await {
                social.handle_server_message(message).await;
            }
            debug!("Inbound stream ended");
        })
    }

    /// Reports connection changes as events and notifications.
    pub fn spawn_connection_watch(self: &Arc<Self>) -> JoinHandle<()> {
        let mut state = self.realtime.subscribe_state();
        let session = self.session.clone();
        tokio::spawn(async move {
            while state.changed().await.is_ok() {
                let current = *state.borrow_and_update();
                session.publish(ClientEvent::ConnectionChanged(current));
                match current {
                    ConnectionState::Open => {
                        info!("Online");
                        session.notify("Połączono z serwerem!");
                    }
                    ConnectionState::Closed => {
                        session.notify("Rozłączono z serwerem, próba ponownego połączenia...")
                    }
                    ConnectionState::Connecting => {}
                }
            }
        })
    }

    pub async fn shutdown(&self) {
        self.realtime.shutdown().await;
    }
}
