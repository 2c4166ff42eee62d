use std::time::Duration;

use reqwest::{Client, Response};
use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::{debug, warn};

use clicker_types::{
    Clan, ClanResponse, CreateClanRequest, ErrorBody, HistoryEntry, JoinClanRequest, PlayerState,
    SaveAck, Trade, TradeDraft, TradeResponse, TradeStatus, TradeStatusRequest,
};

#[derive(Debug, Error)]
pub enum ApiError {
    /// The server could not be reached at all: refused, timed out, DNS.
    #[error("Network error: {0}")]
    Network(#[source] reqwest::Error),

    #[error("Server returned {status}: {message}")]
    Status { status: u16, message: String },

    #[error("Could not decode server response: {0}")]
    Decode(#[source] reqwest::Error),

    #[error("{0}")]
    Validation(String),
}

impl ApiError {
    pub fn is_network(&self) -> bool {
        matches!(self, ApiError::Network(_))
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Thin typed wrapper over the game's HTTP API.
#[derive(Debug, Clone)]
pub struct ApiClient {
    client: Client,
    base: String,
}

impl ApiClient {
    pub fn new(base: impl Into<String>, timeout: Duration) -> Result<Self, ApiError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(ApiError::Network)?;

        Ok(Self {
            client,
            base: base.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn base(&self) -> &str {
        &self.base
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base, path)
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        debug!("GET {}", path);
        let response = self
            .client
            .get(self.url(path))
            .send()
            .await
            .map_err(ApiError::Network)?;
        decode(response).await
    }

    async fn post<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        debug!("POST {}", path);
        let response = self
            .client
            .post(self.url(path))
            .json(body)
            .send()
            .await
            .map_err(ApiError::Network)?;
        decode(response).await
    }

    pub async fn load_game(&self, player_id: &str) -> Result<PlayerState, ApiError> {
        self.get(&format!("game/{}", player_id)).await
    }

    pub async fn save_game(&self, state: &PlayerState) -> Result<SaveAck, ApiError> {
        if state.player_id.is_empty() {
            return Err(ApiError::Validation("Cannot save a game without a player id".to_string()));
        }
        self.post(&format!("game/{}", state.player_id), state).await
    }

    pub async fn history(&self, player_id: &str) -> Result<Vec<HistoryEntry>, ApiError> {
        self.get(&format!("history/{}", player_id)).await
    }

    pub async fn list_clans(&self) -> Result<Vec<Clan>, ApiError> {
        self.get("clans").await
    }

    pub async fn create_clan(
        &self,
        name: &str,
        player_id: &str,
        player_name: &str,
    ) -> Result<Clan, ApiError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(ApiError::Validation("Clan name cannot be empty".to_string()));
        }

        let request = CreateClanRequest {
            name: name.to_string(),
            player_id: player_id.to_string(),
            player_name: player_name.to_string(),
        };
        let response: ClanResponse = self.post("clans", &request).await?;
        Ok(response.clan)
    }

    pub async fn join_clan(
        &self,
        clan_id: &str,
        player_id: &str,
        player_name: &str,
    ) -> Result<Clan, ApiError> {
        let request = JoinClanRequest {
            player_id: player_id.to_string(),
            player_name: player_name.to_string(),
        };
        let response: ClanResponse = self
            .post(&format!("clans/{}/join", clan_id), &request)
            .await?;
        Ok(response.clan)
    }

    pub async fn list_trades(&self) -> Result<Vec<Trade>, ApiError> {
        self.get("trades").await
    }

    pub async fn create_trade(&self, draft: &TradeDraft) -> Result<Trade, ApiError> {
        let response: TradeResponse = self.post("trades", draft).await?;
        Ok(response.trade)
    }

    pub async fn update_trade_status(
        &self,
        trade_id: &str,
        status: TradeStatus,
    ) -> Result<Trade, ApiError> {
        let response: TradeResponse = self
            .post(
                &format!("trades/{}/status", trade_id),
                &TradeStatusRequest { status },
            )
            .await?;
        Ok(response.trade)
    }
}

async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, ApiError> {
    let status = response.status();
    if !status.is_success() {
        let message = match response.json::<ErrorBody>().await {
            Ok(body) => body.message,
            Err(_) => status.canonical_reason().unwrap_or("Unknown error").to_string(),
        };
        warn!("Request failed with {}: {}", status, message);
        return Err(ApiError::Status {
            status: status.as_u16(),
            message,
        });
    }

    response.json().await.map_err(ApiError::Decode)
}
