use chrono::Utc;
use tracing::info;

use super::{iso_timestamp, iso_timestamp_rounded_up};
use crate::error::StoreError;
use crate::store::{Collection, DocumentStore};
use clicker_types::{HistoryEntry, PlayerState};

/// One row per player; saves never touch another player's row.
#[derive(Clone)]
pub struct GameRepository {
    store: DocumentStore,
}

impl GameRepository {
    pub fn new(store: DocumentStore) -> Self {
        Self { store }
    }

    /// The player's saved game, lazily creating the starter game on first access.
    pub async fn load_or_create(&self, player_id: &str) -> Result<PlayerState, StoreError> {
        self.store
            .get_or_insert_with(Collection::Games, player_id, || {
                info!("Creating new game for {}", player_id);
                PlayerState::new_game(player_id, &iso_timestamp(Utc::now()))
            })
            .await
    }

    pub async fn find(&self, player_id: &str) -> Result<Option<PlayerState>, StoreError> {
        Ok(self
            .store
            .get(Collection::Games, player_id)
            .await?
            .map(|stored| stored.value))
    }

    /// Replaces the player's game wholesale and stamps `lastSaved`.
    /// Returns the stamp.
    pub async fn save(&self, player_id: &str, mut state: PlayerState) -> Result<String, StoreError> {
        let last_saved = iso_timestamp_rounded_up(Utc::now());
        state.last_saved = last_saved.clone();

        self.store.put(Collection::Games, player_id, &state).await?;
        Ok(last_saved)
    }

    pub async fn history(&self, player_id: &str) -> Result<Vec<HistoryEntry>, StoreError> {
        self.find(player_id)
            .await?
            .map(|state| state.game_history)
            .ok_or_else(|| StoreError::NotFound(format!("Player {}", player_id)))
    }
}
