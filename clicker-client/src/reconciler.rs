use async_trait::async_trait;
use tracing::{info, warn};

use clicker_core::timestamp_now;
use clicker_types::{PlayerState, SaveAck};

use crate::api::{ApiClient, ApiError};
use crate::local_cache::{Identity, LocalCache};
use crate::session::StateSaver;

/// Where the state a session starts from came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateSource {
    Server,
    /// Server unreachable, last locally cached save used.
    Cache,
    /// Nothing usable anywhere, a new game was started.
    Fresh,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LoadedState {
    pub state: PlayerState,
    pub source: StateSource,
}

#[derive(Debug)]
pub enum SaveOutcome {
    Server(SaveAck),
    /// Server unreachable; written to the local cache instead.
    Cached,
    Failed(ApiError),
}

/// Moves player state between the server, the local cache and the session.
///
/// The cache is a fallback only: it is read when the server cannot be
/// reached at startup and written when a save fails for the same reason.
/// It is never pushed back to the server on its own.
#[derive(Debug, Clone)]
pub struct Reconciler {
    api: ApiClient,
    cache: LocalCache,
    identity: Identity,
}

impl Reconciler {
    pub fn new(api: ApiClient, cache: LocalCache, identity: Identity) -> Self {
        Self {
            api,
            cache,
            identity,
        }
    }

    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    /// The identity stored on this machine always wins over what a document says.
    pub fn merge_identity(&self, mut state: PlayerState) -> PlayerState {
        state.player_id = self.identity.player_id.clone();
        state.player_name = self.identity.player_name.clone();
        state
    }

    fn fresh(&self) -> PlayerState {
        let state = PlayerState::new_game(self.identity.player_id.clone(), &timestamp_now());
        self.merge_identity(state)
    }

    pub async fn load(&self) -> LoadedState {
        match self.api.load_game(&self.identity.player_id).await {
            Ok(state) => {
                info!("Loaded game for {} from server", self.identity.player_id);
                LoadedState {
                    state: self.merge_identity(state),
                    source: StateSource::Server,
                }
            }
            Err(e) if e.is_network() => {
                warn!("Server unreachable ({}), trying local cache", e);
                self.load_cached().await
            }
            Err(e) => {
                warn!("Server refused to load game ({}), starting a new one", e);
                LoadedState {
                    state: self.fresh(),
                    source: StateSource::Fresh,
                }
            }
        }
    }

    async fn load_cached(&self) -> LoadedState {
        match self.cache.load_state().await {
            Ok(Some(state)) => LoadedState {
                state: self.merge_identity(state),
                source: StateSource::Cache,
            },
            Ok(None) => LoadedState {
                state: self.fresh(),
                source: StateSource::Fresh,
            },
            Err(e) => {
                warn!("Ignoring unreadable local cache: {}", e);
                LoadedState {
                    state: self.fresh(),
                    source: StateSource::Fresh,
                }
            }
        }
    }

    pub async fn save_state(&self, state: &PlayerState) -> SaveOutcome {
        match self.api.save_game(state).await {
            Ok(ack) => SaveOutcome::Server(ack),
            Err(e) if e.is_network() => {
                warn!("Save failed ({}), writing local cache", e);
                match self.cache.save_state(state).await {
                    Ok(()) => SaveOutcome::Cached,
                    Err(cache_error) => {
                        warn!("Local cache write failed too: {}", cache_error);
                        SaveOutcome::Failed(e)
                    }
                }
            }
            Err(e) => {
                warn!("Server rejected save: {}", e);
                SaveOutcome::Failed(e)
            }
        }
    }
}

#[async_trait]
impl StateSaver for Reconciler {
    async fn save(&self, state: PlayerState) {
        if let SaveOutcome::Server(ack) = self.save_state(&state).await {
            info!("Game saved at {}", ack.last_saved);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn reconciler() -> Reconciler {
        Reconciler::new(
            ApiClient::new("http://127.0.0.1:9/api", Duration::from_millis(200)).unwrap(),
            LocalCache::new(std::env::temp_dir().join(format!("clicker-rec-{}", uuid::Uuid::new_v4()))),
            Identity {
                player_id: "player_1".to_string(),
                player_name: "Ala".to_string(),
            },
        )
    }

    #[test]
    fn test_merge_keeps_local_identity() {
        let mut remote = PlayerState::new_game("someone_else", "now");
        remote.player_name = String::new();
        remote.money = 10;

        let merged = reconciler().merge_identity(remote);

        assert_eq!(merged.player_id, "player_1");
        assert_eq!(merged.player_name, "Ala");
        assert_eq!(merged.money, 10);
    }

    #[tokio::test]
    async fn test_unreachable_server_without_cache_starts_fresh() {
        let loaded = reconciler().load().await;

        assert_eq!(loaded.source, StateSource::Fresh);
        assert_eq!(loaded.state.pets.len(), 1);
        assert_eq!(loaded.state.player_name, "Ala");
    }
}
