use std::io;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

use clicker_types::{PlayerId, PlayerState};

const IDENTITY_FILE: &str = "identity.json";
const STATE_FILE: &str = "state.json";

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("Cache I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Cache file is corrupt: {0}")]
    Corrupt(#[from] serde_json::Error),
}

/// Who this client plays as. Invented once, then reused on every run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Identity {
    pub player_id: PlayerId,
    pub player_name: String,
}

impl Identity {
    pub fn invent(player_name: &str, now_millis: i64) -> Self {
        Self {
            player_id: format!("player_{}", now_millis),
            player_name: player_name.to_string(),
        }
    }
}

/// On-disk fallback used only while the server is unreachable.
#[derive(Debug, Clone)]
pub struct LocalCache {
    dir: PathBuf,
}

impl LocalCache {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub async fn load_identity(&self) -> Result<Option<Identity>, CacheError> {
        self.read_json(IDENTITY_FILE).await
    }

    pub async fn save_identity(&self, identity: &Identity) -> Result<(), CacheError> {
        self.write_json(IDENTITY_FILE, identity).await
    }

    /// Returns the stored identity, inventing and storing one on first run.
    pub async fn load_or_create_identity(&self, player_name: &str) -> Result<Identity, CacheError> {
        if let Some(identity) = self.load_identity().await? {
            return Ok(identity);
        }

        let identity = Identity::invent(player_name, chrono::Utc::now().timestamp_millis());
        self.save_identity(&identity).await?;
        info!("Created new identity {}", identity.player_id);
        Ok(identity)
    }

    pub async fn load_state(&self) -> Result<Option<PlayerState>, CacheError> {
        self.read_json(STATE_FILE).await
    }

    pub async fn save_state(&self, state: &PlayerState) -> Result<(), CacheError> {
        self.write_json(STATE_FILE, state).await
    }

    async fn read_json<T: DeserializeOwned>(&self, name: &str) -> Result<Option<T>, CacheError> {
        match tokio::fs::read(self.dir.join(name)).await {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Writes through a temp file so a crash never leaves half a document.
    async fn write_json<T: Serialize>(&self, name: &str, value: &T) -> Result<(), CacheError> {
        tokio::fs::create_dir_all(&self.dir).await?;

        let bytes = serde_json::to_vec_pretty(value)?;
        let target = self.dir.join(name);
        let temp = self.dir.join(format!("{}.tmp", name));

        tokio::fs::write(&temp, &bytes).await?;
        if let Err(e) = tokio::fs::rename(&temp, &target).await {
            warn!("Could not move {} into place: {}", temp.display(), e);
            return Err(e.into());
        }
        Ok(())
    }
}
