pub mod api;
pub mod config;
pub mod events;
pub mod local_cache;
pub mod realtime;
pub mod reconciler;
pub mod session;
pub mod social;

use std::sync::Arc;

use rand::SeedableRng;
use rand::rngs::StdRng;
use thiserror::Error;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::info;

use clicker_core::{Simulation, SimulationConfig};
use clicker_types::PlayerState;

pub use api::{ApiClient, ApiError};
pub use config::{ClientConfig, Timers};
pub use events::{ChatScope, ClientEvent};
pub use local_cache::{CacheError, Identity, LocalCache};
pub use realtime::{ConnectionState, RealtimeClient, TransportError};
pub use reconciler::{LoadedState, Reconciler, SaveOutcome, StateSource};
pub use session::{Session, SessionError, SessionHandle, StateSaver};
pub use social::Social;

const EVENT_BUFFER: usize = 256;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error(transparent)]
    Cache(#[from] CacheError),

    #[error(transparent)]
    Api(#[from] ApiError),

    #[error(transparent)]
    Session(#[from] SessionError),
}

/// A running client: loaded state, economy timers, and the server link.
pub struct GameClient {
    session: Session,
    social: Arc<Social>,
    events: broadcast::Sender<ClientEvent>,
    source: StateSource,
    background: Vec<JoinHandle<()>>,
}

impl GameClient {
    pub async fn start(config: ClientConfig) -> Result<Self, ClientError> {
        let cache = LocalCache::new(config.cache_dir.clone());
        let identity = cache.load_or_create_identity(&config.player_name).await?;
        let api = ApiClient::new(config.api_base.clone(), config.request_timeout)?;
        let reconciler = Reconciler::new(api.clone(), cache, identity.clone());

        let LoadedState { state, source } = reconciler.load().await;
        info!(
            "Playing as {} ({}), state from {:?}",
            identity.player_name, identity.player_id, source
        );
        let clan = state.player_clan.clone();

        let (events, _) = broadcast::channel(EVENT_BUFFER);
        let simulation = Simulation::new(
            state,
            StdRng::from_entropy(),
            SimulationConfig {
                breakable_lifetime: config.timers.breakable_lifetime,
                ..SimulationConfig::default()
            },
        );
        let session = Session::start(
            simulation,
            config.timers.clone(),
            Arc::new(reconciler),
            events.clone(),
        );

        let (realtime, inbound) = RealtimeClient::connect(
            config.ws_url.clone(),
            Social::identify_message(&identity, clan.clone()),
            config.reconnect_delay,
        );
        let social = Arc::new(Social::new(api, realtime, session.handle(), identity, clan));
        let background = vec![
            social.spawn_inbound(inbound),
            social.spawn_connection_watch(),
        ];

        let handle = session.handle();
        handle.notify(match source {
            StateSource::Server => "Stan gry załadowany z serwera!",
            StateSource::Cache => "Błąd ładowania gry, używam lokalnego zapisu",
            StateSource::Fresh => "Tworzenie nowej gry...",
        });

        Ok(Self {
            session,
            social,
            events,
            source,
            background,
        })
    }

    pub fn session(&self) -> SessionHandle {
        self.session.handle()
    }

    pub fn social(&self) -> Arc<Social> {
        self.social.clone()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ClientEvent> {
        self.events.subscribe()
    }

    pub fn source(&self) -> StateSource {
        self.source
    }

    /// Closes the socket, stops the timers and saves one last time.
    pub async fn shutdown(self) -> Result<PlayerState, ClientError> {
        self.social.shutdown().await;
        for task in &self.background {
            task.abort();
        }
        Ok(self.session.shutdown().await?)
    }
}
