#![allow(dead_code)]

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use clicker_client::{ApiClient, ClientConfig, ClientEvent, Identity, LocalCache, Timers};
use clicker_persistence::{DatabaseManager, connection::connect_to_memory_database};
use clicker_server::websocket::ConnectionManager;
use clicker_server::websocket::rate_limiter::RateLimit;
use clicker_server::{Repositories, UploadSettings, create_routes};
use migration::{Migrator, MigratorTrait};
use tokio::sync::broadcast;
use uuid::Uuid;

/// A real server on an ephemeral port, backed by an in-memory database.
pub struct TestServer {
    pub addr: SocketAddr,
    pub connection_manager: Arc<ConnectionManager>,
    pub repositories: Repositories,
}

impl TestServer {
    pub async fn start() -> Self {
        let db = connect_to_memory_database().await.unwrap();
        Migrator::up(&db, None).await.unwrap();
        let database = DatabaseManager::from_connection(db);

        let connection_manager = Arc::new(ConnectionManager::new());
        let repositories = Repositories::new(&database);
        let routes = create_routes(
            connection_manager.clone(),
            repositories.clone(),
            UploadSettings {
                dir: std::env::temp_dir().join(format!("clicker-client-uploads-{}", Uuid::new_v4())),
                max_bytes: 64 * 1024,
            },
            RateLimit::default(),
        );

        let (addr, server) = warp::serve(routes).bind_ephemeral(([127, 0, 0, 1], 0));
        tokio::spawn(server);

        Self {
            addr,
            connection_manager,
            repositories,
        }
    }

    pub fn api_base(&self) -> String {
        format!("http://{}/api", self.addr)
    }

    pub fn ws_url(&self) -> String {
        format!("ws://{}/ws", self.addr)
    }

    pub fn api(&self) -> ApiClient {
        ApiClient::new(self.api_base(), Duration::from_secs(5)).unwrap()
    }
}

/// An address nothing is listening on.
pub async fn dead_addr() -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    addr
}

pub fn temp_cache() -> LocalCache {
    LocalCache::new(std::env::temp_dir().join(format!("clicker-client-cache-{}", Uuid::new_v4())))
}

pub fn identity(player_id: &str, player_name: &str) -> Identity {
    Identity {
        player_id: player_id.to_string(),
        player_name: player_name.to_string(),
    }
}

/// Client config with quick reconnects; timers left at their real values.
pub fn test_config(api_base: String, ws_url: String, cache: &LocalCache) -> ClientConfig {
    ClientConfig {
        api_base,
        ws_url,
        cache_dir: cache.dir().to_path_buf(),
        player_name: "Tester".to_string(),
        reconnect_delay: Duration::from_millis(200),
        request_timeout: Duration::from_secs(5),
        timers: Timers::default(),
    }
}

/// Polls `check` until it returns true or a couple of seconds pass.
pub async fn wait_until<F, Fut>(what: &str, mut check: F)
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    for _ in 0..200 {
        if check().await {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("Timed out waiting for {}", what);
}

/// Next event matching `predicate`, skipping the rest.
pub async fn next_event(
    events: &mut broadcast::Receiver<ClientEvent>,
    predicate: impl Fn(&ClientEvent) -> bool,
) -> ClientEvent {
    tokio::time::timeout(Duration::from_secs(3), async {
        loop {
            match events.recv().await {
                Ok(event) if predicate(&event) => return event,
                Ok(_) | Err(broadcast::error::RecvError::Lagged(_)) => continue,
                Err(broadcast::error::RecvError::Closed) => panic!("Event stream closed"),
            }
        }
    })
    .await
    .expect("Timed out waiting for event")
}
