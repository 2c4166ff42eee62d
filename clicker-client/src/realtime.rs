use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use futures_util::{Sink, SinkExt, StreamExt};
use thiserror::Error;
use tokio::net::TcpStream;
use tokio::sync::{Mutex, mpsc, watch};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tracing::{debug, info, warn};

use clicker_types::{ClientMessage, Identify, ServerMessage};

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Connecting,
    Open,
    Closed,
}

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("Not connected to the server")]
    NotConnected,

    #[error("Transport has shut down")]
    Closed,
}

/// Why a live session ended.
#[derive(Debug, PartialEq, Eq)]
enum SessionEnd {
    Dropped,
    Shutdown,
}

/// Socket to the server that keeps reconnecting until shut down.
///
/// Every `Closed` schedules exactly one new attempt after the fixed
/// reconnect delay; there is no backoff and no retry cap. Outbound messages
/// are only accepted while `Open` and anything still queued when the socket
/// drops is discarded.
pub struct RealtimeClient {
    state: watch::Receiver<ConnectionState>,
    outbound: mpsc::UnboundedSender<ClientMessage>,
    identity: watch::Sender<Identify>,
    shutdown: watch::Sender<bool>,
    attempts: Arc<AtomicUsize>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl RealtimeClient {
    /// Spawns the connection task. Server messages arrive on the returned receiver.
    pub fn connect(
        url: impl Into<String>,
        identity: Identify,
        reconnect_delay: Duration,
    ) -> (Self, mpsc::UnboundedReceiver<ServerMessage>) {
        let (state_tx, state_rx) = watch::channel(ConnectionState::Connecting);
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        let (inbound_tx, inbound_rx) = mpsc::unbounded_channel();
        let (identity_tx, identity_rx) = watch::channel(identity);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let attempts = Arc::new(AtomicUsize::new(0));

        let worker = Worker {
            url: url.into(),
            reconnect_delay,
            state: state_tx,
            outbound: outbound_rx,
            inbound: inbound_tx,
            identity: identity_rx,
            shutdown: shutdown_rx,
            attempts: attempts.clone(),
        };
        let task = tokio::spawn(worker.run());

        let client = Self {
            state: state_rx,
            outbound: outbound_tx,
            identity: identity_tx,
            shutdown: shutdown_tx,
            attempts,
            task: Mutex::new(Some(task)),
        };
        (client, inbound_rx)
    }

    pub fn state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    pub fn subscribe_state(&self) -> watch::Receiver<ConnectionState> {
        self.state.clone()
    }

    pub fn is_open(&self) -> bool {
        self.state() == ConnectionState::Open
    }

    /// Connection attempts made so far, the first one included.
    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }

    pub fn send(&self, message: ClientMessage) -> Result<(), TransportError> {
        if !self.is_open() {
            return Err(TransportError::NotConnected);
        }
        self.outbound
            .send(message)
            .map_err(|_| TransportError::Closed)
    }

    /// Re-announces who we are; sent now if open and on every later open.
    pub fn set_identity(&self, identity: Identify) {
        self.identity.send_replace(identity);
    }

    /// Stops reconnecting, closes the socket and waits for the task to end.
    pub async fn shutdown(&self) {
        self.shutdown.send_replace(true);
        let Some(task) = self.task.lock().await.take() else {
            return;
        };
        if let Err(e) = task.await {
            warn!("Realtime task ended abnormally: {}", e);
        }
    }
}

struct Worker {
    url: String,
    reconnect_delay: Duration,
    state: watch::Sender<ConnectionState>,
    outbound: mpsc::UnboundedReceiver<ClientMessage>,
    inbound: mpsc::UnboundedSender<ServerMessage>,
    identity: watch::Receiver<Identify>,
    shutdown: watch::Receiver<bool>,
    attempts: Arc<AtomicUsize>,
}

impl Worker {
    async fn run(mut self) {
        loop {
            if *self.shutdown.borrow() {
                break;
            }

            self.state.send_replace(ConnectionState::Connecting);
            let attempt = self.attempts.fetch_add(1, Ordering::SeqCst) + 1;
            debug!("Connecting to {} (attempt {})", self.url, attempt);

            let connected = tokio::select! {
                result = connect_async(self.url.as_str()) => result,
                _ = self.shutdown.changed() => break,
            };

            match connected {
                Ok((socket, _)) => {
                    info!("Connected to {}", self.url);
                    self.state.send_replace(ConnectionState::Open);
                    if self.session(socket).await == SessionEnd::Shutdown {
                        break;
                    }
                    info!("Disconnected from {}", self.url);
                }
                Err(e) => warn!("Could not connect to {}: {}", self.url, e),
            }

            self.state.send_replace(ConnectionState::Closed);
            let mut discarded = 0;
            while self.outbound.try_recv().is_ok() {
                discarded += 1;
            }
            if discarded > 0 {
                warn!("Discarded {} messages queued on a dead connection", discarded);
            }

            info!("Reconnecting in {:?}", self.reconnect_delay);
            tokio::select! {
                _ = tokio::time::sleep(self.reconnect_delay) => {}
                _ = self.shutdown.changed() => break,
            }
        }

        self.state.send_replace(ConnectionState::Closed);
        debug!("Realtime task for {} stopped", self.url);
    }

    async fn session(&mut self, socket: Socket) -> SessionEnd {
        let (mut write, mut read) = socket.split();

        let hello = ClientMessage::Identify(self.identity.borrow_and_update().clone());
        if let Err(e) = send_envelope(&mut write, &hello).await {
            warn!("Could not identify: {}", e);
            return SessionEnd::Dropped;
        }

        loop {
            tokio::select! {
                incoming = read.next() => match incoming {
                    Some(Ok(Message::Close(_))) | None => return SessionEnd::Dropped,
                    Some(Ok(message)) if message.is_text() => match message.to_text() {
                        Ok(text) => self.deliver(text),
                        Err(e) => warn!("Dropping unreadable frame: {}", e),
                    },
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        warn!("WebSocket error: {}", e);
                        return SessionEnd::Dropped;
                    }
                },
                outgoing = self.outbound.recv() => match outgoing {
                    Some(message) => {
                        if let Err(e) = send_envelope(&mut write, &message).await {
                            warn!("Send failed: {}", e);
                            return SessionEnd::Dropped;
                        }
                    }
                    None => return SessionEnd::Shutdown,
                },
                changed = self.identity.changed() => {
                    if changed.is_err() {
                        return SessionEnd::Shutdown;
                    }
                    let identify = ClientMessage::Identify(self.identity.borrow_and_update().clone());
                    if let Err(e) = send_envelope(&mut write, &identify).await {
                        warn!("Could not re-identify: {}", e);
                        return SessionEnd::Dropped;
                    }
                }
                _ = self.shutdown.changed() => {
                    if let Err(e) = write.close().await {
                        debug!("Close handshake failed: {}", e);
                    }
                    return SessionEnd::Shutdown;
                }
            }
        }
    }

    fn deliver(&self, text: &str) {
        match serde_json::from_str::<ServerMessage>(text) {
            Ok(message) => {
                if self.inbound.send(message).is_err() {
                    debug!("Nobody is listening for server messages");
                }
            }
            Err(e) => warn!("Dropping malformed server message: {}", e),
        }
    }
}

async fn send_envelope<S>(write: &mut S, message: &ClientMessage) -> Result<(), String>
where
    S: Sink<Message> + Unpin,
    S::Error: std::fmt::Display,
{
    let json = serde_json::to_string(message).map_err(|e| e.to_string())?;
    write
        .send(Message::text(json))
        .await
        .map_err(|e| e.to_string())
}
