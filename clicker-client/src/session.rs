use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{Interval, MissedTickBehavior, interval_at};
use tracing::{debug, info, warn};
use uuid::Uuid;

use clicker_core::{
    Breakable, BreakableId, DestroyOutcome, EconomyError, EconomyEvent, ItemUse, Simulation,
};
use clicker_types::{ClanId, Destroyer, PetId, PlayerState};

use crate::config::Timers;
use crate::events::ClientEvent;

/// Where snapshots go when the session asks for a save.
#[async_trait]
pub trait StateSaver: Send + Sync + 'static {
    async fn save(&self, state: PlayerState);
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Session has stopped")]
    Stopped,

    #[error(transparent)]
    Economy(#[from] EconomyError),
}

enum SessionCommand {
    Destroy {
        id: BreakableId,
        reply: oneshot::Sender<Result<DestroyOutcome, EconomyError>>,
    },
    BuyPet {
        reply: oneshot::Sender<Result<PetId, EconomyError>>,
    },
    UseItem {
        item_id: Uuid,
        reply: oneshot::Sender<Result<ItemUse, EconomyError>>,
    },
    SetClan {
        clan_id: Option<ClanId>,
        reply: oneshot::Sender<()>,
    },
    Snapshot {
        reply: oneshot::Sender<PlayerState>,
    },
    Breakables {
        reply: oneshot::Sender<Vec<Breakable>>,
    },
    SaveNow,
    Shutdown,
}

fn now() -> std::time::Instant {
    tokio::time::Instant::now().into_std()
}

fn every(period: Duration) -> Interval {
    let mut interval = interval_at(tokio::time::Instant::now() + period, period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    interval
}

/// Cheap handle to the running session actor.
#[derive(Clone)]
pub struct SessionHandle {
    commands: mpsc::UnboundedSender<SessionCommand>,
    events: broadcast::Sender<ClientEvent>,
}

/// The owner of the running session; dropping it without `shutdown` skips the final save.
pub struct Session {
    handle: SessionHandle,
    task: JoinHandle<PlayerState>,
}

impl Session {
    /// Spawns the actor that owns `simulation` and drives its timers.
    pub fn start(
        mut simulation: Simulation,
        timers: Timers,
        saver: Arc<dyn StateSaver>,
        events: broadcast::Sender<ClientEvent>,
    ) -> Self {
        let forward = events.clone();
        simulation
            .events_mut()
            .add_handler(Box::new(move |event: &EconomyEvent| {
                let _ = forward.send(ClientEvent::Economy(event.clone()));
            }));

        let (commands, command_rx) = mpsc::unbounded_channel();
        let (pet_done_tx, pet_done_rx) = mpsc::unbounded_channel();

        let actor = SessionActor {
            simulation,
            timers,
            saver,
            commands: command_rx,
            pet_done_tx,
            pet_done_rx,
            unaccounted_play: Duration::ZERO,
        };

        Self {
            handle: SessionHandle { commands, events },
            task: tokio::spawn(actor.run()),
        }
    }

    pub fn handle(&self) -> SessionHandle {
        self.handle.clone()
    }

    /// Stops the timers, performs one last save and returns the final state.
    pub async fn shutdown(self) -> Result<PlayerState, SessionError> {
        let _ = self.handle.commands.send(SessionCommand::Shutdown);
        self.task.await.map_err(|e| {
            warn!("Session task failed: {}", e);
            SessionError::Stopped
        })
    }
}

impl SessionHandle {
    pub fn subscribe(&self) -> broadcast::Receiver<ClientEvent> {
        self.events.subscribe()
    }

    pub fn notify(&self, text: impl Into<String>) {
        let _ = self.events.send(ClientEvent::notification(text));
    }

    pub fn publish(&self, event: ClientEvent) {
        let _ = self.events.send(event);
    }

    async fn request<T>(
        &self,
        command: impl FnOnce(oneshot::Sender<T>) -> SessionCommand,
    ) -> Result<T, SessionError> {
        let (reply, response) = oneshot::channel();
        self.commands
            .send(command(reply))
            .map_err(|_| SessionError::Stopped)?;
        response.await.map_err(|_| SessionError::Stopped)
    }

    pub async fn destroy(&self, id: BreakableId) -> Result<DestroyOutcome, SessionError> {
        Ok(self
            .request(|reply| SessionCommand::Destroy { id, reply })
            .await??)
    }

    pub async fn buy_pet(&self) -> Result<PetId, SessionError> {
        Ok(self
            .request(|reply| SessionCommand::BuyPet { reply })
            .await??)
    }

    pub async fn use_item(&self, item_id: Uuid) -> Result<ItemUse, SessionError> {
        Ok(self
            .request(|reply| SessionCommand::UseItem { item_id, reply })
            .await??)
    }

    pub async fn set_clan(&self, clan_id: Option<ClanId>) -> Result<(), SessionError> {
        self.request(|reply| SessionCommand::SetClan { clan_id, reply })
            .await
    }

    pub async fn snapshot(&self) -> Result<PlayerState, SessionError> {
        self.request(|reply| SessionCommand::Snapshot { reply }).await
    }

    pub async fn breakables(&self) -> Result<Vec<Breakable>, SessionError> {
        self.request(|reply| SessionCommand::Breakables { reply })
            .await
    }

    /// Queues a background save of the current state.
    pub fn save_now(&self) -> Result<(), SessionError> {
        self.commands
            .send(SessionCommand::SaveNow)
            .map_err(|_| SessionError::Stopped)
    }
}

struct SessionActor {
    simulation: Simulation,
    timers: Timers,
    saver: Arc<dyn StateSaver>,
    commands: mpsc::UnboundedReceiver<SessionCommand>,
    pet_done_tx: mpsc::UnboundedSender<PetId>,
    pet_done_rx: mpsc::UnboundedReceiver<PetId>,
    /// Play time not yet credited as a whole second.
    unaccounted_play: Duration,
}

impl SessionActor {
    async fn run(mut self) -> PlayerState {
        let mut spawn = every(self.timers.spawn_interval);
        let mut play_time = every(self.timers.play_time_tick);
        let mut pet_cycle = every(self.timers.pet_cycle);
        let mut autosave = every(self.timers.autosave);

        info!(
            "Session started for {}",
            self.simulation.state().player_id
        );

        loop {
            tokio::select! {
                command = self.commands.recv() => match command {
                    Some(SessionCommand::Shutdown) | None => break,
                    Some(command) => self.handle_command(command),
                },
                _ = spawn.tick() => {
                    let breakable = self.simulation.spawn_breakable(now());
                    debug!("Spawned {} worth {}", breakable.label(), breakable.value);
                }
                _ = play_time.tick() => {
                    self.account_play_time();
                    self.simulation.expire_breakables(now());
                }
                _ = pet_cycle.tick() => self.start_pet_work(),
                Some(pet_id) = self.pet_done_rx.recv() => {
                    self.simulation.expire_breakables(now());
                    self.simulation.finish_pet_work(pet_id);
                }
                _ = autosave.tick() => self.request_save(),
            }
        }

        let state = self.simulation.snapshot();
        info!("Session for {} stopping, saving", state.player_id);
        self.saver.save(state.clone()).await;
        state
    }

    fn handle_command(&mut self, command: SessionCommand) {
        match command {
            SessionCommand::Destroy { id, reply } => {
                self.simulation.expire_breakables(now());
                let _ = reply.send(self.simulation.destroy(id, Destroyer::Player));
            }
            SessionCommand::BuyPet { reply } => {
                let result = self.simulation.buy_pet();
                if result.is_ok() {
                    self.request_save();
                }
                let _ = reply.send(result);
            }
            SessionCommand::UseItem { item_id, reply } => {
                let result = self.simulation.use_item(item_id);
                if result.is_ok() {
                    self.request_save();
                }
                let _ = reply.send(result);
            }
            SessionCommand::SetClan { clan_id, reply } => {
                self.simulation.set_clan(clan_id);
                self.request_save();
                let _ = reply.send(());
            }
            SessionCommand::Snapshot { reply } => {
                let _ = reply.send(self.simulation.snapshot());
            }
            SessionCommand::Breakables { reply } => {
                let _ = reply.send(self.simulation.field().iter().cloned().collect());
            }
            SessionCommand::SaveNow => self.request_save(),
            SessionCommand::Shutdown => {}
        }
    }

    fn account_play_time(&mut self) {
        self.unaccounted_play += self.timers.play_time_tick;
        let seconds = self.unaccounted_play.as_secs();
        if seconds > 0 {
            self.simulation.tick_play_time(seconds);
            self.unaccounted_play -= Duration::from_secs(seconds);
        }
    }

    fn start_pet_work(&mut self) {
        let delay = self.timers.pet_work_delay;
        for pet_id in self.simulation.start_pet_work() {
            let done = self.pet_done_tx.clone();
            tokio::spawn(async move {
                tokio::time::sleep(delay).await;
                let _ = done.send(pet_id);
            });
        }
    }

    /// Saves run detached so a slow server never holds up the timers.
    fn request_save(&self) {
        let saver = self.saver.clone();
        let state = self.simulation.snapshot();
        tokio::spawn(async move { saver.save(state).await });
    }
}
