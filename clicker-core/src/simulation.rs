use std::time::{Duration, Instant};

use clicker_types::{ClanId, Destroyer, PetId, PlayerState, Position};
use rand::Rng;
use rand::rngs::StdRng;
use tracing::{debug, info};
use uuid::Uuid;

use crate::breakables::{Breakable, BreakableField, BreakableId, DEFAULT_BREAKABLE_LIFETIME};
use crate::economy::{self, DestroyOutcome, EconomyError, ItemUse};
use crate::economy_events::{EconomyEvent, EconomyEventBus};
use crate::timestamp_now;

#[derive(Debug, Clone)]
pub struct SimulationConfig {
    pub breakable_lifetime: Duration,
    /// Width and height of the area new pets are placed in.
    pub play_area: (f64, f64),
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            breakable_lifetime: DEFAULT_BREAKABLE_LIFETIME,
            play_area: (800.0, 600.0),
        }
    }
}

/// The client-side economy: one player's state plus the live breakable field.
///
/// Every method runs to completion on `&mut self`, so whoever owns the
/// simulation serializes all mutation simply by owning it.
#[derive(Debug)]
pub struct Simulation<R = StdRng> {
    state: PlayerState,
    field: BreakableField,
    rng: R,
    events: EconomyEventBus,
    config: SimulationConfig,
}

impl<R: Rng> Simulation<R> {
    pub fn new(state: PlayerState, rng: R, config: SimulationConfig) -> Self {
        Self {
            field: BreakableField::new(config.breakable_lifetime),
            state,
            rng,
            events: EconomyEventBus::new(),
            config,
        }
    }

    pub fn state(&self) -> &PlayerState {
        &self.state
    }

    pub fn snapshot(&self) -> PlayerState {
        self.state.clone()
    }

    /// Swaps in state merged from elsewhere. Live breakables are kept.
    pub fn replace_state(&mut self, state: PlayerState) {
        self.state = state;
    }

    pub fn field(&self) -> &BreakableField {
        &self.field
    }

    pub fn events_mut(&mut self) -> &mut EconomyEventBus {
        &mut self.events
    }

    pub fn spawn_breakable(&mut self, now: Instant) -> Breakable {
        let breakable = self.field.spawn_random(&mut self.rng, now);
        self.events.publish(EconomyEvent::BreakableSpawned {
            id: breakable.id,
            tier: breakable.tier,
        });
        breakable
    }

    pub fn expire_breakables(&mut self, now: Instant) -> usize {
        let expired = self.field.expire(now);
        for breakable in &expired {
            self.events
                .publish(EconomyEvent::BreakableExpired { id: breakable.id });
        }
        expired.len()
    }

    pub fn destroy(
        &mut self,
        id: BreakableId,
        destroyed_by: Destroyer,
    ) -> Result<DestroyOutcome, EconomyError> {
        let breakable = self
            .field
            .remove(id)
            .ok_or_else(|| EconomyError::BreakableNotFound(id.to_string()))?;

        let outcome = economy::resolve_destruction(
            &mut self.state,
            &breakable,
            destroyed_by,
            &mut self.rng,
            &timestamp_now(),
        );

        self.events.publish(EconomyEvent::BreakableDestroyed {
            id,
            destroyed_by,
            breakable_type: outcome.breakable_type,
            value: outcome.value,
        });
        if let Some(item) = &outcome.dropped {
            self.events
                .publish(EconomyEvent::ItemDropped { item: item.clone() });
        }

        Ok(outcome)
    }

    /// Rolls every idle pet; returns the ones that started working.
    pub fn start_pet_work(&mut self) -> Vec<PetId> {
        let started = economy::roll_pet_work(&mut self.state, &mut self.rng);
        for pet_id in &started {
            self.events
                .publish(EconomyEvent::PetStartedWorking { pet_id: *pet_id });
        }
        started
    }

    /// Ends a pet's work: it goes idle and hits one random live breakable, if any.
    pub fn finish_pet_work(&mut self, pet_id: PetId) -> Option<DestroyOutcome> {
        let Some(pet) = self.state.pet_mut(pet_id) else {
            debug!("Pet {} vanished before finishing work", pet_id);
            return None;
        };
        pet.working = false;

        let target = self.field.pick_random(&mut self.rng);
        let outcome = target.and_then(|id| self.destroy(id, Destroyer::Pet(pet_id)).ok());

        self.events.publish(EconomyEvent::PetFinishedWorking {
            pet_id,
            destroyed: target.filter(|_| outcome.is_some()),
        });
        outcome
    }

    pub fn buy_pet(&mut self) -> Result<PetId, EconomyError> {
        let (width, height) = self.config.play_area;
        let position = Position {
            x: self.rng.r#gen::<f64>() * width,
            y: self.rng.r#gen::<f64>() * height,
        };

        let pet_id = economy::buy_pet(&mut self.state, position)?;
        info!("Player {} bought pet {}", self.state.player_id, pet_id);
        self.events.publish(EconomyEvent::PetPurchased { pet_id });
        Ok(pet_id)
    }

    pub fn use_item(&mut self, item_id: Uuid) -> Result<ItemUse, EconomyError> {
        let item_name = self
            .state
            .item(item_id)
            .map(|item| item.name.clone())
            .ok_or(EconomyError::ItemNotFound(item_id))?;

        let used = economy::use_item(&mut self.state, item_id, &mut self.rng)?;

        match &used {
            ItemUse::Chest { items } => self.events.publish(EconomyEvent::ChestOpened {
                items: items.clone(),
            }),
            ItemUse::Gift(reward) => self.events.publish(EconomyEvent::GiftOpened {
                reward: reward.clone(),
            }),
            _ => {}
        }
        self.events.publish(EconomyEvent::ItemUsed {
            item_name,
            effect: used.clone(),
        });

        Ok(used)
    }

    pub fn tick_play_time(&mut self, seconds: u64) {
        self.state.play_time += seconds;
    }

    pub fn set_clan(&mut self, clan_id: Option<ClanId>) {
        self.state.player_clan = clan_id;
    }
}
