#![allow(dead_code)]

use clicker_core::{EconomyEvent, EconomyEventHandler, Simulation, SimulationConfig};
use clicker_types::{Item, ItemKind, PlayerState};
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::collections::HashSet;
use std::sync::{Arc, Mutex};

/// Creates a fresh game for a test player
pub fn create_test_state() -> PlayerState {
    PlayerState::new_game("player_test", "2024-01-01T00:00:00.000Z")
}

/// Creates a test state with the given balance
pub fn create_test_state_with_money(money: u64) -> PlayerState {
    PlayerState {
        money,
        total_money: money,
        ..create_test_state()
    }
}

/// Creates a seeded simulation so runs are reproducible
pub fn create_simulation(seed: u64) -> Simulation<StdRng> {
    create_simulation_with_state(create_test_state(), seed)
}

pub fn create_simulation_with_state(state: PlayerState, seed: u64) -> Simulation<StdRng> {
    Simulation::new(state, StdRng::seed_from_u64(seed), SimulationConfig::default())
}

pub fn give_items(state: &mut PlayerState, kind: ItemKind, count: usize) -> Vec<Item> {
    let items: Vec<Item> = (0..count).map(|_| Item::new(kind)).collect();
    state.inventory.extend(items.iter().cloned());
    items
}

/// Asserts the data-model invariants that must hold after any operation
pub fn assert_state_invariants(state: &PlayerState) {
    let item_ids: HashSet<_> = state.inventory.iter().map(|item| item.id).collect();
    assert_eq!(item_ids.len(), state.inventory.len(), "duplicate item ids");

    let pet_ids: HashSet<_> = state.pets.iter().map(|pet| pet.id).collect();
    assert_eq!(pet_ids.len(), state.pets.len(), "duplicate pet ids");

    assert!(state.enchants.len() <= clicker_types::MAX_ENCHANTS);
}

/// Event collector for testing event emissions
#[derive(Clone)]
pub struct EventCollector {
    events: Arc<Mutex<Vec<EconomyEvent>>>,
}

impl EventCollector {
    pub fn new() -> Self {
        Self {
            events: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn attach(&self, simulation: &mut Simulation<StdRng>) {
        simulation.events_mut().add_handler(Box::new(self.clone()));
    }

    pub fn get_events(&self) -> Vec<EconomyEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn event_count(&self) -> usize {
        self.events.lock().unwrap().len()
    }

    pub fn has_event_type(&self, check_fn: impl Fn(&EconomyEvent) -> bool) -> bool {
        self.events.lock().unwrap().iter().any(check_fn)
    }
}

impl EconomyEventHandler for EventCollector {
    fn handle_event(&mut self, event: &EconomyEvent) {
        self.events.lock().unwrap().push(event.clone());
    }
}
