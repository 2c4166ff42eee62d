use clicker_types::{Destroyer, Item, PetId};

use crate::breakables::{BreakableId, BreakableTier};
use crate::economy::{GiftReward, ItemUse};

#[derive(Debug, Clone, PartialEq)]
pub enum EconomyEvent {
    BreakableSpawned {
        id: BreakableId,
        tier: BreakableTier,
    },
    BreakableExpired {
        id: BreakableId,
    },
    BreakableDestroyed {
        id: BreakableId,
        destroyed_by: Destroyer,
        breakable_type: &'static str,
        value: u64,
    },
    ItemDropped {
        item: Item,
    },
    ItemUsed {
        item_name: String,
        effect: ItemUse,
    },
    ChestOpened {
        items: Vec<Item>,
    },
    GiftOpened {
        reward: GiftReward,
    },
    PetPurchased {
        pet_id: PetId,
    },
    PetStartedWorking {
        pet_id: PetId,
    },
    PetFinishedWorking {
        pet_id: PetId,
        destroyed: Option<BreakableId>,
    },
}

/// Event handler trait for economy notifications (UI, logging, tests)
pub trait EconomyEventHandler: Send {
    fn handle_event(&mut self, event: &EconomyEvent);
}

impl<F> EconomyEventHandler for F
where
    F: FnMut(&EconomyEvent) + Send,
{
    fn handle_event(&mut self, event: &EconomyEvent) {
        self(event)
    }
}

/// Simple synchronous bus; handlers run in registration order.
#[derive(Default)]
pub struct EconomyEventBus {
    handlers: Vec<Box<dyn EconomyEventHandler>>,
}

impl EconomyEventBus {
    pub fn new() -> Self {
        Self {
            handlers: Vec::new(),
        }
    }

    pub fn add_handler(&mut self, handler: Box<dyn EconomyEventHandler>) {
        self.handlers.push(handler);
    }

    pub fn publish(&mut self, event: EconomyEvent) {
        for handler in &mut self.handlers {
            handler.handle_event(&event);
        }
    }

    pub fn handler_count(&self) -> usize {
        self.handlers.len()
    }
}

impl std::fmt::Debug for EconomyEventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EconomyEventBus")
            .field("handlers", &self.handlers.len())
            .finish()
    }
}
