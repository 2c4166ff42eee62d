use std::ops::RangeInclusive;

use clicker_types::{
    Destroyer, HistoryEntry, HistoryKind, Item, ItemKind, MAX_ENCHANTS, Pet, PetId, PlayerState,
    Position,
};
use rand::Rng;
use thiserror::Error;
use tracing::debug;
use uuid::Uuid;

use crate::breakables::Breakable;
use crate::probability::ProbabilityTable;

pub const DROP_CHANCE: f64 = 0.10;
pub const PET_WORK_CHANCE: f64 = 0.30;
pub const PET_PRICE: u64 = 100;
pub const CHEST_ITEM_COUNT: usize = 3;
pub const GIFT_MONEY: RangeInclusive<u64> = 10..=59;
pub const GIFT_ITEM_COUNT: RangeInclusive<usize> = 1..=3;

/// Rarity bands for every item roll: drops, chests and gifts.
pub const LOOT_TABLE: ProbabilityTable<'static, ItemKind> = ProbabilityTable::new(&[
    (ItemKind::Potion, 0.50),
    (ItemKind::Enchant, 0.25),
    (ItemKind::Key, 0.15),
    (ItemKind::Gift, 0.08),
    (ItemKind::UltraRare, 0.02),
]);

pub const ULTRA_RARE_NAMES: [&str; 5] = [
    "Mityczny Miecz",
    "Starożytny Artefakt",
    "Kryształ Mocy",
    "Smocza Skóra",
    "Klejnot Wieczności",
];

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EconomyError {
    #[error("Not enough money: need {needed}, have {available}")]
    InsufficientFunds { needed: u64, available: u64 },

    #[error("Item not found: {0}")]
    ItemNotFound(Uuid),

    #[error("Enchant limit reached ({MAX_ENCHANTS})")]
    EnchantLimitReached,

    #[error("No keys left")]
    NoKeys,

    #[error("No gifts left")]
    NoGifts,

    #[error("Breakable {0} is not on the field")]
    BreakableNotFound(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct DestroyOutcome {
    pub breakable_type: &'static str,
    pub value: u64,
    pub destroyed_by: Destroyer,
    pub dropped: Option<Item>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GiftReward {
    pub money: u64,
    pub items: Vec<Item>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ItemUse {
    /// Transient boost, nothing persisted beyond removing the potion.
    Potion,
    Enchant { held: usize },
    Chest { items: Vec<Item> },
    Gift(GiftReward),
    /// Kept in the inventory; only useful for trading.
    Tradeable { name: String },
    /// Key or gift used with its counter at zero: the item is gone, nothing opens.
    Spent,
}

fn credit(state: &mut PlayerState, amount: u64) {
    state.money = state.money.saturating_add(amount);
    state.total_money = state.total_money.saturating_add(amount);
}

/// Applies a destruction to the player's state: reward, counter, drop roll,
/// history. The caller must already have taken `breakable` off the field.
pub fn resolve_destruction<R: Rng + ?Sized>(
    state: &mut PlayerState,
    breakable: &Breakable,
    destroyed_by: Destroyer,
    rng: &mut R,
    timestamp: &str,
) -> DestroyOutcome {
    credit(state, breakable.value);
    state.breakables_destroyed += 1;

    let dropped = roll_drop(state, rng);

    state.game_history.push(HistoryEntry {
        kind: HistoryKind::BreakableDestroyed,
        timestamp: timestamp.to_string(),
        breakable_type: breakable.label().to_string(),
        value: breakable.value,
        pet_id: destroyed_by,
    });

    debug!(
        "Breakable {} ({}) destroyed by {:?} for {}",
        breakable.id,
        breakable.label(),
        destroyed_by,
        breakable.value
    );

    DestroyOutcome {
        breakable_type: breakable.label(),
        value: breakable.value,
        destroyed_by,
        dropped,
    }
}

/// One draw against the drop chance; on success the item lands in the inventory.
pub fn roll_drop<R: Rng + ?Sized>(state: &mut PlayerState, rng: &mut R) -> Option<Item> {
    if rng.r#gen::<f64>() < DROP_CHANCE {
        Some(roll_item(state, rng))
    } else {
        None
    }
}

/// Draws one item through the rarity bands and appends it to the inventory.
/// Keys and gifts also bump their counters.
pub fn roll_item<R: Rng + ?Sized>(state: &mut PlayerState, rng: &mut R) -> Item {
    let kind = *LOOT_TABLE.sample(rng);
    let item = match kind {
        ItemKind::UltraRare => {
            let name = ULTRA_RARE_NAMES[rng.gen_range(0..ULTRA_RARE_NAMES.len())];
            Item::named(kind, name)
        }
        _ => Item::new(kind),
    };

    match kind {
        ItemKind::Key => state.keys += 1,
        ItemKind::Gift => state.gifts += 1,
        _ => {}
    }

    state.inventory.push(item.clone());
    item
}

pub fn buy_pet(state: &mut PlayerState, position: Position) -> Result<PetId, EconomyError> {
    if state.money < PET_PRICE {
        return Err(EconomyError::InsufficientFunds {
            needed: PET_PRICE,
            available: state.money,
        });
    }

    state.money -= PET_PRICE;
    let id = state.next_pet_id();
    state.pets.push(Pet::new(id, position));
    Ok(id)
}

/// Ultra-Loot Chest: spends one key and yields exactly three item draws.
pub fn open_chest<R: Rng + ?Sized>(
    state: &mut PlayerState,
    rng: &mut R,
) -> Result<Vec<Item>, EconomyError> {
    if state.keys == 0 {
        return Err(EconomyError::NoKeys);
    }
    state.keys -= 1;

    Ok((0..CHEST_ITEM_COUNT)
        .map(|_| roll_item(state, rng))
        .collect())
}

pub fn open_gift<R: Rng + ?Sized>(
    state: &mut PlayerState,
    rng: &mut R,
) -> Result<GiftReward, EconomyError> {
    if state.gifts == 0 {
        return Err(EconomyError::NoGifts);
    }
    state.gifts -= 1;

    let money = rng.gen_range(GIFT_MONEY);
    credit(state, money);

    let count = rng.gen_range(GIFT_ITEM_COUNT);
    let items = (0..count).map(|_| roll_item(state, rng)).collect();

    Ok(GiftReward { money, items })
}

/// Uses an inventory item. Rejected uses leave the item where it was.
pub fn use_item<R: Rng + ?Sized>(
    state: &mut PlayerState,
    item_id: Uuid,
    rng: &mut R,
) -> Result<ItemUse, EconomyError> {
    let (kind, name) = state
        .item(item_id)
        .map(|item| (item.kind, item.name.clone()))
        .ok_or(EconomyError::ItemNotFound(item_id))?;

    match kind {
        ItemKind::Potion => {
            state.take_item(item_id);
            Ok(ItemUse::Potion)
        }
        ItemKind::Enchant => {
            if state.enchants.len() >= MAX_ENCHANTS {
                return Err(EconomyError::EnchantLimitReached);
            }
            if let Some(enchant) = state.take_item(item_id) {
                state.enchants.push(enchant);
            }
            Ok(ItemUse::Enchant {
                held: state.enchants.len(),
            })
        }
        ItemKind::Key if state.keys == 0 => {
            state.take_item(item_id);
            Ok(ItemUse::Spent)
        }
        ItemKind::Key => {
            let items = open_chest(state, rng)?;
            state.take_item(item_id);
            Ok(ItemUse::Chest { items })
        }
        ItemKind::Gift if state.gifts == 0 => {
            state.take_item(item_id);
            Ok(ItemUse::Spent)
        }
        ItemKind::Gift => {
            let reward = open_gift(state, rng)?;
            state.take_item(item_id);
            Ok(ItemUse::Gift(reward))
        }
        ItemKind::UltraRare => Ok(ItemUse::Tradeable { name }),
    }
}

/// Rolls the work chance for every idle pet and marks the winners as working.
pub fn roll_pet_work<R: Rng + ?Sized>(state: &mut PlayerState, rng: &mut R) -> Vec<PetId> {
    let mut started = Vec::new();
    for pet in state.pets.iter_mut().filter(|pet| !pet.working) {
        if rng.r#gen::<f64>() < PET_WORK_CHANCE {
            pet.working = true;
            started.push(pet.id);
        }
    }
    started
}
