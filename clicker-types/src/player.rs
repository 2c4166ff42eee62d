use serde::de::{self, Deserializer};
use serde::ser::Serializer;
use serde::{Deserialize, Serialize};
use ts_rs::TS;
use uuid::Uuid;

use crate::{ClanId, PetId, PlayerId};

/// Most enchants a player can hold at once.
pub const MAX_ENCHANTS: usize = 5;

/// Full per-player save document. The server is the durability authority,
/// the client works on a copy and pushes it back wholesale.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase", default)]
#[ts(export)]
pub struct PlayerState {
    pub player_id: PlayerId,
    pub player_name: String,
    pub money: u64,
    /// Lifetime earnings, never decreases.
    pub total_money: u64,
    pub breakables_destroyed: u64,
    pub keys: u32,
    pub gifts: u32,
    pub pets: Vec<Pet>,
    pub inventory: Vec<Item>,
    pub player_clan: Option<ClanId>,
    pub enchants: Vec<Item>,
    /// Seconds of active play.
    pub play_time: u64,
    pub game_history: Vec<HistoryEntry>,
    pub created: String,    // ISO 8601 string
    pub last_saved: String, // ISO 8601 string
}

impl PlayerState {
    /// Fresh game with the starter pet and empty balances.
    pub fn new_game(player_id: impl Into<PlayerId>, timestamp: &str) -> Self {
        Self {
            player_id: player_id.into(),
            pets: vec![Pet::starter()],
            created: timestamp.to_string(),
            last_saved: timestamp.to_string(),
            ..Default::default()
        }
    }

    pub fn pet(&self, id: PetId) -> Option<&Pet> {
        self.pets.iter().find(|pet| pet.id == id)
    }

    pub fn pet_mut(&mut self, id: PetId) -> Option<&mut Pet> {
        self.pets.iter_mut().find(|pet| pet.id == id)
    }

    /// Smallest id strictly above every pet currently owned.
    pub fn next_pet_id(&self) -> PetId {
        self.pets.iter().map(|pet| pet.id).max().unwrap_or(0) + 1
    }

    pub fn item(&self, id: Uuid) -> Option<&Item> {
        self.inventory.iter().find(|item| item.id == id)
    }

    pub fn take_item(&mut self, id: Uuid) -> Option<Item> {
        let index = self.inventory.iter().position(|item| item.id == id)?;
        Some(self.inventory.remove(index))
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Pet {
    pub id: PetId,
    pub level: u32,
    pub damage: u32,
    pub speed: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[ts(optional)]
    pub name: Option<String>,
    pub position: Position,
    // Derived from the work loop, never stored
    #[serde(default, skip_serializing)]
    #[ts(skip)]
    pub working: bool,
}

impl Pet {
    pub fn new(id: PetId, position: Position) -> Self {
        Self {
            id,
            level: 1,
            damage: 1,
            speed: 1,
            name: None,
            position,
            working: false,
        }
    }

    pub fn starter() -> Self {
        Self {
            name: Some("Starter Pet".to_string()),
            ..Self::new(1, Position { x: 100.0, y: 100.0 })
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "kebab-case")]
#[ts(export)]
pub enum Rarity {
    Common,
    Rare,
    UltraRare,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub enum ItemKind {
    Potion,
    Enchant,
    Key,
    Gift,
    UltraRare,
}

impl ItemKind {
    pub fn label(self) -> &'static str {
        match self {
            ItemKind::Potion => "Mikstura",
            ItemKind::Enchant => "Zaklęcie",
            ItemKind::Key => "Klucz",
            ItemKind::Gift => "Prezent",
            ItemKind::UltraRare => "Rzadki Przedmiot",
        }
    }

    pub fn rarity(self) -> Rarity {
        match self {
            ItemKind::Potion => Rarity::Common,
            ItemKind::Enchant | ItemKind::Key | ItemKind::Gift => Rarity::Rare,
            ItemKind::UltraRare => Rarity::UltraRare,
        }
    }

    pub fn effect(self) -> &'static str {
        match self {
            ItemKind::Potion => "Tymczasowy boost",
            ItemKind::Enchant => "Stałe wzmocnienie",
            ItemKind::Key => "Otwiera Ultra-Loot Chest",
            ItemKind::Gift => "Zawiera losowe przedmioty",
            ItemKind::UltraRare => "Można handlować",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Item {
    pub id: Uuid,
    pub kind: ItemKind,
    pub name: String,
    pub rarity: Rarity,
    pub effect: String,
}

impl Item {
    pub fn new(kind: ItemKind) -> Self {
        Self::named(kind, kind.label())
    }

    pub fn named(kind: ItemKind, name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind,
            name: name.into(),
            rarity: kind.rarity(),
            effect: kind.effect().to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub enum HistoryKind {
    #[serde(rename = "breakable_destroyed")]
    BreakableDestroyed,
}

/// Who broke a breakable. Serialized as the pet's numeric id or `"player"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Destroyer {
    Player,
    Pet(PetId),
}

impl Serialize for Destroyer {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Destroyer::Player => serializer.serialize_str("player"),
            Destroyer::Pet(id) => serializer.serialize_u64(*id),
        }
    }
}

impl<'de> Deserialize<'de> for Destroyer {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Id(u64),
            Tag(String),
        }

        match Raw::deserialize(deserializer)? {
            Raw::Id(id) => Ok(Destroyer::Pet(id)),
            Raw::Tag(tag) if tag == "player" => Ok(Destroyer::Player),
            Raw::Tag(other) => Err(de::Error::custom(format!(
                "expected pet id or \"player\", got {other:?}"
            ))),
        }
    }
}

/// Append-only record of one economy event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct HistoryEntry {
    #[serde(rename = "type")]
    pub kind: HistoryKind,
    pub timestamp: String, // ISO 8601 string
    pub breakable_type: String,
    pub value: u64,
    #[ts(type = "number | \"player\"")]
    pub pet_id: Destroyer,
}
