pub mod api;
pub mod errors;
pub mod messages;
pub mod player;
pub mod social;

// Re-export all types
pub use api::*;
pub use errors::*;
pub use messages::*;
pub use player::*;
pub use social::*;

pub type PlayerId = String;
pub type ClanId = String;
pub type TradeId = String;
pub type PetId = u64;
