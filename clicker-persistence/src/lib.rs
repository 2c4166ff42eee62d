pub mod connection;
pub mod entities;
pub mod error;
pub mod repositories;
pub mod store;

pub use error::StoreError;
pub use repositories::{ClanRepository, GameRepository, TradeRepository};
pub use store::{Collection, DocumentStore};

use sea_orm::DatabaseConnection;

/// Owns the connection and hands out repositories sharing it.
#[derive(Clone)]
pub struct DatabaseManager {
    connection: DatabaseConnection,
}

impl DatabaseManager {
    pub fn from_connection(connection: DatabaseConnection) -> Self {
        Self { connection }
    }

    pub fn games(&self) -> GameRepository {
        GameRepository::new(self.store())
    }

    pub fn clans(&self) -> ClanRepository {
        ClanRepository::new(self.store())
    }

    pub fn trades(&self) -> TradeRepository {
        TradeRepository::new(self.store())
    }

    fn store(&self) -> DocumentStore {
        DocumentStore::new(self.connection.clone())
    }
}
