use chrono::Utc;
use tracing::info;
use uuid::Uuid;

use super::iso_timestamp;
use crate::error::StoreError;
use crate::store::{Collection, DocumentStore};
use clicker_types::{Trade, TradeDraft, TradeStatus};

#[derive(Clone)]
pub struct TradeRepository {
    store: DocumentStore,
}

impl TradeRepository {
    pub fn new(store: DocumentStore) -> Self {
        Self { store }
    }

    pub async fn list(&self) -> Result<Vec<Trade>, StoreError> {
        self.store.list(Collection::Trades).await
    }

    /// Stores a new offer. Whatever the draft says, it starts out active.
    pub async fn create(&self, draft: TradeDraft) -> Result<Trade, StoreError> {
        if draft.player_id.is_empty() {
            return Err(StoreError::Validation("Player id must not be empty".to_string()));
        }

        let trade = draft.into_trade(Uuid::new_v4().to_string(), iso_timestamp(Utc::now()));
        self.store.insert(Collection::Trades, &trade.id, &trade).await?;
        info!("Trade {} opened by {}", trade.id, trade.player_id);
        Ok(trade)
    }

    pub async fn update_status(
        &self,
        trade_id: &str,
        status: TradeStatus,
    ) -> Result<Trade, StoreError> {
        self.store
            .update(Collection::Trades, trade_id, |trade: &mut Trade| {
                if !trade.status.can_transition_to(status) {
                    return Err(StoreError::Validation(format!(
                        "Trade cannot move from {:?} to {:?}",
                        trade.status, status
                    )));
                }
                trade.status = status;
                Ok(())
            })
            .await
            .map_err(|e| match e {
                StoreError::NotFound(_) => StoreError::NotFound(format!("Trade {}", trade_id)),
                other => other,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::connect_to_memory_database;
    use clicker_types::{Item, ItemKind};
    use migration::{Migrator, MigratorTrait};

    async fn setup_test_db() -> TradeRepository {
        let db = connect_to_memory_database().await.unwrap();
        Migrator::up(&db, None).await.unwrap();
        TradeRepository::new(DocumentStore::new(db))
    }

    fn draft() -> TradeDraft {
        TradeDraft {
            player_id: "p1".to_string(),
            player_name: "Ala".to_string(),
            offer_items: vec![Item::named(ItemKind::UltraRare, "Smocza Skóra")],
            request_money: 500,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_create_assigns_id_and_active_status() {
        let repo = setup_test_db().await;

        let first = repo.create(draft()).await.unwrap();
        let second = repo.create(draft()).await.unwrap();

        assert_ne!(first.id, second.id);
        assert_eq!(first.status, TradeStatus::Active);
        assert_eq!(first.offer_items[0].name, "Smocza Skóra");
        assert_eq!(repo.list().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_status_moves_forward_only() {
        let repo = setup_test_db().await;
        let trade = repo.create(draft()).await.unwrap();

        let accepted = repo.update_status(&trade.id, TradeStatus::Accepted).await.unwrap();
        assert_eq!(accepted.status, TradeStatus::Accepted);

        for next in [TradeStatus::Active, TradeStatus::Cancelled] {
            assert!(matches!(
                repo.update_status(&trade.id, next).await,
                Err(StoreError::Validation(_))
            ));
        }
        assert_eq!(repo.list().await.unwrap()[0].status, TradeStatus::Accepted);
    }

    #[tokio::test]
    async fn test_status_of_unknown_trade_is_not_found() {
        let repo = setup_test_db().await;
        assert!(matches!(
            repo.update_status("nope", TradeStatus::Cancelled).await,
            Err(StoreError::NotFound(_))
        ));
    }
}
