use chrono::Utc;
use tracing::info;
use uuid::Uuid;

use super::iso_timestamp;
use crate::error::StoreError;
use crate::store::{Collection, DocumentStore};
use clicker_types::{Clan, Member, MemberRole};

#[derive(Clone)]
pub struct ClanRepository {
    store: DocumentStore,
}

impl ClanRepository {
    pub fn new(store: DocumentStore) -> Self {
        Self { store }
    }

    pub async fn list(&self) -> Result<Vec<Clan>, StoreError> {
        self.store.list(Collection::Clans).await
    }

    pub async fn find(&self, clan_id: &str) -> Result<Option<Clan>, StoreError> {
        Ok(self
            .store
            .get(Collection::Clans, clan_id)
            .await?
            .map(|stored| stored.value))
    }

    /// Founds a clan with the caller as its leader.
    pub async fn create(
        &self,
        name: &str,
        player_id: &str,
        player_name: &str,
    ) -> Result<Clan, StoreError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(StoreError::Validation("Clan name must not be empty".to_string()));
        }
        if player_id.is_empty() {
            return Err(StoreError::Validation("Player id must not be empty".to_string()));
        }

        let clan = Clan::found(
            Uuid::new_v4().to_string(),
            name.to_string(),
            Member {
                id: player_id.to_string(),
                name: player_name.to_string(),
                role: MemberRole::Leader,
                join_date: iso_timestamp(Utc::now()),
            },
        );

        self.store.insert(Collection::Clans, &clan.id, &clan).await?;
        info!("Clan {} ({}) founded by {}", clan.name, clan.id, player_id);
        Ok(clan)
    }

    /// Adds the player as a member. Joining a clan you are already in
    /// returns it unchanged.
    pub async fn join(
        &self,
        clan_id: &str,
        player_id: &str,
        player_name: &str,
    ) -> Result<Clan, StoreError> {
        if player_id.is_empty() {
            return Err(StoreError::Validation("Player id must not be empty".to_string()));
        }

        let join_date = iso_timestamp(Utc::now());
        self.store
            .update(Collection::Clans, clan_id, |clan: &mut Clan| {
                if !clan.is_member(player_id) {
                    clan.members.push(Member {
                        id: player_id.to_string(),
                        name: player_name.to_string(),
                        role: MemberRole::Member,
                        join_date: join_date.clone(),
                    });
                }
                Ok(())
            })
            .await
            .map_err(|e| match e {
                StoreError::NotFound(_) => StoreError::NotFound(format!("Clan {}", clan_id)),
                other => other,
            })
    }
}
