use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::{ClanId, Item, PlayerId, TradeId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum MemberRole {
    Leader,
    Member,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Member {
    pub id: PlayerId,
    pub name: String,
    pub role: MemberRole,
    pub join_date: String, // ISO 8601 string
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Clan {
    pub id: ClanId,
    pub name: String,
    pub level: u32,
    pub experience: u64,
    /// Join order; the first member is the leader.
    pub members: Vec<Member>,
    pub created: String, // ISO 8601 string
}

impl Clan {
    pub fn found(id: ClanId, name: String, leader: Member) -> Self {
        Self {
            id,
            name,
            level: 1,
            experience: 0,
            created: leader.join_date.clone(),
            members: vec![Member {
                role: MemberRole::Leader,
                ..leader
            }],
        }
    }

    pub fn is_member(&self, player_id: &str) -> bool {
        self.members.iter().any(|member| member.id == player_id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum TradeStatus {
    Active,
    Accepted,
    Cancelled,
}

impl TradeStatus {
    /// Status only ever moves forward out of `Active`.
    pub fn can_transition_to(self, next: TradeStatus) -> bool {
        matches!(
            (self, next),
            (TradeStatus::Active, TradeStatus::Accepted)
                | (TradeStatus::Active, TradeStatus::Cancelled)
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Trade {
    pub id: TradeId,
    pub player_id: PlayerId,
    pub player_name: String,
    pub offer_items: Vec<Item>,
    pub offer_money: u64,
    pub request_items: Vec<Item>,
    pub request_money: u64,
    pub status: TradeStatus,
    pub created: String, // ISO 8601 string
}

/// What a client submits; the server assigns id, status and timestamp.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase", default)]
#[ts(export)]
pub struct TradeDraft {
    pub player_id: PlayerId,
    pub player_name: String,
    pub offer_items: Vec<Item>,
    pub offer_money: u64,
    pub request_items: Vec<Item>,
    pub request_money: u64,
}

impl TradeDraft {
    pub fn into_trade(self, id: TradeId, created: String) -> Trade {
        Trade {
            id,
            player_id: self.player_id,
            player_name: self.player_name,
            offer_items: self.offer_items,
            offer_money: self.offer_money,
            request_items: self.request_items,
            request_money: self.request_money,
            status: TradeStatus::Active,
            created,
        }
    }
}

/// Relayed, never stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct ChatMessage {
    pub player_id: PlayerId,
    pub player_name: String,
    pub message: String,
    pub timestamp: String, // ISO 8601 string
    #[serde(default)]
    pub clan_id: Option<ClanId>,
}
