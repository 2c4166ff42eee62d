pub mod clan_repository;
pub mod game_repository;
pub mod trade_repository;

pub use clan_repository::ClanRepository;
pub use game_repository::GameRepository;
pub use trade_repository::TradeRepository;

use chrono::{DateTime, Duration, SecondsFormat, SubsecRound, Utc};

pub(crate) fn iso_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Millisecond stamp that never reads earlier than `at`.
pub(crate) fn iso_timestamp_rounded_up(at: DateTime<Utc>) -> String {
    let truncated = at.trunc_subsecs(3);
    if truncated < at {
        iso_timestamp(truncated + Duration::milliseconds(1))
    } else {
        iso_timestamp(truncated)
    }
}
