pub mod breakables;
pub mod economy;
pub mod economy_events;
pub mod probability;
pub mod simulation;

// Re-export main components
pub use breakables::*;
pub use economy::*;
pub use economy_events::*;
pub use probability::*;
pub use simulation::*;

use chrono::SecondsFormat;

/// Current UTC time as an ISO 8601 string with millisecond precision.
pub fn timestamp_now() -> String {
    chrono::Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}
