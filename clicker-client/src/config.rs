use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use tracing::warn;

/// Intervals driving the local economy and the autosave.
#[derive(Debug, Clone, PartialEq)]
pub struct Timers {
    pub spawn_interval: Duration,
    pub breakable_lifetime: Duration,
    pub play_time_tick: Duration,
    pub pet_cycle: Duration,
    pub pet_work_delay: Duration,
    pub autosave: Duration,
}

impl Default for Timers {
    fn default() -> Self {
        Self {
            spawn_interval: Duration::from_secs(2),
            breakable_lifetime: Duration::from_secs(30),
            play_time_tick: Duration::from_secs(1),
            pet_cycle: Duration::from_secs(3),
            pet_work_delay: Duration::from_secs(1),
            autosave: Duration::from_secs(30),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub api_base: String,
    pub ws_url: String,
    pub cache_dir: PathBuf,
    /// Name offered when a first run has to invent an identity.
    pub player_name: String,
    pub reconnect_delay: Duration,
    pub request_timeout: Duration,
    pub timers: Timers,
}

impl ClientConfig {
    pub fn new() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the config from any key lookup; bad values fall back to defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Timers::default();

        Self {
            api_base: lookup("CLICKER_API_BASE")
                .unwrap_or_else(|| "http://localhost:3000/api".to_string()),
            ws_url: lookup("CLICKER_WS_URL")
                .unwrap_or_else(|| "ws://localhost:3000/ws".to_string()),
            cache_dir: lookup("CLICKER_CACHE_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(".clicker")),
            player_name: lookup("CLICKER_PLAYER_NAME")
                .map(|name| name.trim().to_string())
                .filter(|name| !name.is_empty())
                .unwrap_or_else(|| "Gracz".to_string()),
            reconnect_delay: millis_or(&lookup, "CLICKER_RECONNECT_DELAY_MS", 5_000),
            request_timeout: millis_or(&lookup, "CLICKER_REQUEST_TIMEOUT_MS", 10_000),
            timers: Timers {
                spawn_interval: millis_or(
                    &lookup,
                    "CLICKER_SPAWN_INTERVAL_MS",
                    as_millis(defaults.spawn_interval),
                ),
                breakable_lifetime: millis_or(
                    &lookup,
                    "CLICKER_BREAKABLE_LIFETIME_MS",
                    as_millis(defaults.breakable_lifetime),
                ),
                play_time_tick: defaults.play_time_tick,
                pet_cycle: millis_or(
                    &lookup,
                    "CLICKER_PET_CYCLE_MS",
                    as_millis(defaults.pet_cycle),
                ),
                pet_work_delay: millis_or(
                    &lookup,
                    "CLICKER_PET_WORK_DELAY_MS",
                    as_millis(defaults.pet_work_delay),
                ),
                autosave: millis_or(&lookup, "CLICKER_AUTOSAVE_MS", as_millis(defaults.autosave)),
            },
        }
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::new()
    }
}

fn as_millis(duration: Duration) -> u64 {
    duration.as_millis() as u64
}

/// Zero would make a tokio interval panic, so it counts as invalid.
fn millis_or(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: u64) -> Duration {
    Duration::from_millis(parse_or(lookup, key, default).max(1))
}

fn parse_or<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> T {
    match lookup(key) {
        None => default,
        Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
            warn!("Ignoring invalid {}={:?}, using default", key, raw);
            default
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> ClientConfig {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        ClientConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults_match_reference_timings() {
        let config = config_from(&[]);
        assert_eq!(config.api_base, "http://localhost:3000/api");
        assert_eq!(config.ws_url, "ws://localhost:3000/ws");
        assert_eq!(config.cache_dir, PathBuf::from(".clicker"));
        assert_eq!(config.player_name, "Gracz");
        assert_eq!(config.reconnect_delay, Duration::from_secs(5));
        assert_eq!(config.request_timeout, Duration::from_secs(10));
        assert_eq!(config.timers, Timers::default());
        assert_eq!(config.timers.spawn_interval, Duration::from_secs(2));
        assert_eq!(config.timers.autosave, Duration::from_secs(30));
    }

    #[test]
    fn test_overrides() {
        let config = config_from(&[
            ("CLICKER_API_BASE", "http://game.local/api"),
            ("CLICKER_PLAYER_NAME", "  Ala  "),
            ("CLICKER_RECONNECT_DELAY_MS", "250"),
            ("CLICKER_AUTOSAVE_MS", "1000"),
        ]);
        assert_eq!(config.api_base, "http://game.local/api");
        assert_eq!(config.player_name, "Ala");
        assert_eq!(config.reconnect_delay, Duration::from_millis(250));
        assert_eq!(config.timers.autosave, Duration::from_secs(1));
    }

    #[test]
    fn test_invalid_values_fall_back() {
        let config = config_from(&[
            ("CLICKER_RECONNECT_DELAY_MS", "soon"),
            ("CLICKER_SPAWN_INTERVAL_MS", "-5"),
            ("CLICKER_PLAYER_NAME", "   "),
        ]);
        assert_eq!(config.reconnect_delay, Duration::from_secs(5));
        assert_eq!(config.timers.spawn_interval, Duration::from_secs(2));
        assert_eq!(config.player_name, "Gracz");
    }

    #[test]
    fn test_zero_interval_is_clamped() {
        let config = config_from(&[("CLICKER_PET_CYCLE_MS", "0")]);
        assert_eq!(config.timers.pet_cycle, Duration::from_millis(1));
    }
}
