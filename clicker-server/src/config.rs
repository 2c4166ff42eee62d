use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use clicker_persistence::connection::DEFAULT_DATABASE_URL;
use tracing::warn;

use crate::websocket::rate_limiter::RateLimit;

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    pub upload_dir: PathBuf,
    pub max_upload_bytes: u64,
    pub ws_rate_limit_burst: u32,
    pub ws_rate_limit_refill: Duration,
}

impl Config {
    pub fn new() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the config from any key lookup; bad values fall back to defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        Self {
            host: lookup("HOST").unwrap_or_else(|| "127.0.0.1".to_string()),
            port: parse_or(&lookup, "PORT", 3000),
            database_url: lookup("DATABASE_URL")
                .unwrap_or_else(|| DEFAULT_DATABASE_URL.to_string()),
            upload_dir: lookup("UPLOAD_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("uploads")),
            max_upload_bytes: parse_or(&lookup, "MAX_UPLOAD_BYTES", 5 * 1024 * 1024),
            ws_rate_limit_burst: parse_or(&lookup, "WS_RATE_LIMIT_BURST", 30),
            ws_rate_limit_refill: Duration::from_secs(parse_or(
                &lookup,
                "WS_RATE_LIMIT_REFILL_SECONDS",
                2,
            )),
        }
    }

    pub fn rate_limit(&self) -> RateLimit {
        RateLimit {
            burst: self.ws_rate_limit_burst,
            refill: self.ws_rate_limit_refill,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
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
