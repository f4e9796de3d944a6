//! Relay configuration, loaded from environment variables.
//!
//! Every knob has a default so the relay starts with nothing set. A missing
//! `DATABASE_URL` selects the in-memory store backend.

use std::time::Duration;

const DEFAULT_PORT: u16 = 3000;
const DEFAULT_DB_MAX_CONNECTIONS: u32 = 5;
const DEFAULT_OUTBOUND_QUEUE_CAPACITY: usize = 256;
const DEFAULT_HEARTBEAT_INTERVAL_MS: u64 = 15_000;
const DEFAULT_IDLE_TIMEOUT_MS: u64 = 45_000;
// Timer intervals must be non-zero.
const MIN_INTERVAL_MS: u64 = 10;

#[derive(Debug, Clone)]
pub struct RelayConfig {
    pub port: u16,
    pub database_url: Option<String>,
    pub db_max_connections: u32,
    /// Bounded per-session outbound queue. A peer that fills it is closed.
    pub outbound_queue_capacity: usize,
    /// How often the relay pings each client.
    pub heartbeat_interval: Duration,
    /// A session with no inbound traffic (including pongs) for this long is closed.
    pub idle_timeout: Duration,
}

impl RelayConfig {
    #[must_use]
    pub fn from_env() -> Self {
        Self {
            port: env_parse("PORT", DEFAULT_PORT),
            database_url: std::env::var("DATABASE_URL").ok().filter(|v| !v.is_empty()),
            db_max_connections: env_parse("DB_MAX_CONNECTIONS", DEFAULT_DB_MAX_CONNECTIONS),
            outbound_queue_capacity: env_parse("OUTBOUND_QUEUE_CAPACITY", DEFAULT_OUTBOUND_QUEUE_CAPACITY).max(1),
            heartbeat_interval: Duration::from_millis(
                env_parse("HEARTBEAT_INTERVAL_MS", DEFAULT_HEARTBEAT_INTERVAL_MS).max(MIN_INTERVAL_MS),
            ),
            idle_timeout: Duration::from_millis(env_parse("IDLE_TIMEOUT_MS", DEFAULT_IDLE_TIMEOUT_MS).max(MIN_INTERVAL_MS)),
        }
    }
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            database_url: None,
            db_max_connections: DEFAULT_DB_MAX_CONNECTIONS,
            outbound_queue_capacity: DEFAULT_OUTBOUND_QUEUE_CAPACITY,
            heartbeat_interval: Duration::from_millis(DEFAULT_HEARTBEAT_INTERVAL_MS),
            idle_timeout: Duration::from_millis(DEFAULT_IDLE_TIMEOUT_MS),
        }
    }
}

pub(crate) fn env_parse<T>(key: &str, default: T) -> T
where
    T: std::str::FromStr + Copy,
{
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<T>().ok())
        .unwrap_or(default)
}
