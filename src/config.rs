//! Configuration Module
//!
//! Handles loading service configuration from environment variables and
//! holds the compiled-in connection policy.

use std::env;
use std::time::Duration;

use tracing::warn;

use crate::cache::{DEFAULT_TTL_SECS, MAX_BATCH_SIZE};
use crate::store::MAX_TTL_SECS;

/// Service configuration parameters.
#[derive(Debug, Clone)]
pub struct Config {
    /// Connection URL of the remote store (`redis://`, `rediss://` or `memory://`)
    pub redis_url: String,
    /// HTTP server port
    pub server_port: u16,
    /// Pool, timeout and health-check policy
    pub connection: ConnectionSettings,
}

/// Connection and health-check policy for the `ConnectionManager`.
///
/// None of these values carry a correctness property, they are tuning knobs.
#[derive(Debug, Clone, PartialEq)]
pub struct ConnectionSettings {
    /// Maximum pooled connections
    pub pool_size: usize,
    /// Bound on every store command
    pub socket_timeout: Duration,
    /// Bound on establishing a new connection
    pub connect_timeout: Duration,
    /// Bound on a single liveness probe
    pub probe_timeout: Duration,
    /// Sleep between health probes
    pub health_check_interval: Duration,
    /// Consecutive failed probes before reconnecting
    pub failure_threshold: u32,
    /// TTL for the uuid -> id key space (None = no expiry)
    pub uuid_to_id_ttl: Option<u64>,
    /// TTL for the id -> uuid key space (None = no expiry)
    pub id_to_uuid_ttl: Option<u64>,
    /// Ceiling on keys/entries per batch operation
    pub max_batch_size: usize,
}

impl Default for ConnectionSettings {
    fn default() -> Self {
        Self {
            pool_size: 50,
            socket_timeout: Duration::from_secs(5),
            connect_timeout: Duration::from_secs(2),
            probe_timeout: Duration::from_secs(2),
            health_check_interval: Duration::from_secs(10),
            failure_threshold: 3,
            uuid_to_id_ttl: Some(DEFAULT_TTL_SECS),
            id_to_uuid_ttl: Some(DEFAULT_TTL_SECS),
            max_batch_size: MAX_BATCH_SIZE,
        }
    }
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `REDIS_URL` - Store URL (default: redis://localhost:6379)
    /// - `SERVER_PORT` - HTTP server port (default: 8000)
    /// - `REDIS_POOL_SIZE` - Max pooled connections (default: 50)
    /// - `HEALTH_CHECK_INTERVAL` - Seconds between probes (default: 10)
    /// - `CACHE_TTL` - TTL in seconds for both key spaces, 0 disables expiry,
    ///   values above 100 years are ignored (default: 600)
    pub fn from_env() -> Self {
        let defaults = ConnectionSettings::default();
        let ttl = parse_env::<u64>("CACHE_TTL").and_then(checked_ttl);

        Self {
            redis_url: env::var("REDIS_URL")
                .unwrap_or_else(|_| "redis://localhost:6379".to_string()),
            server_port: parse_env("SERVER_PORT").unwrap_or(8000),
            connection: ConnectionSettings {
                pool_size: parse_env("REDIS_POOL_SIZE").unwrap_or(defaults.pool_size),
                health_check_interval: parse_env("HEALTH_CHECK_INTERVAL")
                    .map(Duration::from_secs)
                    .unwrap_or(defaults.health_check_interval),
                uuid_to_id_ttl: ttl.map(Some).unwrap_or(defaults.uuid_to_id_ttl),
                id_to_uuid_ttl: ttl.map(Some).unwrap_or(defaults.id_to_uuid_ttl),
                ..defaults
            },
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            redis_url: "redis://localhost:6379".to_string(),
            server_port: 8000,
            connection: ConnectionSettings::default(),
        }
    }
}

/// Accepts a TTL the store can honour; anything longer falls back to the default.
fn checked_ttl(secs: u64) -> Option<u64> {
    if secs > MAX_TTL_SECS {
        warn!(
            ttl_secs = secs,
            max_secs = MAX_TTL_SECS,
            "CACHE_TTL out of range, using default"
        );
        return None;
    }
    Some(secs)
}

fn parse_env<T: std::str::FromStr>(name: &str) -> Option<T> {
    env::var(name).ok().and_then(|v| v.parse().ok())
}

/// Masks the password of a connection URL so it can be logged.
pub fn redact_url(url: &str) -> String {
    let Some((scheme, rest)) = url.split_once("://") else {
        return url.to_string();
    };
    match rest.rsplit_once('@') {
        Some((userinfo, host)) => {
            let user = userinfo.split(':').next().unwrap_or_default();
            format!("{scheme}://{user}:***@{host}")
        }
        None => url.to_string(),
    }
}
