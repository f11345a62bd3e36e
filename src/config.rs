//! Server configuration loaded from environment variables.
//!
//! Follows 12-factor style: all settings come from environment variables
//! (or a `.env` file via `dotenvy`).

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use crate::sync::SyncConfig;

/// Top-level server configuration.
///
/// Loaded once at startup via [`LedgerConfig::from_env`].
#[derive(Debug, Clone)]
pub struct LedgerConfig {
    /// Socket address to bind the HTTP server to (e.g. `0.0.0.0:3000`).
    pub listen_addr: SocketAddr,

    /// Directory holding the local record store.
    pub data_dir: PathBuf,

    /// Local id of the user served by this process.
    pub user_id: String,

    /// Foreign id linked to the user for remote partitioning.
    pub remote_id: Option<String>,

    /// Initial connectivity.
    pub start_online: bool,

    /// Debounce window in milliseconds.
    pub sync_debounce_ms: u64,

    /// Minimum seconds between navigation-triggered syncs (0 = no guard).
    pub sync_min_interval_secs: u64,

    /// Seconds between periodic syncs (0 = disabled).
    pub sync_periodic_interval_secs: u64,

    /// PostgreSQL connection string of the remote store. When unset the
    /// remote store lives in process memory.
    pub remote_database_url: Option<String>,

    /// Maximum number of remote database connections.
    pub remote_max_connections: u32,

    /// Timeout in seconds for acquiring a remote database connection.
    pub remote_connect_timeout_secs: u64,

    /// Timeout in seconds for each remote call.
    pub remote_request_timeout_secs: u64,

    /// Capacity of the EventBus broadcast channel.
    pub event_bus_capacity: usize,

    /// Upper bound in seconds on serving one HTTP request.
    pub http_request_timeout_secs: u64,
}

impl LedgerConfig {
    /// Loads configuration from environment variables.
    ///
    /// Falls back to defaults when a variable is not set.
    /// Calls `dotenvy::dotenv().ok()` to optionally load a `.env` file.
    ///
    /// # Errors
    ///
    /// Returns an error if `LISTEN_ADDR` is set but cannot be parsed as
    /// a [`SocketAddr`].
    pub fn from_env() -> Result<Self, Box<dyn std::error::Error>> {
        dotenvy::dotenv().ok();

        let listen_addr: SocketAddr = std::env::var("LISTEN_ADDR")
            .unwrap_or_else(|_| "0.0.0.0:3000".to_string())
            .parse()?;

        let data_dir = std::env::var("LEDGER_DATA_DIR")
            .map_or_else(|_| PathBuf::from("./data"), PathBuf::from);
        let user_id =
            std::env::var("LEDGER_USER_ID").unwrap_or_else(|_| "local-user".to_string());
        let remote_id = parse_env_opt("LEDGER_REMOTE_ID");
        let start_online = parse_env_bool("LEDGER_START_ONLINE", true);

        let sync_debounce_ms = parse_env("SYNC_DEBOUNCE_MS", 1000);
        let sync_min_interval_secs = parse_env("SYNC_MIN_INTERVAL_SECS", 30);
        let sync_periodic_interval_secs = parse_env("SYNC_PERIODIC_INTERVAL_SECS", 0);

        let remote_database_url = parse_env_opt("REMOTE_DATABASE_URL");
        let remote_max_connections = parse_env("REMOTE_MAX_CONNECTIONS", 5);
        let remote_connect_timeout_secs = parse_env("REMOTE_CONNECT_TIMEOUT_SECS", 5);
        let remote_request_timeout_secs = parse_env("REMOTE_REQUEST_TIMEOUT_SECS", 10);

        let event_bus_capacity = parse_env("EVENT_BUS_CAPACITY", 1024);
        let http_request_timeout_secs = parse_env("HTTP_REQUEST_TIMEOUT_SECS", 30);

        Ok(Self {
            listen_addr,
            data_dir,
            user_id,
            remote_id,
            start_online,
            sync_debounce_ms,
            sync_min_interval_secs,
            sync_periodic_interval_secs,
            remote_database_url,
            remote_max_connections,
            remote_connect_timeout_secs,
            remote_request_timeout_secs,
            event_bus_capacity,
            http_request_timeout_secs,
        })
    }

    /// Sync timing derived from this configuration.
    #[must_use]
    pub fn sync_config(&self) -> SyncConfig {
        SyncConfig {
            debounce: Duration::from_millis(self.sync_debounce_ms),
            min_interval: Duration::from_secs(self.sync_min_interval_secs),
            periodic_interval: (self.sync_periodic_interval_secs > 0)
                .then(|| Duration::from_secs(self.sync_periodic_interval_secs)),
            remote_timeout: Duration::from_secs(self.remote_request_timeout_secs),
        }
    }

    /// Connect timeout of the remote database pool.
    #[must_use]
    pub fn remote_connect_timeout(&self) -> Duration {
        Duration::from_secs(self.remote_connect_timeout_secs)
    }

    /// Timeout applied to every HTTP request.
    #[must_use]
    pub fn http_request_timeout(&self) -> Duration {
        Duration::from_secs(self.http_request_timeout_secs)
    }
}

/// Parses an environment variable as `T`, returning `default` on missing
/// or invalid values.
fn parse_env<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

/// Parses an environment variable as a boolean. Accepts `"true"`, `"1"`,
/// `"false"`, `"0"` (case-insensitive). Returns `default` otherwise.
fn parse_env_bool(key: &str, default: bool) -> bool {
    match std::env::var(key).ok().as_deref().map(str::to_ascii_lowercase).as_deref() {
        Some("true" | "1") => true,
        Some("false" | "0") => false,
        _ => default,
    }
}

/// Reads an optional string variable; empty counts as unset.
fn parse_env_opt(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> LedgerConfig {
        LedgerConfig {
            listen_addr: SocketAddr::from(([127, 0, 0, 1], 3000)),
            data_dir: PathBuf::from("./data"),
            user_id: "u1".to_string(),
            remote_id: None,
            start_online: true,
            sync_debounce_ms: 250,
            sync_min_interval_secs: 30,
            sync_periodic_interval_secs: 0,
            remote_database_url: None,
            remote_max_connections: 5,
            remote_connect_timeout_secs: 5,
            remote_request_timeout_secs: 10,
            event_bus_capacity: 1024,
            http_request_timeout_secs: 30,
        }
    }

    #[test]
    fn sync_config_maps_fields() {
        let sync = config().sync_config();
        assert_eq!(sync.debounce, Duration::from_millis(250));
        assert_eq!(sync.min_interval, Duration::from_secs(30));
        assert_eq!(sync.periodic_interval, None);
        assert_eq!(sync.remote_timeout, Duration::from_secs(10));
    }

    #[test]
    fn periodic_interval_enabled_when_positive() {
        let config = LedgerConfig {
            sync_periodic_interval_secs: 120,
            ..config()
        };
        assert_eq!(
            config.sync_config().periodic_interval,
            Some(Duration::from_secs(120))
        );
    }

    #[test]
    fn missing_variables_fall_back() {
        assert_eq!(parse_env("SPLIT_LEDGER_TEST_UNSET_NUMBER", 7u64), 7);
        assert!(parse_env_bool("SPLIT_LEDGER_TEST_UNSET_FLAG", true));
        assert_eq!(parse_env_opt("SPLIT_LEDGER_TEST_UNSET_TEXT"), None);
    }
}
