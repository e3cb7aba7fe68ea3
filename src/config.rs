//! Gateway configuration loaded from environment variables.
//!
//! Follows 12-factor style: all settings come from environment variables
//! (or a `.env` file via `dotenvy`). Unset or unparsable values fall back
//! to the defaults documented on each field.

use std::net::SocketAddr;

/// Subprotocol negotiated on subscription upgrades.
pub const GRAPHQL_WS_PROTOCOL: &str = "graphql-ws";

/// Top-level gateway configuration.
///
/// Loaded once at startup via [`GatewayConfig::from_env`].
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Socket address to bind the HTTP server to (default `0.0.0.0:8080`).
    pub listen_addr: SocketAddr,

    /// Path serving `GET`/`POST` queries (default `/graphql`).
    pub graphql_path: String,

    /// Path accepting subscription upgrades (default `/subscriptions`).
    pub subscriptions_path: String,

    /// Tab-indent HTTP JSON responses (default `true`).
    pub pretty: bool,

    /// Maximum accepted HTTP request body (default 32 MiB).
    pub max_body_bytes: usize,

    /// Interval between ticks of the demo engine, in milliseconds.
    pub ticker_interval_ms: u64,

    /// Settings handed to the subscription acceptor.
    pub subscription: SubscriptionConfig,
}

/// Upgrade and session settings for the subscription transport.
///
/// Passed by value to [`crate::ws::SessionAcceptor`] at construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscriptionConfig {
    /// Subprotocol offered during the handshake.
    pub subprotocol: String,
    /// Socket read buffer size in bytes.
    pub read_buffer_size: usize,
    /// Socket write buffer size in bytes.
    pub write_buffer_size: usize,
    /// Largest inbound message accepted, in bytes.
    pub max_message_size: usize,
    /// Send a `complete` envelope when an engine stream ends on its own.
    pub complete_on_exhaustion: bool,
}

impl Default for SubscriptionConfig {
    fn default() -> Self {
        Self {
            subprotocol: GRAPHQL_WS_PROTOCOL.to_string(),
            read_buffer_size: 1024,
            write_buffer_size: 1024,
            max_message_size: 64 << 20,
            complete_on_exhaustion: true,
        }
    }
}

impl SubscriptionConfig {
    /// Loads subscription settings from `WS_*` environment variables.
    #[must_use]
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            subprotocol: defaults.subprotocol,
            read_buffer_size: parse_env("WS_READ_BUFFER_SIZE", defaults.read_buffer_size),
            write_buffer_size: parse_env("WS_WRITE_BUFFER_SIZE", defaults.write_buffer_size),
            max_message_size: parse_env("WS_MAX_MESSAGE_SIZE", defaults.max_message_size),
            complete_on_exhaustion: parse_env_bool(
                "WS_COMPLETE_ON_EXHAUSTION",
                defaults.complete_on_exhaustion,
            ),
        }
    }
}

impl GatewayConfig {
    /// Loads configuration from environment variables.
    ///
    /// Falls back to sensible defaults when a variable is not set.
    /// Calls `dotenvy::dotenv().ok()` to optionally load a `.env` file.
    ///
    /// # Errors
    ///
    /// Returns an error if `LISTEN_ADDR` is set but cannot be parsed as
    /// a [`SocketAddr`], or if the query and subscription paths collide.
    pub fn from_env() -> Result<Self, Box<dyn std::error::Error>> {
        dotenvy::dotenv().ok();

        let listen_addr: SocketAddr = std::env::var("LISTEN_ADDR")
            .unwrap_or_else(|_| "0.0.0.0:8080".to_string())
            .parse()?;

        let graphql_path = normalize_path(
            &std::env::var("GRAPHQL_PATH").unwrap_or_else(|_| "/graphql".to_string()),
        );
        let subscriptions_path = normalize_path(
            &std::env::var("SUBSCRIPTIONS_PATH").unwrap_or_else(|_| "/subscriptions".to_string()),
        );

        if graphql_path == subscriptions_path {
            return Err(format!(
                "GRAPHQL_PATH and SUBSCRIPTIONS_PATH must differ (both {graphql_path})"
            )
            .into());
        }

        Ok(Self {
            listen_addr,
            graphql_path,
            subscriptions_path,
            pretty: parse_env_bool("GRAPHQL_PRETTY", true),
            max_body_bytes: parse_env("MAX_BODY_BYTES", 32 << 20),
            ticker_interval_ms: parse_env("TICKER_INTERVAL_MS", 1000),
            subscription: SubscriptionConfig::from_env(),
        })
    }
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            listen_addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            graphql_path: "/graphql".to_string(),
            subscriptions_path: "/subscriptions".to_string(),
            pretty: true,
            max_body_bytes: 32 << 20,
            ticker_interval_ms: 1000,
            subscription: SubscriptionConfig::default(),
        }
    }
}

/// Ensures a route path starts with a single `/`.
fn normalize_path(raw: &str) -> String {
    format!("/{}", raw.trim().trim_start_matches('/'))
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
        Some("true") | Some("1") => true,
        Some("false") | Some("0") => false,
        _ => default,
    }
}
