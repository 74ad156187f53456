//! Configuration schema definitions.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Main CourseHub configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Gateway settings.
    #[serde(default)]
    pub gateway: GatewayConfig,

    /// Storage settings.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Session authentication settings.
    #[serde(default)]
    pub auth: AuthConfig,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Gateway configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    /// Bind mode.
    #[serde(default)]
    pub bind: BindMode,

    /// Port number.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Enable CORS for the HTTP API.
    #[serde(default = "default_true")]
    pub cors: bool,

    /// Maximum concurrent WebSocket connections.
    #[serde(default = "default_max_connections")]
    pub max_connections: usize,

    /// Per-connection outbound queue capacity.
    #[serde(default = "default_outbound_buffer")]
    pub outbound_buffer: usize,

    /// Maximum inbound frames per second per connection.
    #[serde(default = "default_max_messages_per_second")]
    pub max_messages_per_second: u64,

    /// Maximum chat message body length, in characters.
    #[serde(default = "default_max_body_chars")]
    pub max_body_chars: usize,

    /// Consecutive storage failures tolerated before a connection is closed.
    #[serde(default = "default_max_storage_failures")]
    pub max_storage_failures: u32,

    /// Upper bound on messages returned by the history endpoint.
    #[serde(default = "default_history_limit")]
    pub history_limit: usize,

    /// Allowed WebSocket origins. Empty means any origin.
    #[serde(default)]
    pub allowed_origins: Vec<String>,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            bind: BindMode::default(),
            port: default_port(),
            cors: true,
            max_connections: default_max_connections(),
            outbound_buffer: default_outbound_buffer(),
            max_messages_per_second: default_max_messages_per_second(),
            max_body_chars: default_max_body_chars(),
            max_storage_failures: default_max_storage_failures(),
            history_limit: default_history_limit(),
            allowed_origins: Vec::new(),
        }
    }
}

fn default_port() -> u16 {
    8600
}

fn default_true() -> bool {
    true
}

fn default_max_connections() -> usize {
    1000
}

fn default_outbound_buffer() -> usize {
    256
}

fn default_max_messages_per_second() -> u64 {
    20
}

fn default_max_body_chars() -> usize {
    4000
}

fn default_max_storage_failures() -> u32 {
    3
}

fn default_history_limit() -> usize {
    50
}

/// Bind mode for the gateway.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BindMode {
    /// Bind to loopback only (127.0.0.1).
    #[default]
    Loopback,

    /// Bind to all interfaces.
    Lan,
}

impl std::str::FromStr for BindMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "loopback" => Ok(Self::Loopback),
            "lan" => Ok(Self::Lan),
            other => Err(format!("Invalid bind mode: {}", other)),
        }
    }
}

/// Storage configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StorageConfig {
    /// SQLite database path. Defaults to ~/.coursehub/coursehub.db.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub database: Option<PathBuf>,
}

/// Session authentication configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Name of the session cookie.
    #[serde(default = "default_cookie_name")]
    pub cookie_name: String,

    /// Lifetime of newly issued sessions, in hours. Zero means no expiry.
    #[serde(default = "default_session_ttl_hours")]
    pub session_ttl_hours: u32,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            cookie_name: default_cookie_name(),
            session_ttl_hours: default_session_ttl_hours(),
        }
    }
}

fn default_cookie_name() -> String {
    "sessionid".to_string()
}

fn default_session_ttl_hours() -> u32 {
    24 * 14
}

/// Logging configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level.
    #[serde(default)]
    pub level: LogLevel,

    /// Emit JSON-formatted log lines.
    #[serde(default)]
    pub json: bool,

    /// Log file path.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<PathBuf>,
}

/// Log level.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl LogLevel {
    /// Directive string understood by `EnvFilter`.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }
}
