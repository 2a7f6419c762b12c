//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the control
//! service. All types derive Serde traits for deserialization from config
//! files; every section has defaults so an empty file is valid.

use serde::{Deserialize, Serialize};

/// Root configuration for the control service.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct AppConfig {
    /// HTTP listener and router settings.
    pub http: HttpConfig,

    /// Feature config persistence.
    pub database: DatabaseConfig,

    /// Remote voice server query connection.
    pub query: QueryConfig,

    /// Reload propagation to the worker.
    pub reload: ReloadConfig,

    /// Static feature catalog.
    pub catalog: CatalogConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// HTTP listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct HttpConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,

    /// Path prefix the API is mounted under. Empty mounts at the root.
    pub base_path: String,

    /// Request timeout in seconds.
    pub request_timeout_secs: u64,

    /// Maximum request body size in bytes.
    pub max_body_size: usize,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
            base_path: "/api".to_string(),
            request_timeout_secs: 30,
            max_body_size: 1024 * 1024,
        }
    }
}

/// Which store backend holds feature configs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    Sled,
    Memory,
}

impl std::str::FromStr for StoreBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "sled" => Ok(StoreBackend::Sled),
            "memory" => Ok(StoreBackend::Memory),
            other => Err(format!("unknown store backend '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub backend: StoreBackend,

    /// Directory of the sled database.
    pub path: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::Sled,
            path: "data/feature-configs".to_string(),
        }
    }
}

/// Transport used for the query interface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum QueryProtocol {
    Raw,
    Ssh,
}

impl std::str::FromStr for QueryProtocol {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "RAW" => Ok(QueryProtocol::Raw),
            "SSH" => Ok(QueryProtocol::Ssh),
            other => Err(format!("unknown query protocol '{}'", other)),
        }
    }
}

/// Remote query connection settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct QueryConfig {
    pub host: String,
    pub protocol: QueryProtocol,

    /// Query interface port.
    pub query_port: u16,

    /// Voice port of the virtual server to select.
    pub server_port: u16,

    pub username: String,

    #[serde(skip_serializing)]
    pub password: String,

    /// Nickname the controller appears under.
    pub nickname: String,

    pub connect_timeout_secs: u64,
    pub command_timeout_secs: u64,
    pub keepalive_secs: u64,

    /// Base delay for reconnect backoff in milliseconds.
    pub reconnect_base_delay_ms: u64,

    /// Maximum reconnect delay in milliseconds.
    pub reconnect_max_delay_ms: u64,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            protocol: QueryProtocol::Raw,
            query_port: 10011,
            server_port: 9987,
            username: "serveradmin".to_string(),
            password: String::new(),
            nickname: "ControlBot".to_string(),
            connect_timeout_secs: 10,
            command_timeout_secs: 10,
            keepalive_secs: 60,
            reconnect_base_delay_ms: 500,
            reconnect_max_delay_ms: 30_000,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ReloadConfig {
    /// Prefix the worker recognizes commands by (e.g. "!").
    pub command_prefix: String,

    /// Deadline for locating the worker and sending the notification.
    pub timeout_secs: u64,
}

impl Default for ReloadConfig {
    fn default() -> Self {
        Self {
            command_prefix: "!".to_string(),
            timeout_secs: 5,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CatalogConfig {
    /// Path to the JSON catalog file.
    pub path: String,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            path: "catalog.json".to_string(),
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
