//! Configuration schema definitions.
//!
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

use crate::loader::ColdStart;

/// Root configuration for the route server.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct Config {
    /// Listener configuration (bind address, trusted proxies).
    pub listener: ListenerConfig,

    /// Where route and middleware sources live.
    pub routes: RoutesConfig,

    /// Compiler invocation for source units.
    pub toolchain: ToolchainConfig,

    /// Compile cache behaviour.
    pub cache: CacheConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    pub security: SecurityConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,

    /// Peers whose `X-Forwarded-For` header is believed.
    pub trusted_proxies: Vec<String>,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
            trusted_proxies: vec!["127.0.0.1".to_string()],
        }
    }
}

/// Route tree locations, relative to the working directory unless absolute.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RoutesConfig {
    pub api_dir: String,
    pub middleware_dir: String,
}

impl Default for RoutesConfig {
    fn default() -> Self {
        Self {
            api_dir: "api".to_string(),
            middleware_dir: "middlewares".to_string(),
        }
    }
}

/// Compiler invocation. The output and source arguments are appended.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ToolchainConfig {
    pub program: String,
    pub args: Vec<String>,

    /// Per-unit compile timeout in seconds.
    pub timeout_secs: u64,

    /// Pass `--crate-name` derived from the file name (needed for `{id}.rs`).
    pub crate_names: bool,
}

impl Default for ToolchainConfig {
    fn default() -> Self {
        Self {
            program: "rustc".to_string(),
            args: ["--edition", "2021", "--crate-type", "cdylib", "-C", "opt-level=2"]
                .into_iter()
                .map(String::from)
                .collect(),
            timeout_secs: 120,
            crate_names: true,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct CacheConfig {
    /// What an empty cache makes of artifacts already on disk.
    pub cold_start: ColdStart,
}

/// Timeout configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Request timeout (total time for request/response) in seconds.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self { request_secs: 30 }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SecurityConfig {
    /// Maximum body size in bytes.
    pub max_body_size: usize,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            max_body_size: 2 * 1024 * 1024, // 2MB
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable the Prometheus endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "127.0.0.1:9090".to_string(),
        }
    }
}
