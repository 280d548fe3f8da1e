//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! dynroute.toml
//!     → loader.rs (parse & deserialize)
//!     → command-line overrides (main.rs)
//!     → validation.rs (semantic checks)
//!     → Config (validated, immutable)
//! ```
//!
//! # Design Decisions
//! - Config is read once at boot; there is no reload
//! - All fields have defaults so a missing file means a default config

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, read_config, ConfigError};
pub use schema::{
    CacheConfig, Config, ListenerConfig, ObservabilityConfig, RoutesConfig, SecurityConfig, TimeoutConfig,
    ToolchainConfig,
};
pub use validation::{validate_config, ValidationError};
