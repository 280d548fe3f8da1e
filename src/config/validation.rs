//! Configuration validation.
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: Config → Result<(), Vec<ValidationError>>
//! - Runs after command-line overrides, before anything is compiled

use std::net::{IpAddr, SocketAddr};

use crate::config::schema::Config;

/// One failed semantic check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

pub fn validate_config(config: &Config) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::new(
            "listener.bind_address",
            format!("'{}' is not a socket address", config.listener.bind_address),
        ));
    }

    for proxy in &config.listener.trusted_proxies {
        if proxy.parse::<IpAddr>().is_err() {
            errors.push(ValidationError::new(
                "listener.trusted_proxies",
                format!("'{proxy}' is not an IP address"),
            ));
        }
    }

    if config.toolchain.program.trim().is_empty() {
        errors.push(ValidationError::new("toolchain.program", "must not be empty"));
    }

    if config.toolchain.args.iter().any(|arg| arg == "-o") {
        errors.push(ValidationError::new(
            "toolchain.args",
            "must not set the output path; it is chosen per artifact",
        ));
    }

    if config.toolchain.crate_names && config.toolchain.args.iter().any(|arg| arg == "--crate-name") {
        errors.push(ValidationError::new(
            "toolchain.args",
            "sets --crate-name while toolchain.crate_names is enabled",
        ));
    }

    if config.toolchain.timeout_secs == 0 {
        errors.push(ValidationError::new("toolchain.timeout_secs", "must be greater than zero"));
    }

    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::new("timeouts.request_secs", "must be greater than zero"));
    }

    if config.security.max_body_size == 0 {
        errors.push(ValidationError::new("security.max_body_size", "must be greater than zero"));
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::new(
            "observability.metrics_address",
            format!("'{}' is not a socket address", config.observability.metrics_address),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
