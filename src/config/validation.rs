//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (timeouts > 0, ports valid)
//! - Reject transports this build cannot speak
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: AppConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;
use thiserror::Error;

use crate::config::schema::{AppConfig, QueryProtocol};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{field}: '{value}' is not a valid socket address")]
    InvalidAddress { field: &'static str, value: String },

    #[error("{0} must not be zero")]
    Zero(&'static str),

    #[error("{0} must not be empty")]
    Empty(&'static str),

    #[error("http.base_path '{0}' must be empty or start with '/'")]
    BasePath(String),

    #[error("query.protocol SSH is not supported, use RAW")]
    UnsupportedProtocol,
}

pub fn validate_config(config: &AppConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.http.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidAddress {
            field: "http.bind_address",
            value: config.http.bind_address.clone(),
        });
    }
    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::InvalidAddress {
            field: "observability.metrics_address",
            value: config.observability.metrics_address.clone(),
        });
    }

    let base = &config.http.base_path;
    if !base.is_empty() && !base.starts_with('/') {
        errors.push(ValidationError::BasePath(base.clone()));
    }

    if config.http.request_timeout_secs == 0 {
        errors.push(ValidationError::Zero("http.request_timeout_secs"));
    }
    if config.query.host.trim().is_empty() {
        errors.push(ValidationError::Empty("query.host"));
    }
    if config.query.protocol == QueryProtocol::Ssh {
        errors.push(ValidationError::UnsupportedProtocol);
    }
    if config.query.query_port == 0 {
        errors.push(ValidationError::Zero("query.query_port"));
    }
    if config.query.server_port == 0 {
        errors.push(ValidationError::Zero("query.server_port"));
    }
    if config.query.command_timeout_secs == 0 {
        errors.push(ValidationError::Zero("query.command_timeout_secs"));
    }
    if config.reload.timeout_secs == 0 {
        errors.push(ValidationError::Zero("reload.timeout_secs"));
    }
    if config.reload.command_prefix.is_empty() {
        errors.push(ValidationError::Empty("reload.command_prefix"));
    }
    if config.catalog.path.trim().is_empty() {
        errors.push(ValidationError::Empty("catalog.path"));
    }
    if config.database.path.trim().is_empty() {
        errors.push(ValidationError::Empty("database.path"));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
