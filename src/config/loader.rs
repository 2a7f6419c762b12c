//! Configuration loading from disk and environment.

use std::fs;
use std::path::Path;
use std::str::FromStr;
use thiserror::Error;

use crate::config::schema::AppConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Names the optional TOML config file.
pub const CONFIG_PATH_VAR: &str = "VOICE_CONTROL_CONFIG";

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[source] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[source] toml::de::Error),

    #[error("Invalid value '{value}' for environment variable {key}")]
    Env { key: &'static str, value: String },

    #[error("Validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Parse a TOML file without validating it.
pub fn read_config_file(path: &Path) -> Result<AppConfig, ConfigError> {
    let content = fs::read_to_string(path).map_err(ConfigError::Io)?;
    toml::from_str(&content).map_err(ConfigError::Parse)
}

/// Load and validate configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<AppConfig, ConfigError> {
    let config = read_config_file(path)?;
    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}

/// Build the runtime configuration: defaults, then the optional file named by
/// `VOICE_CONTROL_CONFIG`, then `.env`, then the process environment.
pub fn load_from_env() -> Result<AppConfig, ConfigError> {
    dotenvy::dotenv().ok();

    let mut config = match std::env::var(CONFIG_PATH_VAR) {
        Ok(path) => read_config_file(Path::new(&path))?,
        Err(_) => AppConfig::default(),
    };

    apply_env_overrides(&mut config, |key| std::env::var(key).ok())?;
    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}

/// Overlay environment variables onto `config`.
///
/// `lookup` abstracts the environment so overrides can be tested without
/// touching process state.
pub fn apply_env_overrides<F>(config: &mut AppConfig, lookup: F) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(port) = parsed::<u16, _>(&lookup, "PORT")? {
        config.http.bind_address = format!("0.0.0.0:{}", port);
    }
    if let Some(path) = lookup("DATABASE_PATH") {
        config.database.path = path;
    }
    if let Some(backend) = parsed(&lookup, "DATABASE_BACKEND")? {
        config.database.backend = backend;
    }
    if let Some(host) = lookup("TS_IP") {
        config.query.host = host;
    }
    if let Some(protocol) = parsed(&lookup, "TS_QUERY_PROTO")? {
        config.query.protocol = protocol;
    }
    if let Some(port) = parsed(&lookup, "TS_QUERY_PORT")? {
        config.query.query_port = port;
    }
    if let Some(port) = parsed(&lookup, "TS_VOICE_PORT")? {
        config.query.server_port = port;
    }
    if let Some(login) = lookup("TS_QUERY_LOGIN") {
        config.query.username = login;
    }
    if let Some(password) = lookup("TS_QUERY_PASS") {
        config.query.password = password;
    }
    if let Some(nickname) = lookup("BOT_NAME") {
        config.query.nickname = nickname;
    }
    if let Some(prefix) = lookup("COMMAND_PREFIX") {
        config.reload.command_prefix = prefix;
    }
    if let Some(path) = lookup("CATALOG_PATH") {
        config.catalog.path = path;
    }
    if let Some(address) = lookup("METRICS_ADDRESS") {
        config.observability.metrics_enabled = true;
        config.observability.metrics_address = address;
    }
    Ok(())
}

fn parsed<T, F>(lookup: &F, key: &'static str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(value) => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::Env { key, value }),
        None => Ok(None),
    }
}
