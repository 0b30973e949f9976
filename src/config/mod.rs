//! Typed configuration from environment variables.
//!
//! Loads once at startup, fails fast if required vars are missing.
//! Sensitive values wrapped in secrecy::SecretString to prevent log leaks.

use crate::error::{Error, Result};
use secrecy::SecretString;
use std::net::SocketAddr;
use std::path::PathBuf;

pub const DEFAULT_MODEL: &str = "claude-sonnet-4-20250514";
pub const DEFAULT_BIND: &str = "127.0.0.1:8080";

#[derive(Debug)]
pub struct Config {
    pub database_url: SecretString,
    pub anthropic_api_key: SecretString,
    pub otel_endpoint: Option<String>,
    pub log_level: String,
    /// Completion model used for both classification and grouping.
    pub model: String,
    pub bind_addr: SocketAddr,
    /// Optional TOML file replacing the built-in category set.
    pub taxonomy_path: Option<PathBuf>,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// In local dev, call `dotenvy::dotenv().ok()` before this.
    pub fn from_env() -> Result<Self> {
        let bind = std::env::var("TRIAGE_BIND").unwrap_or_else(|_| DEFAULT_BIND.to_string());
        let bind_addr = bind
            .parse()
            .map_err(|e| Error::Config(format!("TRIAGE_BIND {bind:?} is not a socket address: {e}")))?;

        Ok(Self {
            database_url: SecretString::from(required_var("DATABASE_URL")?),
            anthropic_api_key: SecretString::from(required_var("ANTHROPIC_API_KEY")?),
            otel_endpoint: std::env::var("OTEL_ENDPOINT").ok(),
            log_level: std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            model: std::env::var("TRIAGE_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string()),
            bind_addr,
            taxonomy_path: std::env::var("TRIAGE_TAXONOMY").ok().map(PathBuf::from),
        })
    }
}

fn required_var(name: &str) -> Result<String> {
    std::env::var(name)
        .map_err(|_| Error::Config(format!("required environment variable {name} is not set")))
}
