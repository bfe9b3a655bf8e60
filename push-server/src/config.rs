//! Configuration module for environment variable parsing.
//!
//! Reads all configuration from environment variables.

use std::env;
use tracing::warn;

/// Push URL path used when `WECHAT_PATH` is unset or invalid.
pub const DEFAULT_PATH: &str = "/wechat";

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Port for the web server to listen on
    pub port: u16,

    /// Token shared with the platform, used to compute request signatures
    pub token: String,

    /// Path the platform pushes to
    pub path: String,

    /// Largest request body accepted on delivery
    pub max_body_bytes: usize,

    /// Initial body buffer capacity of each pooled scratch unit
    pub scratch_body_capacity: usize,

    /// Maximum number of idle scratch units kept for reuse
    pub scratch_pool_max_idle: usize,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            port: 8080,
            token: String::new(),
            path: DEFAULT_PATH.to_string(),
            max_body_bytes: 1024 * 1024,
            scratch_body_capacity: 4096,
            scratch_pool_max_idle: 256,
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        let defaults = Config::default();

        Config {
            port: parse_var("PORT").unwrap_or(defaults.port),

            token: env::var("WECHAT_TOKEN").unwrap_or_default(),

            path: parse_path("WECHAT_PATH"),

            max_body_bytes: parse_var("MAX_BODY_BYTES").unwrap_or(defaults.max_body_bytes),

            scratch_body_capacity: parse_var("SCRATCH_BODY_CAPACITY")
                .unwrap_or(defaults.scratch_body_capacity),

            scratch_pool_max_idle: parse_var("SCRATCH_POOL_MAX_IDLE")
                .unwrap_or(defaults.scratch_pool_max_idle),
        }
    }

    /// Whether a signing token is configured.
    pub fn has_token(&self) -> bool {
        !self.token.trim().is_empty()
    }
}

/// Parse a variable into `T`, warning when it is set but unparsable.
fn parse_var<T: std::str::FromStr>(name: &str) -> Option<T> {
    let raw = env::var(name).ok()?;
    match raw.trim().parse() {
        Ok(v) => Some(v),
        Err(_) => {
            warn!(env_var = name, value = %raw, "Invalid value, using default");
            None
        }
    }
}

/// Read the push path; it must be absolute and must not shadow `/health`.
fn parse_path(name: &str) -> String {
    let raw = match env::var(name) {
        Ok(v) => v,
        Err(_) => return DEFAULT_PATH.to_string(),
    };

    let path = raw.trim();
    if !path.starts_with('/') || path == "/health" {
        warn!(env_var = name, value = %raw, "Invalid path, using default");
        return DEFAULT_PATH.to_string();
    }

    path.to_string()
}
