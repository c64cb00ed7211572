//! Server configuration.

use playground_client::ENDPOINT_ENV;

/// Environment variable overriding the bind address.
pub const BIND_ENV: &str = "PLAYGROUND_BIND";

/// Server configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    /// HTTP bind address.
    pub bind_addr: String,

    /// Endpoint used when a request does not name one.
    pub default_endpoint: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:3000".to_string(),
            default_endpoint: None,
        }
    }
}

impl ServerConfig {
    /// Defaults overridden by `PLAYGROUND_BIND` and `PLAYGROUND_ENDPOINT`.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            bind_addr: std::env::var(BIND_ENV)
                .ok()
                .filter(|v| !v.trim().is_empty())
                .unwrap_or(defaults.bind_addr),
            default_endpoint: std::env::var(ENDPOINT_ENV)
                .ok()
                .filter(|v| !v.trim().is_empty()),
        }
    }
}
