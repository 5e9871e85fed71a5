//! Process-level wiring for the HTTP transport (§6 "Environment
//! variables" — secrets and process wiring only, never behavior).

use std::net::SocketAddr;
use std::time::Duration;

use lex_core::{LexError, LexResult};

/// Bind address, CORS, and shutdown-drain settings. Unlike [`LexConfig`]
/// (behavior), these are read from the environment per §6's split.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub bind_host: String,
    pub bind_port: u16,
    /// Empty means allow all origins (development default).
    pub cors_origins: Vec<String>,
    /// How long graceful shutdown waits for in-flight requests to drain
    /// before refusing the rest (§6 "Graceful shutdown drains in-flight
    /// requests up to a deadline").
    pub shutdown_drain: Duration,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            bind_host: "0.0.0.0".to_string(),
            bind_port: 8080,
            cors_origins: Vec::new(),
            shutdown_drain: Duration::from_secs(30),
        }
    }
}

impl ApiConfig {
    /// `LEX_API_BIND` / `PORT` / `LEX_API_CORS_ORIGINS` /
    /// `LEX_API_SHUTDOWN_DRAIN_MS` — process wiring only (§6).
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(host) = std::env::var("LEX_API_BIND") {
            config.bind_host = host;
        }
        if let Ok(port) = std::env::var("PORT").or_else(|_| std::env::var("LEX_API_PORT")) {
            if let Ok(port) = port.parse() {
                config.bind_port = port;
            }
        }
        if let Ok(origins) = std::env::var("LEX_API_CORS_ORIGINS") {
            config.cors_origins =
                origins.split(',').map(|o| o.trim().to_string()).filter(|o| !o.is_empty()).collect();
        }
        if let Ok(ms) = std::env::var("LEX_API_SHUTDOWN_DRAIN_MS") {
            if let Ok(ms) = ms.parse() {
                config.shutdown_drain = Duration::from_millis(ms);
            }
        }

        config
    }

    pub fn bind_addr(&self) -> LexResult<SocketAddr> {
        format!("{}:{}", self.bind_host, self.bind_port)
            .parse()
            .map_err(|e| LexError::Internal(format!("invalid bind address: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_binds_all_interfaces_on_8080() {
        let config = ApiConfig::default();
        assert_eq!(config.bind_addr().unwrap().port(), 8080);
    }
}
