//! Application configuration loaded from environment variables.

use common::Tier;

/// Server configuration with sensible defaults.
///
/// Reads from environment variables:
/// - `TIER` — which tier this instance runs as (default: `seller`)
/// - `HOST` — bind address (default: `"0.0.0.0"`)
/// - `PORT` — listen port (default: `3000`)
/// - `DATABASE_URL` — PostgreSQL URL; in-memory storage when unset
/// - `UPSTREAM_URL` — base URL of the tier orders are forwarded to
/// - `NOTIFY_URL` — base URL of the tier acceptance callbacks go to
/// - `PEER_BEARER_TOKEN` / `PEER_API_KEY` — outgoing gateway credentials
/// - `NOTIFY_API_KEY` — shared secret presented on acceptance callbacks
/// - `INBOUND_API_KEY` — shared secret required on incoming callbacks
/// - `JWT_SECRET` — HS256 secret for bearer tokens
/// - `RUST_LOG` — tracing filter directive (default: `"info"`)
#[derive(Debug, Clone)]
pub struct Config {
    pub tier: Tier,
    pub host: String,
    pub port: u16,
    pub database_url: Option<String>,
    pub upstream_url: Option<String>,
    pub notify_url: Option<String>,
    pub peer_bearer_token: Option<String>,
    pub peer_api_key: Option<String>,
    pub notify_api_key: String,
    pub inbound_api_key: String,
    pub jwt_secret: String,
    pub log_level: String,
}

impl Config {
    /// Loads configuration from environment variables, falling back to
    /// defaults.
    pub fn from_env() -> Self {
        let tier = std::env::var("TIER")
            .ok()
            .and_then(|t| Tier::parse(&t))
            .unwrap_or(Tier::Seller);
        Self {
            tier,
            host: std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: std::env::var("PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(3000),
            database_url: std::env::var("DATABASE_URL").ok(),
            upstream_url: std::env::var("UPSTREAM_URL").ok(),
            notify_url: std::env::var("NOTIFY_URL").ok(),
            peer_bearer_token: std::env::var("PEER_BEARER_TOKEN").ok(),
            peer_api_key: std::env::var("PEER_API_KEY").ok(),
            notify_api_key: std::env::var("NOTIFY_API_KEY")
                .unwrap_or_else(|_| "dev-api-key".to_string()),
            inbound_api_key: std::env::var("INBOUND_API_KEY")
                .unwrap_or_else(|_| "dev-api-key".to_string()),
            jwt_secret: std::env::var("JWT_SECRET")
                .unwrap_or_else(|_| "dev-secret-change-me-in-production".to_string()),
            log_level: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
        }
    }

    /// Returns the `"host:port"` bind address string.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            tier: Tier::Seller,
            host: "0.0.0.0".to_string(),
            port: 3000,
            database_url: None,
            upstream_url: None,
            notify_url: None,
            peer_bearer_token: None,
            peer_api_key: None,
            notify_api_key: "dev-api-key".to_string(),
            inbound_api_key: "dev-api-key".to_string(),
            jwt_secret: "dev-secret-change-me-in-production".to_string(),
            log_level: "info".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_values() {
        let config = Config::default();
        assert_eq!(config.tier, Tier::Seller);
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.port, 3000);
        assert!(config.database_url.is_none());
        assert!(config.upstream_url.is_none());
    }

    #[test]
    fn test_addr_formatting() {
        let config = Config {
            host: "127.0.0.1".to_string(),
            port: 8080,
            ..Config::default()
        };
        assert_eq!(config.addr(), "127.0.0.1:8080");
    }
}
