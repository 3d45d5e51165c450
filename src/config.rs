//! Gateway configuration

use axum::http::{HeaderName, Method};
use serde::Deserialize;
use std::fmt;
use std::path::Path;
use thiserror::Error;

use crate::models::{Account, Follow, Post, Tenant, Tier};

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Root gateway configuration
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    pub server: ServerConfig,
    pub auth: AuthConfig,
    pub rate_limit: RateLimitConfig,
    pub cors: CorsConfig,
    /// Seed records for the in-memory tenant registry
    pub tenants: Vec<Tenant>,
    /// Seed records shared by the registry and the content store
    pub accounts: Vec<Account>,
    pub content: ContentSeed,
}

/// HTTP server
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".into(),
            port: 8002,
        }
    }
}

/// Token signing
#[derive(Clone, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub issuer: String,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: String::new(),
            issuer: "nodebird".into(),
        }
    }
}

impl fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthConfig")
            .field("jwt_secret", &"***")
            .field("issuer", &self.issuer)
            .finish()
    }
}

/// Quota for one tier
#[derive(Debug, Clone, Deserialize)]
pub struct TierLimit {
    pub max_requests: u64,
    /// Message returned with the 429
    pub message: String,
}

/// Rate limiting
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RateLimitConfig {
    pub window_secs: u64,
    pub free: TierLimit,
    pub premium: TierLimit,
    /// Upper bound on tracked windows
    pub max_tracked_windows: usize,
    pub sweep_interval_secs: u64,
}

impl RateLimitConfig {
    pub fn for_tier(&self, tier: Tier) -> &TierLimit {
        match tier {
            Tier::Free => &self.free,
            Tier::Premium => &self.premium,
        }
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            window_secs: 60,
            free: TierLimit {
                max_requests: 100,
                message: "free tier is limited to 100 requests per minute".into(),
            },
            premium: TierLimit {
                max_requests: 1000,
                message: "premium tier is limited to 1000 requests per minute".into(),
            },
            max_tracked_windows: 10_000,
            sweep_interval_secs: 60,
        }
    }
}

/// Headers sent for registered origins
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CorsConfig {
    pub allow_methods: Vec<String>,
    pub allow_headers: Vec<String>,
    pub max_age_secs: u64,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allow_methods: vec!["GET".into(), "POST".into(), "OPTIONS".into()],
            allow_headers: vec!["authorization".into(), "content-type".into()],
            max_age_secs: 600,
        }
    }
}

impl CorsConfig {
    /// Methods granted to registered origins
    pub fn methods(&self) -> Result<Vec<Method>, ConfigError> {
        self.allow_methods
            .iter()
            .map(|m| {
                m.parse::<Method>()
                    .map_err(|_| ConfigError::Invalid(format!("cors.allow_methods: bad method {:?}", m)))
            })
            .collect()
    }

    /// Request headers granted to registered origins
    pub fn headers(&self) -> Result<Vec<HeaderName>, ConfigError> {
        self.allow_headers
            .iter()
            .map(|h| {
                h.parse::<HeaderName>()
                    .map_err(|_| ConfigError::Invalid(format!("cors.allow_headers: bad header {:?}", h)))
            })
            .collect()
    }
}

/// Seed data for the in-memory content store
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ContentSeed {
    pub posts: Vec<Post>,
    pub follows: Vec<Follow>,
}

impl GatewayConfig {
    /// Load from a JSON file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Load from `CONFIG_PATH` (or `gateway.json`), apply environment
    /// overrides and validate
    pub fn from_env() -> Result<Self, ConfigError> {
        let path = std::env::var("CONFIG_PATH").unwrap_or_else(|_| "gateway.json".into());

        let mut config = match Self::load(&path) {
            Ok(config) => config,
            Err(ConfigError::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::warn!(%path, "config not found, using defaults");
                Self::default()
            }
            Err(e) => return Err(e),
        };

        config.apply_overrides(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Apply `JWT_SECRET`, `GATEWAY_ISSUER` and `PORT`
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(secret) = lookup("JWT_SECRET") {
            self.auth.jwt_secret = secret;
        }
        if let Some(issuer) = lookup("GATEWAY_ISSUER") {
            self.auth.issuer = issuer;
        }
        if let Some(port) = lookup("PORT") {
            match port.parse() {
                Ok(port) => self.server.port = port,
                Err(_) => tracing::warn!(%port, "ignoring unparseable PORT"),
            }
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.auth.jwt_secret.is_empty() {
            return Err(ConfigError::Invalid("auth.jwt_secret must be set".into()));
        }
        if self.rate_limit.window_secs == 0 {
            return Err(ConfigError::Invalid("rate_limit.window_secs must be positive".into()));
        }
        if self.rate_limit.free.max_requests == 0 || self.rate_limit.premium.max_requests == 0 {
            return Err(ConfigError::Invalid("tier limits must be positive".into()));
        }
        if self.rate_limit.max_tracked_windows == 0 {
            return Err(ConfigError::Invalid(
                "rate_limit.max_tracked_windows must be positive".into(),
            ));
        }
        self.cors.methods()?;
        self.cors.headers()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults_keep_tier_intent() {
        let config = RateLimitConfig::default();
        assert_eq!(config.for_tier(Tier::Free).max_requests, 100);
        assert_eq!(config.for_tier(Tier::Premium).max_requests, 1000);
        assert_eq!(config.window_secs, 60);
    }

    #[test]
    fn test_parse_partial_json() {
        let config: GatewayConfig = serde_json::from_str(
            r#"{
                "auth": { "jwt_secret": "s3cret" },
                "tenants": [
                    { "host": "app.example.com", "clientSecret": "abc123", "tier": "premium", "accountId": 7 }
                ],
                "accounts": [ { "id": 7, "nick": "kim" } ]
            }"#,
        )
        .unwrap();

        assert_eq!(config.auth.issuer, "nodebird");
        assert_eq!(config.server.port, 8002);
        assert_eq!(config.tenants[0].tier, Tier::Premium);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> =
            [("JWT_SECRET", "from-env"), ("PORT", "9000")].into_iter().collect();

        let mut config = GatewayConfig::default();
        config.apply_overrides(|key| env.get(key).map(|v| v.to_string()));

        assert_eq!(config.auth.jwt_secret, "from-env");
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.auth.issuer, "nodebird");
    }

    #[test]
    fn test_missing_secret_rejected() {
        assert!(matches!(GatewayConfig::default().validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_bad_cors_entries_rejected() {
        let mut config = GatewayConfig::default();
        config.auth.jwt_secret = "s3cret".into();
        assert_eq!(config.cors.methods().unwrap(), vec![Method::GET, Method::POST, Method::OPTIONS]);

        config.cors.allow_headers.push("bad header".into());
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_secret_not_in_debug() {
        let mut config = GatewayConfig::default();
        config.auth.jwt_secret = "hunter2".into();
        assert!(!format!("{:?}", config).contains("hunter2"));
    }
}
