//! authgate configuration management
//!
//! Handles configuration from environment variables and TOML config files
//! with development-friendly defaults. The signing secret has no default:
//! [`AppConfig::validate`] rejects a configuration without one.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Longest accepted token lifetime (10 years)
pub const MAX_TOKEN_TTL_SECS: u64 = 10 * 365 * 24 * 60 * 60;

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    /// Server configuration
    pub server: ServerConfig,

    /// Token and password hashing configuration
    pub auth: AuthConfig,

    /// User store configuration
    pub store: StoreConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::default().with_env_override()
    }

    /// Load from a TOML file
    pub fn from_file(path: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        let path = path.into();
        let content = std::fs::read_to_string(&path).map_err(|e| ConfigError::FileReadError {
            path: path.clone(),
            source: e,
        })?;

        toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path,
            message: e.to_string(),
        })
    }

    /// Merge with environment variables (env takes precedence)
    pub fn with_env_override(mut self) -> Result<Self, ConfigError> {
        // Server
        if let Ok(host) = std::env::var("API_HOST") {
            self.server.host = host;
        }
        if let Some((key, port)) = env_first(&["API_PORT", "PORT"]) {
            self.server.port = parse_env(&key, port)?;
        }

        // Auth
        if let Some((_, secret)) = env_first(&["AUTHGATE_JWT_SECRET", "SECRET_KEY"]) {
            self.auth.jwt_secret = Some(secret);
        }
        if let Ok(issuer) = std::env::var("JWT_ISSUER") {
            self.auth.issuer = issuer;
        }
        if let Ok(ttl) = std::env::var("JWT_ACCESS_TTL_SECS") {
            self.auth.access_ttl_secs = parse_env("JWT_ACCESS_TTL_SECS", ttl)?;
        }
        if let Ok(ttl) = std::env::var("JWT_REFRESH_TTL_SECS") {
            self.auth.refresh_ttl_secs = parse_env("JWT_REFRESH_TTL_SECS", ttl)?;
        }
        if let Ok(flag) = std::env::var("AUTH_ENFORCE_CURRENT_TOKEN") {
            self.auth.enforce_current_token = parse_env("AUTH_ENFORCE_CURRENT_TOKEN", flag)?;
        }

        // Store
        if let Ok(timeout) = std::env::var("STORE_TIMEOUT_SECS") {
            self.store.timeout_secs = parse_env("STORE_TIMEOUT_SECS", timeout)?;
        }

        // Logging
        if let Ok(level) = std::env::var("LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Ok(json) = std::env::var("LOG_JSON") {
            self.logging.json_format = parse_env("LOG_JSON", json)?;
        }

        Ok(self)
    }

    /// Check the configuration before the server is allowed to start
    ///
    /// A missing or blank signing secret is a hard error: tokens must never be
    /// issued with a default or empty key.
    pub fn validate(&self) -> Result<(), ConfigError> {
        match self.auth.jwt_secret.as_deref() {
            Some(secret) if !secret.trim().is_empty() => {}
            _ => return Err(ConfigError::MissingRequired("jwt_secret".to_string())),
        }

        if self.auth.access_ttl_secs == 0 {
            return Err(ConfigError::InvalidValue {
                key: "access_ttl_secs".to_string(),
                value: "0".to_string(),
            });
        }
        for (key, ttl) in [
            ("access_ttl_secs", self.auth.access_ttl_secs),
            ("refresh_ttl_secs", self.auth.refresh_ttl_secs),
        ] {
            if ttl > MAX_TOKEN_TTL_SECS {
                return Err(ConfigError::InvalidValue {
                    key: key.to_string(),
                    value: ttl.to_string(),
                });
            }
        }
        if self.auth.refresh_ttl_secs <= self.auth.access_ttl_secs {
            return Err(ConfigError::InvalidValue {
                key: "refresh_ttl_secs".to_string(),
                value: self.auth.refresh_ttl_secs.to_string(),
            });
        }
        if self.store.timeout_secs == 0 {
            return Err(ConfigError::InvalidValue {
                key: "store.timeout_secs".to_string(),
                value: "0".to_string(),
            });
        }

        Ok(())
    }

    /// The validated signing secret
    pub fn jwt_secret(&self) -> Result<&str, ConfigError> {
        self.auth
            .jwt_secret
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .ok_or_else(|| ConfigError::MissingRequired("jwt_secret".to_string()))
    }
}

fn env_first(keys: &[&str]) -> Option<(String, String)> {
    keys.iter()
        .find_map(|key| std::env::var(key).ok().map(|v| (key.to_string(), v)))
}

fn parse_env<T: std::str::FromStr>(key: &str, value: String) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidValue {
        key: key.to_string(),
        value,
    })
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Host to bind to
    pub host: String,

    /// Port to listen on
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
        }
    }
}

/// Token issuance and password hashing configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// HMAC signing secret, required at startup
    #[serde(skip_serializing)]
    pub jwt_secret: Option<String>,

    /// Token issuer identifier
    pub issuer: String,

    /// Access token lifetime in seconds (default: 24 hours)
    pub access_ttl_secs: u64,

    /// Refresh token lifetime in seconds (default: 7 days)
    pub refresh_ttl_secs: u64,

    /// Reject access tokens that are no longer the user's stored token
    pub enforce_current_token: bool,

    /// Argon2 memory cost in KiB
    pub memory_cost: u32,

    /// Argon2 iterations
    pub time_cost: u32,

    /// Argon2 lanes
    pub parallelism: u32,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: None,
            issuer: "authgate".to_string(),
            access_ttl_secs: 24 * 60 * 60,
            refresh_ttl_secs: 168 * 60 * 60,
            enforce_current_token: false,
            memory_cost: 19456, // 19 MiB
            time_cost: 2,
            parallelism: 1,
        }
    }
}

/// User store configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Upper bound for a single store operation in seconds
    pub timeout_secs: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self { timeout_secs: 100 }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// JSON format for logs
    pub json_format: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json_format: false,
        }
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    FileReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {message}")]
    ParseError { path: PathBuf, message: String },

    #[error("Invalid value for {key}: {value}")]
    InvalidValue { key: String, value: String },

    #[error("Missing required configuration: {0}")]
    MissingRequired(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn with_secret(secret: &str) -> AppConfig {
        let mut config = AppConfig::default();
        config.auth.jwt_secret = Some(secret.to_string());
        config
    }

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.server.port, 8000);
        assert_eq!(config.auth.access_ttl_secs, 86_400);
        assert_eq!(config.auth.refresh_ttl_secs, 604_800);
        assert_eq!(config.store.timeout_secs, 100);
        assert!(config.auth.jwt_secret.is_none());
    }

    #[test]
    fn test_missing_secret_is_rejected() {
        let config = AppConfig::default();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::MissingRequired(ref key)) if key == "jwt_secret"
        ));

        let blank = with_secret("   ");
        assert!(blank.validate().is_err());
        assert!(blank.jwt_secret().is_err());
    }

    #[test]
    fn test_valid_config() {
        let config = with_secret("a-long-enough-signing-secret");
        assert!(config.validate().is_ok());
        assert_eq!(config.jwt_secret().unwrap(), "a-long-enough-signing-secret");
    }

    #[test]
    fn test_refresh_must_outlive_access() {
        let mut config = with_secret("secret");
        config.auth.refresh_ttl_secs = config.auth.access_ttl_secs;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue { .. })
        ));

        config.auth.access_ttl_secs = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_token_lifetimes_are_capped() {
        let mut config = with_secret("secret");
        config.auth.access_ttl_secs = 10_000_000_000_000;
        config.auth.refresh_ttl_secs = 20_000_000_000_000;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue { ref key, .. }) if key == "access_ttl_secs"
        ));

        config.auth.access_ttl_secs = 3600;
        config.auth.refresh_ttl_secs = MAX_TOKEN_TTL_SECS + 1;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue { ref key, .. }) if key == "refresh_ttl_secs"
        ));

        config.auth.refresh_ttl_secs = MAX_TOKEN_TTL_SECS;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_toml() {
        let config: AppConfig = toml::from_str(
            r#"
            [server]
            port = 9100

            [auth]
            jwt_secret = "from-file"
            access_ttl_secs = 600
            "#,
        )
        .unwrap();

        assert_eq!(config.server.port, 9100);
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.auth.jwt_secret.as_deref(), Some("from-file"));
        assert_eq!(config.auth.access_ttl_secs, 600);
        assert_eq!(config.auth.refresh_ttl_secs, 604_800);
    }

    #[test]
    fn test_secret_is_not_serialized() {
        let config = with_secret("do-not-leak");
        let json = serde_json::to_string(&config).unwrap();
        assert!(!json.contains("do-not-leak"));
    }
}
