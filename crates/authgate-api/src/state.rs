//! Application state management
//!
//! Built once at startup from a validated [`AppConfig`] and shared across
//! handlers behind an `Arc`. Nothing in here is mutated after construction.

use crate::auth::{
    AuthService, JwtConfig, PasswordConfig, PasswordError, PasswordHasher, TokenIssuer,
    TokenStore, TokenValidator, UserRepository,
};
use authgate_core::{AppConfig, ConfigError, UserStore};
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;

/// Errors that abort startup
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("Invalid password hashing parameters: {0}")]
    Password(#[from] PasswordError),
}

/// Application state shared across handlers
pub struct AppState {
    /// Application configuration
    pub config: AppConfig,
    /// Server start time
    pub start_time: Instant,
    /// Signup, login, refresh and user lookup
    pub auth: AuthService,
    /// Access token validation for the auth middleware
    pub validator: TokenValidator,
    /// Current token pair lookup for current-token enforcement
    pub tokens: TokenStore,
}

impl AppState {
    /// Validate `config` and wire every component against `store`
    pub fn new(config: AppConfig, store: Arc<dyn UserStore>) -> Result<Self, StartupError> {
        config.validate()?;

        let jwt = JwtConfig::from_app_config(&config)?;
        let hasher = PasswordHasher::new(&PasswordConfig::from(&config.auth))?;
        let validator = TokenValidator::new(&jwt);

        let users = UserRepository::new(store, Duration::from_secs(config.store.timeout_secs));
        let tokens = TokenStore::new(users.clone());
        let auth = AuthService::new(hasher, TokenIssuer::new(&jwt), validator.clone(), users)?;

        tracing::debug!(
            issuer = %jwt.issuer,
            access_ttl_secs = jwt.access_ttl_secs,
            refresh_ttl_secs = jwt.refresh_ttl_secs,
            enforce_current_token = config.auth.enforce_current_token,
            "application state initialized"
        );

        Ok(Self {
            config,
            start_time: Instant::now(),
            auth,
            validator,
            tokens,
        })
    }

    /// Get uptime in seconds
    pub fn uptime_secs(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }
}
