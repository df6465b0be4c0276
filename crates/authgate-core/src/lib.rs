//! authgate core - domain models, configuration and storage traits
//!
//! This crate defines the shared abstractions used by the API server and CLI:
//! - User account model and the closed role set
//! - The `UserStore` persistence trait and an in-memory implementation
//! - Configuration management

pub mod config;
pub mod store;
pub mod user;

pub use config::{
    AppConfig, AuthConfig, ConfigError, LoggingConfig, ServerConfig, StoreConfig,
    MAX_TOKEN_TTL_SECS,
};
pub use store::{InMemoryUserStore, StoreError, UserPage, UserStore};
pub use user::{UnknownRole, User, UserField, UserRole};
