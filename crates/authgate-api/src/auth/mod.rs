//! Authentication and authorization module
//!
//! This module provides JWT-based authentication with the following components:
//! - Password hashing with Argon2id
//! - Access/refresh token issuance and validation
//! - Current token pair storage per user
//! - Middleware for request authentication
//! - Role and ownership authorization rules
//! - Authentication service for signup, login and user lookup

pub mod jwt;
pub mod middleware;
pub mod password;
pub mod policy;
pub mod repository;
pub mod service;
pub mod token_store;

pub use jwt::{Claims, IdentityClaims, JwtConfig, JwtError, TokenIssuer, TokenKind, TokenValidator};
pub use middleware::{auth_middleware, AuthError, AuthenticatedUser};
pub use password::{PasswordConfig, PasswordError, PasswordHasher};
pub use policy::{require_role, require_self_or_role, Decision};
pub use repository::{RepositoryError, UserRepository};
pub use service::{
    AuthResponse, AuthService, ListUsersQuery, LoginRequest, RefreshRequest, SignupRequest,
    UserInfo, UsersPage,
};
pub use token_store::{StoredTokens, TokenStore};
