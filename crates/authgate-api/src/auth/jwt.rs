//! JWT token issuance and validation
//!
//! Implements HMAC-SHA256 signed access/refresh token pairs. Both tokens
//! carry the same identity claims plus a `token_type` discriminant; only the
//! expiry differs. Validation is stateless: signature, structure and expiry
//! against a caller-supplied clock.

use authgate_core::{AppConfig, ConfigError, User, UserRole};
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Token type discriminant embedded in every token
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    Access,
    Refresh,
}

/// JWT Claims structure
///
/// These claims are embedded in both tokens of a pair and extracted during
/// validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Token issuer
    pub iss: String,
    /// Subject - user ID
    #[serde(rename = "sub")]
    pub user_id: String,
    /// Unique token identifier
    pub jti: String,
    /// Issued at (Unix seconds)
    #[serde(rename = "iat")]
    pub issued_at: i64,
    /// Expiration (Unix seconds)
    #[serde(rename = "exp")]
    pub expires_at: i64,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub role: UserRole,
    pub token_type: TokenKind,
}

/// Identity fields a token pair is issued for
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentityClaims {
    pub user_id: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub role: UserRole,
}

impl From<&User> for IdentityClaims {
    fn from(user: &User) -> Self {
        Self {
            user_id: user.user_id.clone(),
            email: user.email.clone(),
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            role: user.role,
        }
    }
}

/// Freshly issued access/refresh pair
#[derive(Debug, Clone)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
    /// Expiry of the access token
    pub access_expires_at: DateTime<Utc>,
    /// Expiry of the refresh token
    pub refresh_expires_at: DateTime<Utc>,
}

/// JWT issuance and validation errors
#[derive(Debug, Error)]
pub enum JwtError {
    #[error("Failed to sign token: {0}")]
    Signing(#[from] jsonwebtoken::errors::Error),

    #[error("Malformed token")]
    Malformed,

    #[error("Invalid token signature")]
    BadSignature,

    #[error("Token has expired")]
    Expired,

    #[error("Unexpected token type")]
    WrongTokenType,

    #[error("Token lifetime of {0}s is out of range")]
    LifetimeOutOfRange(u64),
}

impl JwtError {
    /// Stable machine-readable rejection reason
    pub fn reason_code(&self) -> &'static str {
        match self {
            JwtError::Signing(_) => "TOKEN_SIGNING_FAILED",
            JwtError::Malformed => "TOKEN_MALFORMED",
            JwtError::BadSignature => "TOKEN_BAD_SIGNATURE",
            JwtError::Expired => "TOKEN_EXPIRED",
            JwtError::WrongTokenType => "TOKEN_WRONG_TYPE",
            JwtError::LifetimeOutOfRange(_) => "TOKEN_LIFETIME_OUT_OF_RANGE",
        }
    }
}

/// JWT Configuration
///
/// Deliberately has no `Default`: the secret must come from configuration.
#[derive(Clone)]
pub struct JwtConfig {
    /// Secret key for HMAC signing
    pub secret: String,
    /// Token issuer identifier
    pub issuer: String,
    /// Access token lifetime in seconds
    pub access_ttl_secs: u64,
    /// Refresh token lifetime in seconds
    pub refresh_ttl_secs: u64,
}

impl std::fmt::Debug for JwtConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtConfig")
            .field("secret", &"<redacted>")
            .field("issuer", &self.issuer)
            .field("access_ttl_secs", &self.access_ttl_secs)
            .field("refresh_ttl_secs", &self.refresh_ttl_secs)
            .finish()
    }
}

impl JwtConfig {
    /// Configuration with the default issuer and lifetimes (24h / 7d)
    pub fn new(secret: impl Into<String>) -> Self {
        let defaults = authgate_core::AuthConfig::default();
        Self {
            secret: secret.into(),
            issuer: defaults.issuer,
            access_ttl_secs: defaults.access_ttl_secs,
            refresh_ttl_secs: defaults.refresh_ttl_secs,
        }
    }

    /// Build from a validated application config
    pub fn from_app_config(config: &AppConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            secret: config.jwt_secret()?.to_string(),
            issuer: config.auth.issuer.clone(),
            access_ttl_secs: config.auth.access_ttl_secs,
            refresh_ttl_secs: config.auth.refresh_ttl_secs,
        })
    }
}

/// Signs access/refresh token pairs
#[derive(Clone)]
pub struct TokenIssuer {
    encoding_key: EncodingKey,
    issuer: String,
    access_ttl_secs: u64,
    refresh_ttl_secs: u64,
}

impl TokenIssuer {
    pub fn new(config: &JwtConfig) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(config.secret.as_bytes()),
            issuer: config.issuer.clone(),
            access_ttl_secs: config.access_ttl_secs,
            refresh_ttl_secs: config.refresh_ttl_secs,
        }
    }

    /// Access token lifetime in seconds
    pub fn access_ttl_secs(&self) -> u64 {
        self.access_ttl_secs
    }

    /// Issue a token pair stamped with the current time
    pub fn issue(&self, identity: &IdentityClaims) -> Result<TokenPair, JwtError> {
        self.issue_at(identity, Utc::now())
    }

    /// Issue a token pair as of `now`
    pub fn issue_at(
        &self,
        identity: &IdentityClaims,
        now: DateTime<Utc>,
    ) -> Result<TokenPair, JwtError> {
        let access_expires_at = expiry(now, self.access_ttl_secs)?;
        let refresh_expires_at = expiry(now, self.refresh_ttl_secs)?;

        let access_token = self.sign(identity, TokenKind::Access, now, access_expires_at)?;
        let refresh_token = self.sign(identity, TokenKind::Refresh, now, refresh_expires_at)?;

        Ok(TokenPair {
            access_token,
            refresh_token,
            access_expires_at,
            refresh_expires_at,
        })
    }

    fn sign(
        &self,
        identity: &IdentityClaims,
        kind: TokenKind,
        issued_at: DateTime<Utc>,
        expires_at: DateTime<Utc>,
    ) -> Result<String, JwtError> {
        let claims = Claims {
            iss: self.issuer.clone(),
            user_id: identity.user_id.clone(),
            jti: Uuid::new_v4().to_string(),
            issued_at: issued_at.timestamp(),
            expires_at: expires_at.timestamp(),
            email: identity.email.clone(),
            first_name: identity.first_name.clone(),
            last_name: identity.last_name.clone(),
            role: identity.role,
            token_type: kind,
        };

        Ok(encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &self.encoding_key,
        )?)
    }
}

/// `now + ttl_secs`, or an error when it does not fit in a timestamp
fn expiry(now: DateTime<Utc>, ttl_secs: u64) -> Result<DateTime<Utc>, JwtError> {
    i64::try_from(ttl_secs)
        .ok()
        .and_then(Duration::try_seconds)
        .and_then(|ttl| now.checked_add_signed(ttl))
        .ok_or(JwtError::LifetimeOutOfRange(ttl_secs))
}

/// Verifies token signature, structure and expiry
#[derive(Clone)]
pub struct TokenValidator {
    decoding_key: DecodingKey,
    validation: Validation,
}

impl TokenValidator {
    pub fn new(config: &JwtConfig) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[&config.issuer]);
        validation.set_required_spec_claims(&["exp", "iat", "sub", "iss"]);
        // Expiry is checked against the caller's clock in `validate_at`.
        validation.validate_exp = false;
        validation.leeway = 0;

        Self {
            decoding_key: DecodingKey::from_secret(config.secret.as_bytes()),
            validation,
        }
    }

    /// Validate a token of either type against the current time
    pub fn validate(&self, token: &str) -> Result<Claims, JwtError> {
        self.validate_at(token, Utc::now())
    }

    /// Validate a token of either type as of `now`
    ///
    /// The token is valid while `now <= expires_at`.
    pub fn validate_at(&self, token: &str, now: DateTime<Utc>) -> Result<Claims, JwtError> {
        let token_data = decode::<Claims>(token, &self.decoding_key, &self.validation).map_err(
            |e| match e.kind() {
                ErrorKind::InvalidSignature => JwtError::BadSignature,
                _ => JwtError::Malformed,
            },
        )?;

        let claims = token_data.claims;
        if claims.expires_at <= claims.issued_at {
            return Err(JwtError::Malformed);
        }
        if now.timestamp() > claims.expires_at {
            return Err(JwtError::Expired);
        }

        Ok(claims)
    }

    /// Validate and require an access token
    pub fn validate_access_at(&self, token: &str, now: DateTime<Utc>) -> Result<Claims, JwtError> {
        Self::expect_kind(self.validate_at(token, now)?, TokenKind::Access)
    }

    /// Validate and require a refresh token
    pub fn validate_refresh_at(
        &self,
        token: &str,
        now: DateTime<Utc>,
    ) -> Result<Claims, JwtError> {
        Self::expect_kind(self.validate_at(token, now)?, TokenKind::Refresh)
    }

    fn expect_kind(claims: Claims, kind: TokenKind) -> Result<Claims, JwtError> {
        if claims.token_type != kind {
            return Err(JwtError::WrongTokenType);
        }
        Ok(claims)
    }
}
