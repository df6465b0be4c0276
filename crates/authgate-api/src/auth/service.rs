//! Authentication service layer
//!
//! Business logic for signup, login, token refresh and user lookup. Handlers
//! stay thin: they extract the request, call into [`AuthService`] and
//! return whatever it produces.

use super::jwt::{IdentityClaims, TokenIssuer, TokenPair, TokenValidator};
use super::middleware::AuthenticatedUser;
use super::password::{PasswordError, PasswordHasher};
use super::policy::{require_role, require_self_or_role, Decision};
use super::repository::{RepositoryError, UserRepository};
use super::token_store::TokenStore;
use crate::audit::{audit_log, AuditEvent, ClientInfo};
use crate::error::AppError;
use authgate_core::{StoreError, User, UserField, UserRole};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::{Validate, ValidationError};

const DEFAULT_RECORDS_PER_PAGE: i64 = 10;
const INVALID_CREDENTIALS: &str = "email or password is incorrect";
const ALREADY_REGISTERED: &str = "email or phone number already exists";

/// User signup request
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct SignupRequest {
    #[validate(length(min = 2, max = 100))]
    pub first_name: String,
    #[validate(length(min = 2, max = 100))]
    pub last_name: String,
    #[validate(length(min = 6))]
    pub password: String,
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 1))]
    pub phone: String,
    /// `ADMIN` or `USER`
    #[validate(custom(function = "validate_user_type"))]
    pub user_type: String,
}

fn validate_user_type(user_type: &str) -> Result<(), ValidationError> {
    user_type
        .parse::<UserRole>()
        .map(|_| ())
        .map_err(|_| ValidationError::new("user_type"))
}

/// User login request
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct LoginRequest {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 1))]
    pub password: String,
}

/// Token refresh request
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

/// Pagination for the user listing
///
/// Both parameters are taken as raw strings so that an empty or
/// non-numeric value falls back to the default instead of rejecting the
/// request.
#[derive(Debug, Clone, Default, Serialize, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ListUsersQuery {
    /// Page size; missing, unparseable or below 1 falls back to 10
    #[serde(rename = "recordPerPage")]
    pub record_per_page: Option<String>,
    /// 1-based page number; missing, unparseable or below 1 falls back to 1
    pub page: Option<String>,
}

fn positive_or(raw: Option<&str>, default: i64) -> i64 {
    raw.and_then(|v| v.trim().parse::<i64>().ok())
        .filter(|n| *n >= 1)
        .unwrap_or(default)
}

impl ListUsersQuery {
    /// Resolve into `(offset, limit)`
    pub fn offset_limit(&self) -> (usize, usize) {
        let limit = positive_or(self.record_per_page.as_deref(), DEFAULT_RECORDS_PER_PAGE);
        let page = positive_or(self.page.as_deref(), 1);

        let offset = (page - 1).saturating_mul(limit);
        (
            usize::try_from(offset).unwrap_or(usize::MAX),
            usize::try_from(limit).unwrap_or(usize::MAX),
        )
    }
}

/// Authentication response with tokens
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AuthResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: String,
    /// Access token lifetime in seconds
    pub expires_in: u64,
    pub user: UserInfo,
}

/// Public view of a user record
///
/// Never carries the password hash or the stored tokens.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UserInfo {
    pub user_id: String,
    pub email: String,
    pub phone: String,
    pub first_name: String,
    pub last_name: String,
    #[schema(value_type = String, example = "USER")]
    pub role: UserRole,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&User> for UserInfo {
    fn from(user: &User) -> Self {
        Self {
            user_id: user.user_id.clone(),
            email: user.email.clone(),
            phone: user.phone.clone(),
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            role: user.role,
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}

/// One page of users
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UsersPage {
    pub total_count: u64,
    pub user_items: Vec<UserInfo>,
}

/// Authentication service
///
/// Cheap to clone; every component is either immutable or shares the
/// underlying store handle.
#[derive(Clone)]
pub struct AuthService {
    hasher: PasswordHasher,
    /// Verified against on unknown-email logins so both failures cost one hash
    dummy_hash: Arc<str>,
    issuer: TokenIssuer,
    validator: TokenValidator,
    users: UserRepository,
    tokens: TokenStore,
}

impl AuthService {
    pub fn new(
        hasher: PasswordHasher,
        issuer: TokenIssuer,
        validator: TokenValidator,
        users: UserRepository,
    ) -> Result<Self, PasswordError> {
        let dummy_hash = Arc::from(hasher.hash(&Uuid::new_v4().to_string())?);
        let tokens = TokenStore::new(users.clone());
        Ok(Self {
            hasher,
            dummy_hash,
            issuer,
            validator,
            users,
            tokens,
        })
    }

    /// Register a new user and issue its first token pair
    ///
    /// * `Err(AppError::BadRequest)` - structurally invalid input
    /// * `Err(AppError::Conflict)` - email or phone already registered
    pub async fn signup(
        &self,
        request: SignupRequest,
        client: &ClientInfo,
    ) -> Result<AuthResponse, AppError> {
        if let Err(e) = request.validate() {
            self.registration_failed(&request.email, "validation", client);
            return Err(e.into());
        }
        let role: UserRole = request
            .user_type
            .parse()
            .map_err(|e: authgate_core::UnknownRole| AppError::BadRequest(e.to_string()))?;

        let email_taken = self.users.count_by(UserField::Email, &request.email).await?;
        let phone_taken = self.users.count_by(UserField::Phone, &request.phone).await?;
        if email_taken > 0 || phone_taken > 0 {
            self.registration_failed(&request.email, "duplicate", client);
            return Err(AppError::Conflict(ALREADY_REGISTERED.to_string()));
        }

        let password_hash = self.hash_password(request.password).await?;

        let mut user = User::new(
            request.email,
            request.phone,
            request.first_name,
            request.last_name,
            password_hash,
            role,
        );
        let pair = self.issuer.issue(&IdentityClaims::from(&user))?;
        user.token = Some(pair.access_token.clone());
        user.refresh_token = Some(pair.refresh_token.clone());

        // The store re-checks uniqueness under its write lock.
        match self.users.insert(user.clone()).await {
            Ok(()) => {}
            Err(RepositoryError::Store(StoreError::Duplicate(field))) => {
                tracing::debug!(field = %field, "signup lost uniqueness race");
                self.registration_failed(&user.email, "duplicate", client);
                return Err(AppError::Conflict(ALREADY_REGISTERED.to_string()));
            }
            Err(e) => return Err(e.into()),
        }

        tracing::info!(user_id = %user.user_id, role = %user.role, "user registered");
        audit_log(&AuditEvent::RegistrationSuccess {
            user_id: user.user_id.clone(),
            email: user.email.clone(),
            role: user.role.to_string(),
            ip_address: client.ip_address.clone(),
            user_agent: client.user_agent.clone(),
        });

        Ok(self.auth_response(pair, &user))
    }

    /// Check credentials and replace the user's token pair
    ///
    /// Unknown email and wrong password fail identically, and neither
    /// touches the stored tokens.
    pub async fn login(
        &self,
        request: LoginRequest,
        client: &ClientInfo,
    ) -> Result<AuthResponse, AppError> {
        request.validate()?;

        let Some(mut user) = self.users.find_by_email(&request.email).await? else {
            self.verify_password(self.dummy_hash.to_string(), request.password)
                .await?;
            self.login_failed(&request.email, "unknown email", client);
            return Err(AppError::Unauthorized(INVALID_CREDENTIALS.to_string()));
        };

        if !self
            .verify_password(user.password_hash.clone(), request.password)
            .await?
        {
            self.login_failed(&request.email, "wrong password", client);
            return Err(AppError::Unauthorized(INVALID_CREDENTIALS.to_string()));
        }

        let pair = self.issuer.issue(&IdentityClaims::from(&user))?;
        user.updated_at = self
            .tokens
            .update(&user.user_id, &pair.access_token, &pair.refresh_token)
            .await?;

        audit_log(&AuditEvent::LoginSuccess {
            user_id: user.user_id.clone(),
            email: user.email.clone(),
            ip_address: client.ip_address.clone(),
            user_agent: client.user_agent.clone(),
        });

        Ok(self.auth_response(pair, &user))
    }

    /// Exchange the user's current refresh token for a new pair
    pub async fn refresh(
        &self,
        request: RefreshRequest,
        client: &ClientInfo,
    ) -> Result<AuthResponse, AppError> {
        let claims = match self
            .validator
            .validate_refresh_at(&request.refresh_token, Utc::now())
        {
            Ok(claims) => claims,
            Err(e) => {
                audit_log(&AuditEvent::InvalidToken {
                    ip_address: client.ip_address.clone(),
                    user_agent: client.user_agent.clone(),
                    reason: e.reason_code().to_string(),
                });
                return Err(e.into());
            }
        };

        let Some(mut user) = self.users.find_by_id(&claims.user_id).await? else {
            return Err(AppError::Unauthorized("Unknown user".to_string()));
        };

        if user.refresh_token.as_deref() != Some(request.refresh_token.as_str()) {
            audit_log(&AuditEvent::InvalidToken {
                ip_address: client.ip_address.clone(),
                user_agent: client.user_agent.clone(),
                reason: "TOKEN_SUPERSEDED".to_string(),
            });
            return Err(AppError::Unauthorized(
                "Refresh token has been superseded".to_string(),
            ));
        }

        let pair = self.issuer.issue(&IdentityClaims::from(&user))?;
        user.updated_at = self
            .tokens
            .update(&user.user_id, &pair.access_token, &pair.refresh_token)
            .await?;

        audit_log(&AuditEvent::TokenRefresh {
            user_id: user.user_id.clone(),
            ip_address: client.ip_address.clone(),
            user_agent: client.user_agent.clone(),
        });

        Ok(self.auth_response(pair, &user))
    }

    /// Fetch one user; admins may read any record, users only their own
    pub async fn get_user(
        &self,
        principal: &AuthenticatedUser,
        user_id: &str,
        client: &ClientInfo,
    ) -> Result<UserInfo, AppError> {
        let decision = require_self_or_role(principal, user_id, UserRole::Admin);
        self.enforce(decision, principal, &format!("users/{user_id}"), client)?;

        let user = self
            .users
            .find_by_id(user_id)
            .await?
            .ok_or_else(|| AppError::NotFound("User".to_string()))?;

        Ok(UserInfo::from(&user))
    }

    /// List users page by page; admin only
    pub async fn list_users(
        &self,
        principal: &AuthenticatedUser,
        query: &ListUsersQuery,
        client: &ClientInfo,
    ) -> Result<UsersPage, AppError> {
        let decision = require_role(principal, UserRole::Admin);
        self.enforce(decision, principal, "users", client)?;

        let (offset, limit) = query.offset_limit();
        let page = self.users.list(offset, limit).await?;

        Ok(UsersPage {
            total_count: page.total_count,
            user_items: page.user_items.iter().map(UserInfo::from).collect(),
        })
    }

    fn enforce(
        &self,
        decision: Decision,
        principal: &AuthenticatedUser,
        resource: &str,
        client: &ClientInfo,
    ) -> Result<(), AppError> {
        if !decision.is_allowed() {
            audit_log(&AuditEvent::AccessDenied {
                user_id: principal.user_id.clone(),
                role: principal.role.to_string(),
                resource: resource.to_string(),
                ip_address: client.ip_address.clone(),
                user_agent: client.user_agent.clone(),
            });
        }
        decision.enforce().map_err(AppError::from)
    }

    async fn hash_password(&self, password: String) -> Result<String, AppError> {
        let hasher = self.hasher.clone();
        tokio::task::spawn_blocking(move || hasher.hash(&password))
            .await
            .map_err(|e| AppError::Internal(format!("hashing task failed: {e}")))?
            .map_err(AppError::from)
    }

    async fn verify_password(&self, hashed: String, candidate: String) -> Result<bool, AppError> {
        let hasher = self.hasher.clone();
        tokio::task::spawn_blocking(move || hasher.verify(&hashed, &candidate))
            .await
            .map_err(|e| AppError::Internal(format!("verification task failed: {e}")))
    }

    fn auth_response(&self, pair: TokenPair, user: &User) -> AuthResponse {
        AuthResponse {
            access_token: pair.access_token,
            refresh_token: pair.refresh_token,
            token_type: "Bearer".to_string(),
            expires_in: self.issuer.access_ttl_secs(),
            user: UserInfo::from(user),
        }
    }

    fn registration_failed(&self, email: &str, reason: &str, client: &ClientInfo) {
        audit_log(&AuditEvent::RegistrationFailure {
            email: email.to_string(),
            reason: reason.to_string(),
            ip_address: client.ip_address.clone(),
            user_agent: client.user_agent.clone(),
        });
    }

    fn login_failed(&self, email: &str, reason: &str, client: &ClientInfo) {
        audit_log(&AuditEvent::LoginFailure {
            email: email.to_string(),
            reason: reason.to_string(),
            ip_address: client.ip_address.clone(),
            user_agent: client.user_agent.clone(),
        });
    }
}
