/// Authentication middleware for protecting routes
///
/// Extracts and validates the bearer token from the Authorization header.
/// On success, adds the authenticated principal to request extensions; on
/// failure the request is short-circuited and the handler never runs.
use super::jwt::{Claims, JwtError};
use crate::audit::{audit_log, extract_ip_address, extract_user_agent, AuditEvent};
use crate::state::AppState;
use authgate_core::UserRole;
use axum::{
    body::Body,
    extract::{Request, State},
    http::{header, HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;

/// Authenticated principal extracted from an access token
///
/// Added to request extensions by the auth middleware and extracted in
/// handlers using `Extension<AuthenticatedUser>`. Lives only as long as the
/// request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthenticatedUser {
    /// User's unique identifier
    pub user_id: String,
    /// User's role
    pub role: UserRole,
    /// User's email address
    pub email: String,
}

impl AuthenticatedUser {
    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }
}

impl From<Claims> for AuthenticatedUser {
    fn from(claims: Claims) -> Self {
        Self {
            user_id: claims.user_id,
            role: claims.role,
            email: claims.email,
        }
    }
}

/// Authentication and authorization errors
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Missing Authorization header")]
    MissingCredentials,

    #[error("Invalid Authorization header format")]
    InvalidAuthHeader,

    #[error("Invalid token: {0}")]
    InvalidToken(#[from] JwtError),

    #[error("Token has been superseded by a newer login")]
    TokenSuperseded,

    #[error("Unauthorized to access this resource")]
    Forbidden,

    #[error("Authentication backend unavailable: {0}")]
    Backend(String),
}

impl AuthError {
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            AuthError::MissingCredentials => (StatusCode::UNAUTHORIZED, "MISSING_CREDENTIALS"),
            AuthError::InvalidAuthHeader => (StatusCode::UNAUTHORIZED, "INVALID_AUTH_HEADER"),
            AuthError::InvalidToken(e) => (StatusCode::UNAUTHORIZED, e.reason_code()),
            AuthError::TokenSuperseded => (StatusCode::UNAUTHORIZED, "TOKEN_SUPERSEDED"),
            AuthError::Forbidden => (StatusCode::FORBIDDEN, "FORBIDDEN"),
            AuthError::Backend(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();

        let message = match &self {
            AuthError::Backend(detail) => {
                tracing::error!(error = %detail, "authentication backend failure");
                "Internal server error".to_string()
            }
            AuthError::InvalidToken(e) => e.to_string(),
            other => other.to_string(),
        };

        let body = serde_json::json!({
            "code": code,
            "error": message,
            "status": status.as_u16(),
        });

        (status, axum::Json(body)).into_response()
    }
}

/// Pull the bearer token out of the Authorization header
pub fn extract_bearer(headers: &HeaderMap) -> Result<&str, AuthError> {
    let auth_header = headers
        .get(header::AUTHORIZATION)
        .ok_or(AuthError::MissingCredentials)?
        .to_str()
        .map_err(|_| AuthError::InvalidAuthHeader)?;

    let token = auth_header
        .strip_prefix("Bearer ")
        .ok_or(AuthError::InvalidAuthHeader)?
        .trim();

    if token.is_empty() {
        return Err(AuthError::MissingCredentials);
    }

    Ok(token)
}

/// Authentication middleware that requires a valid access token
///
/// This middleware:
/// 1. Extracts the bearer token from the Authorization header
/// 2. Validates signature, structure, token type and expiry
/// 3. Optionally checks the token is still the user's current one
/// 4. Adds [`AuthenticatedUser`] to request extensions
///
/// # Usage
///
/// ```ignore
/// use axum::{Router, routing::get, middleware};
/// use authgate_api::auth::middleware::auth_middleware;
///
/// let app = Router::new()
///     .route("/protected", get(protected_handler))
///     .route_layer(middleware::from_fn_with_state(state.clone(), auth_middleware));
/// ```
pub async fn auth_middleware(
    State(state): State<Arc<AppState>>,
    mut request: Request<Body>,
    next: Next,
) -> Result<Response, AuthError> {
    let token = extract_bearer(request.headers())?;

    let claims = match state.validator.validate_access_at(token, Utc::now()) {
        Ok(c) => c,
        Err(e) => {
            audit_log(&AuditEvent::InvalidToken {
                ip_address: extract_ip_address(request.headers()),
                user_agent: extract_user_agent(request.headers()),
                reason: e.reason_code().to_string(),
            });
            return Err(AuthError::InvalidToken(e));
        }
    };

    if state.config.auth.enforce_current_token {
        let current = state
            .tokens
            .lookup(&claims.user_id)
            .await
            .map_err(|e| AuthError::Backend(e.to_string()))?;

        let is_current = current
            .and_then(|stored| stored.access_token)
            .is_some_and(|stored| stored == token);

        if !is_current {
            audit_log(&AuditEvent::InvalidToken {
                ip_address: extract_ip_address(request.headers()),
                user_agent: extract_user_agent(request.headers()),
                reason: "TOKEN_SUPERSEDED".to_string(),
            });
            return Err(AuthError::TokenSuperseded);
        }
    }

    let user = AuthenticatedUser::from(claims);
    tracing::debug!(user_id = %user.user_id, role = %user.role, "request authenticated");

    request.extensions_mut().insert(user);

    Ok(next.run(request).await)
}
