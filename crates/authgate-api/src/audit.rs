//! Security audit logging for authentication events
//!
//! Registrations, logins, token refreshes, rejected tokens and denied
//! access are logged at INFO level with the "audit" target, so they can be
//! filtered and routed separately from application logs. Passwords and
//! token strings never appear in an event.

use axum::http::HeaderMap;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::info;

/// Security audit events for authentication and authorization
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event_type", rename_all = "snake_case")]
pub enum AuditEvent {
    /// Successful user registration
    RegistrationSuccess {
        user_id: String,
        email: String,
        role: String,
        ip_address: Option<String>,
        user_agent: Option<String>,
    },

    /// Failed registration attempt
    RegistrationFailure {
        email: String,
        reason: String,
        ip_address: Option<String>,
        user_agent: Option<String>,
    },

    /// Successful user login
    LoginSuccess {
        user_id: String,
        email: String,
        ip_address: Option<String>,
        user_agent: Option<String>,
    },

    /// Failed login attempt
    LoginFailure {
        email: String,
        reason: String,
        ip_address: Option<String>,
        user_agent: Option<String>,
    },

    /// Token pair exchanged through a refresh token
    TokenRefresh {
        user_id: String,
        ip_address: Option<String>,
        user_agent: Option<String>,
    },

    /// Authenticated principal refused by an authorization rule
    AccessDenied {
        user_id: String,
        role: String,
        resource: String,
        ip_address: Option<String>,
        user_agent: Option<String>,
    },

    /// Invalid, expired or superseded token presented
    InvalidToken {
        ip_address: Option<String>,
        user_agent: Option<String>,
        reason: String,
    },
}

impl AuditEvent {
    fn message(&self) -> &'static str {
        match self {
            AuditEvent::RegistrationSuccess { .. } => "Registration successful",
            AuditEvent::RegistrationFailure { .. } => "Registration failed",
            AuditEvent::LoginSuccess { .. } => "Login successful",
            AuditEvent::LoginFailure { .. } => "Login failed",
            AuditEvent::TokenRefresh { .. } => "Token refresh",
            AuditEvent::AccessDenied { .. } => "Access denied",
            AuditEvent::InvalidToken { .. } => "Invalid token",
        }
    }

    fn ip_address(&self) -> Option<&str> {
        match self {
            AuditEvent::RegistrationSuccess { ip_address, .. }
            | AuditEvent::RegistrationFailure { ip_address, .. }
            | AuditEvent::LoginSuccess { ip_address, .. }
            | AuditEvent::LoginFailure { ip_address, .. }
            | AuditEvent::TokenRefresh { ip_address, .. }
            | AuditEvent::AccessDenied { ip_address, .. }
            | AuditEvent::InvalidToken { ip_address, .. } => ip_address.as_deref(),
        }
    }
}

/// Client details attached to audit events
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClientInfo {
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

impl ClientInfo {
    pub fn from_headers(headers: &HeaderMap) -> Self {
        Self {
            ip_address: extract_ip_address(headers),
            user_agent: extract_user_agent(headers),
        }
    }
}

/// Log a security audit event with structured fields
///
/// The event is serialized to JSON for log aggregators, e.g.:
///
/// ```json
/// {
///   "event_type": "login_success",
///   "user_id": "5f0c8e1e2a8e4c55b2c1d7c1f0a4e9b3",
///   "email": "user@example.com",
///   "ip_address": "192.168.1.1",
///   "user_agent": "Mozilla/5.0..."
/// }
/// ```
pub fn audit_log(event: &AuditEvent) {
    let timestamp = Utc::now();

    let event_json = serde_json::to_string(event)
        .unwrap_or_else(|e| format!("{{\"error\":\"Failed to serialize audit event: {e}\"}}"));

    info!(
        target: "audit",
        timestamp = %timestamp,
        event = %event_json,
        ip_address = ?event.ip_address(),
        "{}",
        event.message()
    );
}

/// Extract client IP address from proxy headers
///
/// Prefers the first entry of `X-Forwarded-For`, then `X-Real-IP`.
pub fn extract_ip_address(headers: &HeaderMap) -> Option<String> {
    if let Some(xff) = headers.get("x-forwarded-for") {
        if let Ok(xff_str) = xff.to_str() {
            if let Some(first_ip) = xff_str.split(',').next() {
                return Some(first_ip.trim().to_string());
            }
        }
    }

    if let Some(real_ip) = headers.get("x-real-ip") {
        if let Ok(ip_str) = real_ip.to_str() {
            return Some(ip_str.to_string());
        }
    }

    None
}

pub fn extract_user_agent(headers: &HeaderMap) -> Option<String> {
    headers
        .get(axum::http::header::USER_AGENT)
        .and_then(|ua| ua.to_str().ok())
        .map(|s| s.to_string())
}
