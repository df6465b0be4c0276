//! User account model
//!
//! The persistence layer owns these records. The auth core reads identity
//! fields, verifies against `password_hash`, and replaces the token pair on
//! every login.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// User role enum
///
/// Closed set of access levels:
/// - Admin: may list all users and read any user record
/// - User: may only read its own record
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "UPPERCASE")]
pub enum UserRole {
    Admin,
    User,
}

impl UserRole {
    /// Convert role to its wire representation
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::Admin => "ADMIN",
            UserRole::User => "USER",
        }
    }
}

impl std::str::FromStr for UserRole {
    type Err = UnknownRole;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ADMIN" => Ok(UserRole::Admin),
            "USER" => Ok(UserRole::User),
            other => Err(UnknownRole(other.to_string())),
        }
    }
}

impl std::fmt::Display for UserRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when parsing a role outside the closed set
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown user role: {0}")]
pub struct UnknownRole(pub String);

/// Fields the store can be queried on by equality
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserField {
    UserId,
    Email,
    Phone,
}

impl UserField {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserField::UserId => "user_id",
            UserField::Email => "email",
            UserField::Phone => "phone",
        }
    }

    /// Read this field from a user record
    pub fn value_of<'a>(&self, user: &'a User) -> &'a str {
        match self {
            UserField::UserId => &user.user_id,
            UserField::Email => &user.email,
            UserField::Phone => &user.phone,
        }
    }
}

impl std::fmt::Display for UserField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// User account record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    /// Globally unique opaque identifier
    pub user_id: String,

    /// Email address (unique, used for login)
    pub email: String,

    /// Phone number (unique)
    pub phone: String,

    pub first_name: String,

    pub last_name: String,

    /// Hashed password (Argon2id PHC string)
    pub password_hash: String,

    pub role: UserRole,

    /// Current access token
    pub token: Option<String>,

    /// Current refresh token
    pub refresh_token: Option<String>,

    pub created_at: DateTime<Utc>,

    /// Last time the token pair was replaced
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Create a new user with a freshly generated identifier
    pub fn new(
        email: String,
        phone: String,
        first_name: String,
        last_name: String,
        password_hash: String,
        role: UserRole,
    ) -> Self {
        let now = Utc::now();
        Self {
            user_id: Uuid::new_v4().simple().to_string(),
            email,
            phone,
            first_name,
            last_name,
            password_hash,
            role,
            token: None,
            refresh_token: None,
            created_at: now,
            updated_at: now,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> User {
        User::new(
            "a@x.com".to_string(),
            "555".to_string(),
            "Ada".to_string(),
            "Lovelace".to_string(),
            "$argon2id$v=19$m=8,t=1,p=1$c2FsdHNhbHQ$aGFzaA".to_string(),
            UserRole::User,
        )
    }

    #[test]
    fn test_role_round_trips_through_wire_form() {
        assert_eq!(serde_json::to_string(&UserRole::Admin).unwrap(), "\"ADMIN\"");
        assert_eq!("USER".parse::<UserRole>().unwrap(), UserRole::User);
        assert!("admin".parse::<UserRole>().is_err());
        assert!("EDITOR".parse::<UserRole>().is_err());
    }

    #[test]
    fn test_new_user_has_unique_id_and_no_tokens() {
        let a = sample();
        let b = sample();
        assert_ne!(a.user_id, b.user_id);
        assert!(a.token.is_none());
        assert!(a.refresh_token.is_none());
        assert_eq!(a.created_at, a.updated_at);
    }

    #[test]
    fn test_field_lookup() {
        let user = sample();
        assert_eq!(UserField::Email.value_of(&user), "a@x.com");
        assert_eq!(UserField::Phone.value_of(&user), "555");
        assert_eq!(UserField::UserId.value_of(&user), user.user_id);
    }
}
