//! User persistence
//!
//! The auth core talks to storage only through [`UserStore`]: equality
//! lookups, counts, inserts and a full replace of the token pair. Any
//! document or relational engine can sit behind it.

use crate::user::{User, UserField};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::RwLock;
use thiserror::Error;

/// Store errors
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{0} already exists")]
    Duplicate(UserField),

    #[error("User not found")]
    UserNotFound,

    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

/// One page of users plus the total number of records
#[derive(Debug, Clone, Serialize)]
pub struct UserPage {
    pub total_count: u64,
    pub user_items: Vec<User>,
}

/// Key-indexed user store
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Find the first user whose `field` equals `value`
    async fn find_user_by_field(
        &self,
        field: UserField,
        value: &str,
    ) -> Result<Option<User>, StoreError>;

    /// Count users whose `field` equals `value`
    async fn count_users_by_field(&self, field: UserField, value: &str)
        -> Result<u64, StoreError>;

    /// Insert a new user
    ///
    /// Implementations must reject a user whose email or phone is already
    /// taken with [`StoreError::Duplicate`], atomically with the insert.
    async fn insert_user(&self, user: User) -> Result<(), StoreError>;

    /// Replace the stored token pair and bump `updated_at`
    async fn update_user_tokens(
        &self,
        user_id: &str,
        access_token: &str,
        refresh_token: &str,
        updated_at: DateTime<Utc>,
    ) -> Result<(), StoreError>;

    /// List users ordered by creation time
    async fn list_users(&self, offset: usize, limit: usize) -> Result<UserPage, StoreError>;
}

/// In-memory user store.
///
/// Intended for tests/dev and single-instance deployments.
#[derive(Debug, Default)]
pub struct InMemoryUserStore {
    users: RwLock<HashMap<String, User>>,
}

impl InMemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn poisoned<T>(_: T) -> StoreError {
    StoreError::Unavailable("user table lock poisoned".to_string())
}

#[async_trait]
impl UserStore for InMemoryUserStore {
    async fn find_user_by_field(
        &self,
        field: UserField,
        value: &str,
    ) -> Result<Option<User>, StoreError> {
        let users = self.users.read().map_err(poisoned)?;
        if field == UserField::UserId {
            return Ok(users.get(value).cloned());
        }
        Ok(users
            .values()
            .find(|u| field.value_of(u) == value)
            .cloned())
    }

    async fn count_users_by_field(
        &self,
        field: UserField,
        value: &str,
    ) -> Result<u64, StoreError> {
        let users = self.users.read().map_err(poisoned)?;
        Ok(users.values().filter(|u| field.value_of(u) == value).count() as u64)
    }

    async fn insert_user(&self, user: User) -> Result<(), StoreError> {
        // Uniqueness is checked under the same write lock as the insert.
        let mut users = self.users.write().map_err(poisoned)?;

        for field in [UserField::Email, UserField::Phone] {
            let value = field.value_of(&user);
            if users.values().any(|u| field.value_of(u) == value) {
                return Err(StoreError::Duplicate(field));
            }
        }
        if users.contains_key(&user.user_id) {
            return Err(StoreError::Duplicate(UserField::UserId));
        }

        users.insert(user.user_id.clone(), user);
        Ok(())
    }

    async fn update_user_tokens(
        &self,
        user_id: &str,
        access_token: &str,
        refresh_token: &str,
        updated_at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let mut users = self.users.write().map_err(poisoned)?;
        let user = users.get_mut(user_id).ok_or(StoreError::UserNotFound)?;

        user.token = Some(access_token.to_string());
        user.refresh_token = Some(refresh_token.to_string());
        user.updated_at = updated_at;

        Ok(())
    }

    async fn list_users(&self, offset: usize, limit: usize) -> Result<UserPage, StoreError> {
        let users = self.users.read().map_err(poisoned)?;

        let mut all: Vec<&User> = users.values().collect();
        all.sort_by(|a, b| {
            a.created_at
                .cmp(&b.created_at)
                .then_with(|| a.user_id.cmp(&b.user_id))
        });

        Ok(UserPage {
            total_count: all.len() as u64,
            user_items: all.into_iter().skip(offset).take(limit).cloned().collect(),
        })
    }
}
