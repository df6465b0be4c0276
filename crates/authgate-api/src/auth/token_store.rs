//! Current token pair per user
//!
//! Each login replaces the stored pair wholesale; no history of earlier
//! tokens is kept. Concurrent logins by the same user are last-writer-wins.

use super::repository::{RepositoryError, UserRepository};
use chrono::{DateTime, Utc};

/// Token pair currently stored against a user
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredTokens {
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Clone)]
pub struct TokenStore {
    users: UserRepository,
}

impl TokenStore {
    pub fn new(users: UserRepository) -> Self {
        Self { users }
    }

    /// Overwrite the stored pair for `user_id` and bump its update timestamp
    ///
    /// Returns the timestamp written.
    pub async fn update(
        &self,
        user_id: &str,
        access_token: &str,
        refresh_token: &str,
    ) -> Result<DateTime<Utc>, RepositoryError> {
        let now = Utc::now();
        self.users
            .update_tokens(user_id, access_token, refresh_token, now)
            .await?;

        tracing::debug!(user_id = %user_id, "token pair replaced");
        Ok(now)
    }

    /// Current pair for `user_id`, if the user exists
    pub async fn lookup(&self, user_id: &str) -> Result<Option<StoredTokens>, RepositoryError> {
        Ok(self.users.find_by_id(user_id).await?.map(|user| StoredTokens {
            access_token: user.token,
            refresh_token: user.refresh_token,
            updated_at: user.updated_at,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use authgate_core::{InMemoryUserStore, StoreError, User, UserRole, UserStore};
    use std::sync::Arc;
    use std::time::Duration;

    async fn setup() -> (TokenStore, String) {
        let store = Arc::new(InMemoryUserStore::new());
        let user = User::new(
            "a@x.com".to_string(),
            "555".to_string(),
            "A".to_string(),
            "B".to_string(),
            "hash".to_string(),
            UserRole::User,
        );
        let id = user.user_id.clone();
        store.insert_user(user).await.unwrap();

        let repo = UserRepository::new(store, Duration::from_secs(1));
        (TokenStore::new(repo), id)
    }

    #[tokio::test]
    async fn test_update_then_lookup() {
        let (tokens, id) = setup().await;

        let before = tokens.lookup(&id).await.unwrap().unwrap();
        assert!(before.access_token.is_none());

        let written = tokens.update(&id, "access-1", "refresh-1").await.unwrap();
        let after = tokens.lookup(&id).await.unwrap().unwrap();
        assert_eq!(after.access_token.as_deref(), Some("access-1"));
        assert_eq!(after.refresh_token.as_deref(), Some("refresh-1"));
        assert_eq!(after.updated_at, written);
        assert!(after.updated_at >= before.updated_at);
    }

    #[tokio::test]
    async fn test_update_is_idempotent_full_replace() {
        let (tokens, id) = setup().await;

        tokens.update(&id, "access-1", "refresh-1").await.unwrap();
        tokens.update(&id, "access-2", "refresh-2").await.unwrap();
        tokens.update(&id, "access-2", "refresh-2").await.unwrap();

        let current = tokens.lookup(&id).await.unwrap().unwrap();
        assert_eq!(current.access_token.as_deref(), Some("access-2"));
        assert_eq!(current.refresh_token.as_deref(), Some("refresh-2"));
    }

    #[tokio::test]
    async fn test_unknown_user() {
        let (tokens, _) = setup().await;

        assert!(tokens.lookup("nobody").await.unwrap().is_none());
        assert!(matches!(
            tokens.update("nobody", "a", "r").await,
            Err(RepositoryError::Store(StoreError::UserNotFound))
        ));
    }
}
