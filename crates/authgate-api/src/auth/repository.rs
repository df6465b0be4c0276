//! User repository
//!
//! Wraps a [`UserStore`] and bounds every call with the configured store
//! timeout. A call that times out is reported as failed; nothing is retried.

use authgate_core::{StoreError, User, UserField, UserPage, UserStore};
use chrono::{DateTime, Utc};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Repository errors
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("Store operation timed out after {0:?}")]
    Timeout(Duration),
}

/// Timeout-bounded access to the user store
#[derive(Clone)]
pub struct UserRepository {
    store: Arc<dyn UserStore>,
    timeout: Duration,
}

impl UserRepository {
    pub fn new(store: Arc<dyn UserStore>, timeout: Duration) -> Self {
        Self { store, timeout }
    }

    async fn bounded<T>(
        &self,
        op: impl Future<Output = Result<T, StoreError>>,
    ) -> Result<T, RepositoryError> {
        match tokio::time::timeout(self.timeout, op).await {
            Ok(result) => Ok(result?),
            Err(_) => Err(RepositoryError::Timeout(self.timeout)),
        }
    }

    pub async fn find_by_email(&self, email: &str) -> Result<Option<User>, RepositoryError> {
        self.bounded(self.store.find_user_by_field(UserField::Email, email))
            .await
    }

    pub async fn find_by_id(&self, user_id: &str) -> Result<Option<User>, RepositoryError> {
        self.bounded(self.store.find_user_by_field(UserField::UserId, user_id))
            .await
    }

    pub async fn count_by(&self, field: UserField, value: &str) -> Result<u64, RepositoryError> {
        self.bounded(self.store.count_users_by_field(field, value))
            .await
    }

    pub async fn insert(&self, user: User) -> Result<(), RepositoryError> {
        self.bounded(self.store.insert_user(user)).await
    }

    pub async fn update_tokens(
        &self,
        user_id: &str,
        access_token: &str,
        refresh_token: &str,
        updated_at: DateTime<Utc>,
    ) -> Result<(), RepositoryError> {
        self.bounded(
            self.store
                .update_user_tokens(user_id, access_token, refresh_token, updated_at),
        )
        .await
    }

    pub async fn list(&self, offset: usize, limit: usize) -> Result<UserPage, RepositoryError> {
        self.bounded(self.store.list_users(offset, limit)).await
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use async_trait::async_trait;
    use authgate_core::InMemoryUserStore;

    /// Store whose every call hangs longer than any test timeout
    pub(crate) struct StalledStore;

    #[async_trait]
    impl UserStore for StalledStore {
        async fn find_user_by_field(
            &self,
            _field: UserField,
            _value: &str,
        ) -> Result<Option<User>, StoreError> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok(None)
        }

        async fn count_users_by_field(
            &self,
            _field: UserField,
            _value: &str,
        ) -> Result<u64, StoreError> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok(0)
        }

        async fn insert_user(&self, _user: User) -> Result<(), StoreError> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok(())
        }

        async fn update_user_tokens(
            &self,
            _user_id: &str,
            _access_token: &str,
            _refresh_token: &str,
            _updated_at: DateTime<Utc>,
        ) -> Result<(), StoreError> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok(())
        }

        async fn list_users(&self, _offset: usize, _limit: usize) -> Result<UserPage, StoreError> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok(UserPage {
                total_count: 0,
                user_items: vec![],
            })
        }
    }

    #[tokio::test]
    async fn test_stalled_store_times_out() {
        let repo = UserRepository::new(Arc::new(StalledStore), Duration::from_millis(20));
        let result = repo.find_by_email("a@x.com").await;
        assert!(matches!(result, Err(RepositoryError::Timeout(_))));
    }

    #[tokio::test]
    async fn test_store_errors_pass_through() {
        let repo = UserRepository::new(
            Arc::new(InMemoryUserStore::new()),
            Duration::from_secs(1),
        );
        let result = repo.update_tokens("missing", "a", "r", Utc::now()).await;
        assert!(matches!(
            result,
            Err(RepositoryError::Store(StoreError::UserNotFound))
        ));
    }
}
