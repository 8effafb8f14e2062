//! User account store: trait + in-memory implementation.
//!
//! Credential *verification* lives in `kycflow-auth`; this adapter only
//! persists accounts and their password hashes.

use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use kycflow_core::UserId;

use crate::error::StoreError;

/// A registered account. `role` is stored as a plain string ("admin"/"user");
/// the auth layer parses it into a typed role.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserAccount {
    pub id: UserId,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub role: String,
    pub created_at: DateTime<Utc>,
}

#[async_trait]
pub trait UserStore: Send + Sync {
    /// Insert a new account; fails with `Conflict` if the username or email
    /// is already taken.
    async fn insert(&self, account: UserAccount) -> Result<(), StoreError>;

    async fn find_by_username(&self, username: &str) -> Result<Option<UserAccount>, StoreError>;
}

#[derive(Debug, Default)]
pub struct InMemoryUserStore {
    accounts: Mutex<Vec<UserAccount>>,
}

impl InMemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserStore for InMemoryUserStore {
    async fn insert(&self, account: UserAccount) -> Result<(), StoreError> {
        let mut accounts = self.accounts.lock().unwrap();
        if accounts
            .iter()
            .any(|a| a.username == account.username || a.email == account.email)
        {
            return Err(StoreError::Conflict(
                "username or email already exists".to_string(),
            ));
        }
        accounts.push(account);
        Ok(())
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<UserAccount>, StoreError> {
        Ok(self
            .accounts
            .lock()
            .unwrap()
            .iter()
            .find(|a| a.username == username)
            .cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn account(username: &str, email: &str) -> UserAccount {
        UserAccount {
            id: UserId::new(),
            username: username.into(),
            email: email.into(),
            password_hash: "$argon2id$stub".into(),
            role: "user".into(),
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn duplicate_username_or_email_conflicts() {
        let store = InMemoryUserStore::new();
        store.insert(account("jane", "jane@example.com")).await.unwrap();

        let err = store
            .insert(account("jane", "other@example.com"))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));

        let err = store
            .insert(account("other", "jane@example.com"))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));
    }

    #[tokio::test]
    async fn find_by_username_returns_stored_account() {
        let store = InMemoryUserStore::new();
        let acc = account("jane", "jane@example.com");
        store.insert(acc.clone()).await.unwrap();
        assert_eq!(store.find_by_username("jane").await.unwrap(), Some(acc));
        assert_eq!(store.find_by_username("nope").await.unwrap(), None);
    }
}
