use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;
use uuid::Uuid;

use crate::models::Account;
use crate::services::ServiceError;
use crate::store::AccountStore;

/// In-memory [`AccountStore`] for tests. Mirrors the Postgres
/// uniqueness behavior so duplicate races exercise the same error
/// paths as production.
#[derive(Default)]
pub struct MemoryAccountStore {
    accounts: Mutex<HashMap<Uuid, Account>>,
}

impl MemoryAccountStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn check_unique(
        accounts: &HashMap<Uuid, Account>,
        candidate: &Account,
    ) -> Result<(), ServiceError> {
        for existing in accounts.values() {
            if existing.id == candidate.id {
                continue;
            }
            if existing.email == candidate.email {
                return Err(ServiceError::DuplicateEmail);
            }
            if existing.username == candidate.username {
                return Err(ServiceError::DuplicateUsername);
            }
        }
        Ok(())
    }
}

#[async_trait]
impl AccountStore for MemoryAccountStore {
    async fn health_check(&self) -> Result<(), ServiceError> {
        Ok(())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Account>, ServiceError> {
        Ok(self.accounts.lock().unwrap().get(&id).cloned())
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<Account>, ServiceError> {
        Ok(self
            .accounts
            .lock()
            .unwrap()
            .values()
            .find(|a| a.username == username)
            .cloned())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<Account>, ServiceError> {
        Ok(self
            .accounts
            .lock()
            .unwrap()
            .values()
            .find(|a| a.email == email)
            .cloned())
    }

    async fn list(&self) -> Result<Vec<Account>, ServiceError> {
        let mut accounts: Vec<Account> = self.accounts.lock().unwrap().values().cloned().collect();
        accounts.sort_by_key(|a| a.created_at);
        Ok(accounts)
    }

    async fn insert(&self, account: &Account) -> Result<(), ServiceError> {
        let mut accounts = self.accounts.lock().unwrap();
        Self::check_unique(&accounts, account)?;
        accounts.insert(account.id, account.clone());
        Ok(())
    }

    async fn update(&self, account: &Account) -> Result<(), ServiceError> {
        let mut accounts = self.accounts.lock().unwrap();
        if !accounts.contains_key(&account.id) {
            return Err(ServiceError::AccountNotFound);
        }
        Self::check_unique(&accounts, account)?;
        accounts.insert(account.id, account.clone());
        Ok(())
    }

    async fn delete(&self, id: Uuid) -> Result<bool, ServiceError> {
        Ok(self.accounts.lock().unwrap().remove(&id).is_some())
    }
}
