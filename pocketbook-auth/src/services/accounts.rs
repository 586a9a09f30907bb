use rand::Rng;
use std::sync::Arc;
use uuid::Uuid;

use crate::dtos::auth::GoogleProfile;
use crate::models::{Account, AccountPatch, NewAccount, MIN_AGE};
use crate::services::ServiceError;
use crate::store::AccountStore;
use crate::utils::{hash_password, Password};

/// Account provisioner: the single place accounts get created, updated
/// and removed, so uniqueness and eligibility are enforced once.
#[derive(Clone)]
pub struct AccountService {
    store: Arc<dyn AccountStore>,
    /// Fallback age for federated sign-ups with no birthdate, when the
    /// operator opts in. Unset means such sign-ups are rejected and the
    /// caller must supply an age through the pending flow.
    default_federated_age: Option<i32>,
}

impl AccountService {
    pub fn new(store: Arc<dyn AccountStore>, default_federated_age: Option<i32>) -> Self {
        Self {
            store,
            default_federated_age,
        }
    }

    /// Create an account from direct registration input.
    pub async fn create_direct(&self, input: NewAccount) -> Result<Account, ServiceError> {
        if input.age < MIN_AGE {
            return Err(ServiceError::IneligibleAge);
        }

        self.ensure_unique(&input.email, &input.username).await?;

        let password_hash = hash_password(&Password::new(input.password))
            .map_err(|e| ServiceError::Internal(anyhow::anyhow!("Password hashing error: {}", e)))?;

        let account = Account::new(
            input.email,
            input.username,
            input.first_name,
            input.last_name,
            input.age,
            password_hash.into_string(),
        );

        // The pre-check above is advisory; the store's constraints are
        // authoritative under concurrent registration.
        self.store.insert(&account).await?;

        tracing::info!(account_id = %account.id, "Account registered");

        Ok(account)
    }

    /// Create an account from a verified federated profile.
    ///
    /// Username derives from the email local part; first/last name take
    /// the first whitespace token of the given/family name. The password
    /// is random and never disclosed, so local login is impossible for
    /// such accounts until a password is set explicitly - federation is
    /// their only entry path.
    pub async fn create_from_federation(
        &self,
        profile: &GoogleProfile,
        supplied_age: Option<i32>,
    ) -> Result<Account, ServiceError> {
        let age = supplied_age
            .or(profile.age)
            .or(self.default_federated_age)
            .ok_or(ServiceError::IneligibleAge)?;
        if age < MIN_AGE {
            return Err(ServiceError::IneligibleAge);
        }

        let username = profile
            .email
            .split('@')
            .next()
            .unwrap_or(&profile.email)
            .to_string();
        let first_name = first_token(&profile.given_name);
        let last_name = first_token(&profile.family_name);

        let random_password = Password::new(hex::encode(rand::thread_rng().gen::<[u8; 32]>()));
        let password_hash = hash_password(&random_password)
            .map_err(|e| ServiceError::Internal(anyhow::anyhow!("Password hashing error: {}", e)))?;

        let account = Account::new(
            profile.email.clone(),
            username,
            first_name,
            last_name,
            age,
            password_hash.into_string(),
        );

        // No username pre-check here: a derived-username collision is
        // expected to surface as the store's uniqueness failure.
        self.store.insert(&account).await?;

        tracing::info!(account_id = %account.id, "Account provisioned from federated profile");

        Ok(account)
    }

    pub async fn get(&self, id: Uuid) -> Result<Account, ServiceError> {
        self.store
            .find_by_id(id)
            .await?
            .ok_or(ServiceError::AccountNotFound)
    }

    pub async fn list(&self) -> Result<Vec<Account>, ServiceError> {
        self.store.list().await
    }

    /// Apply a partial update. Any field subset except the identifier;
    /// a password change recomputes the hash wholesale; an age change is
    /// re-validated against the eligibility floor.
    pub async fn update(&self, id: Uuid, patch: AccountPatch) -> Result<Account, ServiceError> {
        let mut account = self.get(id).await?;

        if let Some(age) = patch.age {
            if age < MIN_AGE {
                return Err(ServiceError::IneligibleAge);
            }
            account.age = age;
        }
        if let Some(email) = patch.email {
            account.email = email;
        }
        if let Some(username) = patch.username {
            account.username = username;
        }
        if let Some(first_name) = patch.first_name {
            account.first_name = first_name;
        }
        if let Some(last_name) = patch.last_name {
            account.last_name = last_name;
        }
        if let Some(password) = patch.password {
            let hash = hash_password(&Password::new(password)).map_err(|e| {
                ServiceError::Internal(anyhow::anyhow!("Password hashing error: {}", e))
            })?;
            account.password_hash = hash.into_string();
        }

        account.updated_at = chrono::Utc::now();

        self.ensure_unique_excluding(&account.email, &account.username, account.id)
            .await?;
        self.store.update(&account).await?;

        Ok(account)
    }

    pub async fn delete(&self, id: Uuid) -> Result<(), ServiceError> {
        if !self.store.delete(id).await? {
            return Err(ServiceError::AccountNotFound);
        }
        tracing::info!(account_id = %id, "Account deleted");
        Ok(())
    }

    /// Consolidated uniqueness pre-check used by every create path.
    async fn ensure_unique(&self, email: &str, username: &str) -> Result<(), ServiceError> {
        self.ensure_unique_excluding(email, username, Uuid::nil())
            .await
    }

    async fn ensure_unique_excluding(
        &self,
        email: &str,
        username: &str,
        exclude: Uuid,
    ) -> Result<(), ServiceError> {
        if let Some(existing) = self.store.find_by_email(email).await? {
            if existing.id != exclude {
                return Err(ServiceError::DuplicateEmail);
            }
        }
        if let Some(existing) = self.store.find_by_username(username).await? {
            if existing.id != exclude {
                return Err(ServiceError::DuplicateUsername);
            }
        }
        Ok(())
    }
}

/// First whitespace-delimited token, tolerating empty input.
fn first_token(s: &str) -> String {
    s.split_whitespace().next().unwrap_or("").to_string()
}
