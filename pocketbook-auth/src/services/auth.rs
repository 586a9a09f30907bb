use std::sync::Arc;

use crate::models::Account;
use crate::services::tokens::{TokenKind, TokenService};
use crate::services::ServiceError;
use crate::store::AccountStore;
use crate::utils::{verify_password, Password, PasswordHashString};

/// Password login and bearer-token authorization over the account store.
#[derive(Clone)]
pub struct AuthService {
    store: Arc<dyn AccountStore>,
    tokens: TokenService,
}

impl AuthService {
    pub fn new(store: Arc<dyn AccountStore>, tokens: TokenService) -> Self {
        Self { store, tokens }
    }

    /// Check a username/password pair. `Ok(None)` covers both an unknown
    /// username and a wrong password, so callers cannot distinguish the
    /// two cases and neither can their clients.
    pub async fn authenticate(
        &self,
        username: &str,
        password: &str,
    ) -> Result<Option<Account>, ServiceError> {
        let Some(account) = self.store.find_by_username(username).await? else {
            return Ok(None);
        };

        let stored = PasswordHashString::new(account.password_hash.clone());
        match verify_password(&Password::new(password.to_string()), &stored) {
            Ok(true) => Ok(Some(account)),
            Ok(false) => Ok(None),
            Err(e) => Err(ServiceError::Internal(e)),
        }
    }

    /// Authenticate and mint an access token carrying the requested
    /// scopes verbatim.
    pub async fn login(
        &self,
        username: &str,
        password: &str,
        scopes: Vec<String>,
    ) -> Result<Option<String>, ServiceError> {
        let Some(account) = self.authenticate(username, password).await? else {
            tracing::warn!(username, "Failed login attempt");
            return Ok(None);
        };

        let token = self.tokens.issue_access(&account.username, scopes)?;
        tracing::info!(account_id = %account.id, "Login succeeded");
        Ok(Some(token))
    }

    /// Verify a bearer token and resolve its subject, requiring every
    /// scope in `required_scopes` to be present in the token. Refresh
    /// tokens are never accepted here.
    pub async fn authorize(
        &self,
        token: &str,
        required_scopes: &[&str],
    ) -> Result<Account, ServiceError> {
        let claims = self.tokens.verify(token)?;

        if claims.kind != TokenKind::Access {
            return Err(ServiceError::MalformedToken);
        }

        for required in required_scopes {
            if !claims.scopes.iter().any(|s| s == required) {
                return Err(ServiceError::InsufficientScope);
            }
        }

        self.store
            .find_by_username(&claims.sub)
            .await?
            .ok_or(ServiceError::AccountNotFound)
    }

    pub fn token_expiry_seconds(&self) -> i64 {
        self.tokens.access_token_expiry_seconds()
    }
}
