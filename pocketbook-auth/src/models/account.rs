//! Account model - locally registered and federated identities.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

/// Minimum age for account eligibility, at creation and on any update
/// that changes age.
pub const MIN_AGE: i32 = 18;

/// Account entity. `password_hash` never leaves this crate; use
/// [`Account::sanitized`] for API responses.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Account {
    pub id: Uuid,
    pub email: String,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub age: i32,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Account {
    pub fn new(
        email: String,
        username: String,
        first_name: String,
        last_name: String,
        age: i32,
        password_hash: String,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            email,
            username,
            first_name,
            last_name,
            age,
            password_hash,
            created_at: now,
            updated_at: now,
        }
    }

    /// Convert to a response without sensitive fields.
    pub fn sanitized(&self) -> AccountResponse {
        AccountResponse::from(self.clone())
    }
}

/// Validated input for direct registration (password still plaintext;
/// the provisioner hashes it).
#[derive(Debug, Clone)]
pub struct NewAccount {
    pub email: String,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub age: i32,
    pub password: String,
}

/// Partial update; `None` fields are left untouched. The password, when
/// present, is replaced wholesale (re-hashed, never patched).
#[derive(Debug, Clone, Default)]
pub struct AccountPatch {
    pub email: Option<String>,
    pub username: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub age: Option<i32>,
    pub password: Option<String>,
}

/// Account projection for API responses (no credential material).
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct AccountResponse {
    pub id: Uuid,
    pub email: String,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub age: i32,
    pub created_at: DateTime<Utc>,
}

impl From<Account> for AccountResponse {
    fn from(a: Account) -> Self {
        Self {
            id: a.id,
            email: a.email,
            username: a.username,
            first_name: a.first_name,
            last_name: a.last_name,
            age: a.age,
            created_at: a.created_at,
        }
    }
}
