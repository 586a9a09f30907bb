//! Account persistence seam.
//!
//! Service logic talks to [`AccountStore`] only; the Postgres
//! implementation backs production and [`MemoryAccountStore`] backs
//! integration tests. Uniqueness is ultimately enforced by the store
//! (constraints in Postgres), so a race between two concurrent
//! registrations resolves with the second writer receiving a duplicate
//! error.

mod memory;
mod postgres;

pub use memory::MemoryAccountStore;
pub use postgres::PgAccountStore;

use async_trait::async_trait;
use uuid::Uuid;

use crate::models::Account;
use crate::services::ServiceError;

#[async_trait]
pub trait AccountStore: Send + Sync {
    async fn health_check(&self) -> Result<(), ServiceError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Account>, ServiceError>;
    async fn find_by_username(&self, username: &str) -> Result<Option<Account>, ServiceError>;
    async fn find_by_email(&self, email: &str) -> Result<Option<Account>, ServiceError>;
    async fn list(&self) -> Result<Vec<Account>, ServiceError>;

    /// Insert a new account. Uniqueness violations surface as
    /// `DuplicateEmail` / `DuplicateUsername`.
    async fn insert(&self, account: &Account) -> Result<(), ServiceError>;

    /// Replace an existing row wholesale. Same duplicate translation as
    /// `insert`; `AccountNotFound` when the id no longer exists.
    async fn update(&self, account: &Account) -> Result<(), ServiceError>;

    /// Remove an account. Returns `false` when nothing matched.
    /// Cascading removal of owned records is the CRUD layer's schema
    /// responsibility (FKs with ON DELETE CASCADE).
    async fn delete(&self, id: Uuid) -> Result<bool, ServiceError>;
}
