use async_trait::async_trait;
use sqlx::postgres::PgPool;
use uuid::Uuid;

use crate::models::Account;
use crate::services::ServiceError;
use crate::store::AccountStore;

const EMAIL_CONSTRAINT: &str = "accounts_email_key";
const USERNAME_CONSTRAINT: &str = "accounts_username_key";

#[derive(Clone)]
pub struct PgAccountStore {
    pool: PgPool,
}

impl PgAccountStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Map unique-constraint violations to the duplicate errors the
/// provisioner promises, by constraint name.
fn translate_unique(err: sqlx::Error) -> ServiceError {
    if let sqlx::Error::Database(ref db) = err {
        if matches!(db.kind(), sqlx::error::ErrorKind::UniqueViolation) {
            match db.constraint() {
                Some(EMAIL_CONSTRAINT) => return ServiceError::DuplicateEmail,
                Some(USERNAME_CONSTRAINT) => return ServiceError::DuplicateUsername,
                _ => {}
            }
        }
    }
    ServiceError::Database(err)
}

#[async_trait]
impl AccountStore for PgAccountStore {
    async fn health_check(&self) -> Result<(), ServiceError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Account>, ServiceError> {
        let account = sqlx::query_as::<_, Account>("SELECT * FROM accounts WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(account)
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<Account>, ServiceError> {
        let account = sqlx::query_as::<_, Account>("SELECT * FROM accounts WHERE username = $1")
            .bind(username)
            .fetch_optional(&self.pool)
            .await?;
        Ok(account)
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<Account>, ServiceError> {
        let account = sqlx::query_as::<_, Account>("SELECT * FROM accounts WHERE email = $1")
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;
        Ok(account)
    }

    async fn list(&self) -> Result<Vec<Account>, ServiceError> {
        let accounts = sqlx::query_as::<_, Account>("SELECT * FROM accounts ORDER BY created_at")
            .fetch_all(&self.pool)
            .await?;
        Ok(accounts)
    }

    async fn insert(&self, account: &Account) -> Result<(), ServiceError> {
        sqlx::query(
            "INSERT INTO accounts \
             (id, email, username, first_name, last_name, age, password_hash, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
        )
        .bind(account.id)
        .bind(&account.email)
        .bind(&account.username)
        .bind(&account.first_name)
        .bind(&account.last_name)
        .bind(account.age)
        .bind(&account.password_hash)
        .bind(account.created_at)
        .bind(account.updated_at)
        .execute(&self.pool)
        .await
        .map_err(translate_unique)?;

        Ok(())
    }

    async fn update(&self, account: &Account) -> Result<(), ServiceError> {
        let result = sqlx::query(
            "UPDATE accounts SET \
             email = $2, username = $3, first_name = $4, last_name = $5, \
             age = $6, password_hash = $7, updated_at = $8 \
             WHERE id = $1",
        )
        .bind(account.id)
        .bind(&account.email)
        .bind(&account.username)
        .bind(&account.first_name)
        .bind(&account.last_name)
        .bind(account.age)
        .bind(&account.password_hash)
        .bind(account.updated_at)
        .execute(&self.pool)
        .await
        .map_err(translate_unique)?;

        if result.rows_affected() == 0 {
            return Err(ServiceError::AccountNotFound);
        }

        Ok(())
    }

    async fn delete(&self, id: Uuid) -> Result<bool, ServiceError> {
        let result = sqlx::query("DELETE FROM accounts WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
