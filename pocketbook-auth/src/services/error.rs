use pocketbook_core::error::AppError;
use thiserror::Error;

/// Per-request failure taxonomy for the auth subsystem. Nothing here is
/// fatal to the process.
#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("Incorrect username or password")]
    InvalidCredentials,

    #[error("Token expired")]
    TokenExpired,

    #[error("Invalid token")]
    MalformedToken,

    #[error("Not enough permissions")]
    InsufficientScope,

    #[error("Account not found")]
    AccountNotFound,

    #[error("Email already exists")]
    DuplicateEmail,

    #[error("Username already exists")]
    DuplicateUsername,

    #[error("Age must be at least 18")]
    IneligibleAge,

    #[error("Identity provider exchange failed: {0}")]
    FederationExchange(String),

    #[error("Identity assertion rejected: {0}")]
    InvalidAssertion(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl From<ServiceError> for AppError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::InvalidCredentials => {
                AppError::BadRequest(anyhow::anyhow!("Incorrect username or password"))
            }
            ServiceError::TokenExpired => AppError::Unauthorized(anyhow::anyhow!("Token expired")),
            ServiceError::MalformedToken => {
                AppError::Unauthorized(anyhow::anyhow!("Invalid token"))
            }
            ServiceError::InsufficientScope => {
                AppError::Unauthorized(anyhow::anyhow!("Not enough permissions"))
            }
            ServiceError::AccountNotFound => {
                AppError::NotFound(anyhow::anyhow!("Account not found"))
            }
            ServiceError::DuplicateEmail => {
                AppError::BadRequest(anyhow::anyhow!("Email already exists"))
            }
            ServiceError::DuplicateUsername => {
                AppError::BadRequest(anyhow::anyhow!("Username already exists"))
            }
            ServiceError::IneligibleAge => {
                AppError::Unprocessable(anyhow::anyhow!("Age must be at least 18"))
            }
            // Provider detail stays in server logs; clients get a generic
            // message so IdP internals are never echoed back.
            ServiceError::FederationExchange(detail) => {
                tracing::error!(detail = %detail, "Federation exchange failed");
                AppError::BadRequest(anyhow::anyhow!("Error during Google authentication"))
            }
            ServiceError::InvalidAssertion(detail) => {
                tracing::error!(detail = %detail, "Identity assertion rejected");
                AppError::BadRequest(anyhow::anyhow!("Error during Google authentication"))
            }
            ServiceError::Validation(msg) => AppError::Unprocessable(anyhow::anyhow!(msg)),
            ServiceError::Database(e) => AppError::DatabaseError(e),
            ServiceError::Internal(e) => AppError::InternalError(e),
        }
    }
}
