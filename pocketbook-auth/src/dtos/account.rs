use serde::Deserialize;
use utoipa::ToSchema;
use validator::Validate;

use crate::models::{AccountPatch, NewAccount};

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct RegisterRequest {
    #[validate(email(message = "Invalid email format"))]
    #[schema(example = "alice@example.com")]
    pub email: String,

    #[validate(length(min = 3, message = "Username must be at least 3 characters"))]
    #[schema(example = "alice")]
    pub username: String,

    #[schema(example = "Alice")]
    pub first_name: String,

    #[schema(example = "Smith")]
    pub last_name: String,

    #[schema(example = 30)]
    pub age: i32,

    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    #[schema(example = "secret123", min_length = 8)]
    pub password: String,
}

impl From<RegisterRequest> for NewAccount {
    fn from(req: RegisterRequest) -> Self {
        Self {
            email: req.email,
            username: req.username,
            first_name: req.first_name,
            last_name: req.last_name,
            age: req.age,
            password: req.password,
        }
    }
}

/// Partial update; absent fields are left untouched.
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateAccountRequest {
    #[validate(email(message = "Invalid email format"))]
    pub email: Option<String>,

    #[validate(length(min = 3, message = "Username must be at least 3 characters"))]
    pub username: Option<String>,

    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub age: Option<i32>,

    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub password: Option<String>,
}

impl From<UpdateAccountRequest> for AccountPatch {
    fn from(req: UpdateAccountRequest) -> Self {
        Self {
            email: req.email,
            username: req.username,
            first_name: req.first_name,
            last_name: req.last_name,
            age: req.age,
            password: req.password,
        }
    }
}
