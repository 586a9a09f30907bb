use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct LoginRequest {
    #[validate(length(min = 1, message = "Username is required"))]
    #[schema(example = "alice")]
    pub username: String,

    #[validate(length(min = 1, message = "Password is required"))]
    #[schema(example = "secret123")]
    pub password: String,

    /// Scopes requested for the minted token; granted verbatim.
    #[serde(default)]
    #[schema(example = json!(["me"]))]
    pub scopes: Vec<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct TokenResponse {
    pub access_token: String,
    #[schema(example = "bearer")]
    pub token_type: String,
    #[schema(example = 900)]
    pub expires_in: i64,
}

impl TokenResponse {
    pub fn new(access_token: String, expires_in: i64) -> Self {
        Self {
            access_token,
            token_type: "bearer".to_string(),
            expires_in,
        }
    }
}

/// Identity attributes asserted by Google for one exchange. Transient:
/// either consumed immediately into an account or echoed back to the
/// caller inside a pending-registration payload.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct GoogleProfile {
    #[schema(example = "alice@example.com")]
    pub email: String,
    #[serde(default)]
    #[schema(example = "Alice")]
    pub given_name: String,
    #[serde(default)]
    #[schema(example = "Smith")]
    pub family_name: String,
    /// Derived from the People-API birthdate when the user shared one.
    pub age: Option<i32>,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct GoogleCallbackQuery {
    pub code: String,
    pub state: String,
}

/// Returned by the callback when the asserted profile is missing
/// required fields; finalized exactly once via complete-registration.
#[derive(Debug, Serialize, ToSchema)]
pub struct PendingRegistrationResponse {
    #[schema(example = "pending")]
    pub status: String,
    #[schema(example = "Additional information required")]
    pub message: String,
    pub google_data: GoogleProfile,
    #[schema(example = json!(["age"]))]
    pub required_fields: Vec<String>,
}

impl PendingRegistrationResponse {
    pub fn new(google_data: GoogleProfile, required_fields: Vec<String>) -> Self {
        Self {
            status: "pending".to_string(),
            message: "Additional information required".to_string(),
            google_data,
            required_fields,
        }
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CompleteRegistrationRequest {
    pub google_data: GoogleProfile,
    #[schema(example = 22)]
    pub age: i32,
}
