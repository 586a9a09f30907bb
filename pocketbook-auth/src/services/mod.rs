pub mod accounts;
pub mod auth;
pub mod error;
pub mod google;
pub mod tokens;

pub use accounts::AccountService;
pub use auth::AuthService;
pub use error::ServiceError;
pub use google::{FederationOutcome, GoogleAuthService};
pub use tokens::{Claims, TokenKind, TokenService};
