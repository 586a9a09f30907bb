pub mod auth;

pub use auth::Bearer;
