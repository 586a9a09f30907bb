//! Shared plumbing for pocketbook services: error envelope, base
//! configuration, logging and generic HTTP middleware.

pub mod config;
pub mod error;
pub mod middleware;
pub mod observability;

// Re-exported so service crates use a single axum version.
pub use axum;
