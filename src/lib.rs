//! EventHub registration engine
//!
//! Registration lifecycle, capacity enforcement and attendee counter
//! reconciliation for a multi-tenant event platform, with PostgreSQL and
//! in-memory entity stores and a thin axum HTTP surface.

#![allow(non_snake_case)]

pub mod config;
pub mod database;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod services;
pub mod utils;

// Re-export commonly used types
pub use config::Settings;
pub use utils::errors::{EventHubError, Result};

// Re-export main components for easy access
pub use database::{DatabaseService, EntityStore, MemoryStore};
pub use handlers::{router, AppState};
pub use services::ServiceFactory;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");

/// Get library information
pub fn info() -> String {
    format!("{} v{}", NAME, VERSION)
}
