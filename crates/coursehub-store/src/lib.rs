//! Durable storage for CourseHub.
//!
//! This crate provides:
//! - The synchronous [`Store`] trait used by the messaging layer
//! - [`SqliteStore`], a SQLite-backed implementation
//! - Users and login sessions for cookie/bearer authentication
//! - Chat message and notification records

pub mod error;
mod schema;
pub mod sqlite;
pub mod store;

pub use error::StoreError;
pub use sqlite::SqliteStore;
pub use store::Store;

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
