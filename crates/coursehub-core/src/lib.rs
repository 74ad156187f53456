//! # coursehub-core
//!
//! Core types, configuration, and utilities for CourseHub.
//!
//! This crate provides shared functionality used across all CourseHub crates:
//!
//! - **Configuration**: Loading, validation, and management of config files
//! - **Types**: Identifiers, authenticated identities, persisted records and
//!   the domain events that feed the notification pipeline
//! - **Utilities**: Path resolution

pub mod config;
pub mod error;
pub mod paths;
pub mod types;

// Re-exports for convenience
pub use config::Config;
pub use error::{Error, Result};
pub use types::*;
