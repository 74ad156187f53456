//! CLI command implementations.

pub mod config;
pub mod gateway;
pub mod seed;
pub mod sessions;
pub mod users;

use coursehub_core::Config;
use coursehub_store::SqliteStore;
use std::sync::Arc;
use tracing::debug;

/// Open the configured database.
pub fn open_store(config: &Config) -> anyhow::Result<Arc<SqliteStore>> {
    let path = config.database_path()?;
    debug!("Opening database {}", path.display());
    Ok(Arc::new(SqliteStore::open(&path)?))
}
