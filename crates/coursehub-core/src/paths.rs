//! Path resolution utilities.

use crate::error::ConfigError;
use std::path::PathBuf;

/// Get the CourseHub base directory (~/.coursehub).
pub fn base_dir() -> Result<PathBuf, ConfigError> {
    let home = dirs::home_dir().ok_or_else(|| {
        ConfigError::Validation("Could not determine home directory".to_string())
    })?;
    Ok(home.join(".coursehub"))
}

/// Get the main config file path (~/.coursehub/coursehub.json5).
pub fn config_file() -> Result<PathBuf, ConfigError> {
    Ok(base_dir()?.join("coursehub.json5"))
}

/// Get the default database path (~/.coursehub/coursehub.db).
pub fn database_file() -> Result<PathBuf, ConfigError> {
    Ok(base_dir()?.join("coursehub.db"))
}

/// Get the log directory (~/.coursehub/logs).
pub fn logs_dir() -> Result<PathBuf, ConfigError> {
    Ok(base_dir()?.join("logs"))
}

/// Ensure all required directories exist.
pub fn ensure_dirs() -> Result<(), ConfigError> {
    for dir in [base_dir()?, logs_dir()?] {
        std::fs::create_dir_all(&dir)?;
    }

    Ok(())
}

/// Expand tilde (~) in a path.
pub fn expand_tilde(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    PathBuf::from(path)
}
