//! Configuration loading and persistence.

use super::{BindMode, Config};
use crate::error::ConfigError;
use crate::paths;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

impl Config {
    /// Load configuration from the default path.
    pub fn load_default() -> Result<Self, ConfigError> {
        let path = paths::config_file()?;
        Self::load(&path)
    }

    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.to_path_buf()));
        }

        debug!("Loading configuration from {}", path.display());
        let content = fs::read_to_string(path)?;
        Self::parse(&content)
    }

    /// Load from `path` when given, else from the default location, falling
    /// back to defaults when no file exists.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self, ConfigError> {
        let path = match path {
            Some(p) => p.to_path_buf(),
            None => paths::config_file()?,
        };

        match Self::load(&path) {
            Ok(config) => Ok(config),
            Err(ConfigError::NotFound(_)) => {
                info!("No configuration at {}, using defaults", path.display());
                Ok(Self::default())
            }
            Err(e) => Err(e),
        }
    }

    /// Parse configuration from a string.
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        json5::from_str(content).map_err(|e| ConfigError::Json5(e.to_string()))
    }

    /// Save configuration to the default path.
    pub fn save_default(&self) -> Result<(), ConfigError> {
        let path = paths::config_file()?;
        self.save(&path)
    }

    /// Save configuration to a file path.
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let content = self.to_json5()?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        // Write atomically
        let temp_path = path.with_extension("tmp");
        fs::write(&temp_path, &content)?;
        fs::rename(&temp_path, path)?;

        debug!("Saved configuration to {}", path.display());
        Ok(())
    }

    /// Serialize to JSON5 string.
    pub fn to_json5(&self) -> Result<String, ConfigError> {
        // json5 doesn't have a serializer, so we use serde_json with pretty print
        serde_json::to_string_pretty(self).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Validate the configuration, collecting all errors before returning.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut errors = Vec::new();
        let gateway = &self.gateway;

        if gateway.port == 0 {
            errors.push("Gateway port cannot be 0".to_string());
        }

        if gateway.max_connections == 0 {
            errors.push("Gateway max_connections must be greater than 0".to_string());
        }

        if gateway.outbound_buffer == 0 {
            errors.push("Gateway outbound_buffer must be greater than 0".to_string());
        }

        if gateway.max_messages_per_second == 0 {
            errors.push("Gateway max_messages_per_second must be greater than 0".to_string());
        }

        if gateway.max_body_chars == 0 {
            errors.push("Gateway max_body_chars must be greater than 0".to_string());
        }

        if gateway.max_storage_failures == 0 {
            errors.push("Gateway max_storage_failures must be greater than 0".to_string());
        }

        if gateway.history_limit == 0 || gateway.history_limit > 500 {
            errors.push(format!(
                "Gateway history_limit must be 1-500, got {}",
                gateway.history_limit
            ));
        }

        for origin in &gateway.allowed_origins {
            if !origin.starts_with("http://") && !origin.starts_with("https://") {
                errors.push(format!(
                    "Allowed origin '{}' must start with http:// or https://",
                    origin
                ));
            }
        }

        // Cookie names are RFC 6265 tokens
        let cookie = &self.auth.cookie_name;
        if cookie.is_empty()
            || !cookie
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
        {
            errors.push(format!("Invalid session cookie name '{}'", cookie));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Validation(errors.join("; ")))
        }
    }

    /// Resolved database path.
    pub fn database_path(&self) -> Result<PathBuf, ConfigError> {
        match &self.storage.database {
            Some(path) => Ok(paths::expand_tilde(&path.to_string_lossy())),
            None => paths::database_file(),
        }
    }
}

/// Builder for programmatic configuration.
#[derive(Debug, Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Create a new builder with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the gateway port.
    pub fn port(mut self, port: u16) -> Self {
        self.config.gateway.port = port;
        self
    }

    /// Set the bind mode.
    pub fn bind(mut self, bind: BindMode) -> Self {
        self.config.gateway.bind = bind;
        self
    }

    /// Set the database path.
    pub fn database(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.storage.database = Some(path.into());
        self
    }

    /// Set the session cookie name.
    pub fn cookie_name(mut self, name: impl Into<String>) -> Self {
        self.config.auth.cookie_name = name.into();
        self
    }

    /// Build the configuration.
    pub fn build(self) -> Config {
        self.config
    }
}
