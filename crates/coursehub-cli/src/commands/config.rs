//! Configuration management commands.

use clap::Args;
use coursehub_core::{paths, Config};
use std::path::{Path, PathBuf};

/// Config command arguments.
#[derive(Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(clap::Subcommand)]
pub enum ConfigCommand {
    /// Show the effective configuration
    Show,

    /// Get a configuration value
    Get {
        /// Configuration key (dot-separated path)
        key: String,
    },

    /// Set a configuration value
    Set {
        /// Configuration key
        key: String,

        /// Value to set
        value: String,
    },

    /// Write a default configuration file
    Init {
        /// Force overwrite existing config
        #[arg(short, long)]
        force: bool,
    },

    /// Show configuration file path
    Path,

    /// Validate the configuration file
    Validate,
}

fn config_path(path: Option<&Path>) -> anyhow::Result<PathBuf> {
    match path {
        Some(path) => Ok(path.to_path_buf()),
        None => Ok(paths::config_file()?),
    }
}

/// Look up a dot-separated key in the serialized configuration.
pub fn get_value(config: &Config, key: &str) -> anyhow::Result<serde_json::Value> {
    let json = serde_json::to_value(config)?;
    key.split('.')
        .try_fold(&json, |acc, k| acc.get(k))
        .cloned()
        .ok_or_else(|| anyhow::anyhow!("Key not found: {}", key))
}

/// Return a copy of `config` with a dot-separated key set.
///
/// The value is parsed as JSON first so numbers and booleans keep their
/// type; anything else is stored as a string. The result must still
/// deserialize and validate.
pub fn set_value(config: &Config, key: &str, value: &str) -> anyhow::Result<Config> {
    let mut json = serde_json::to_value(config)?;

    let parts: Vec<&str> = key.split('.').collect();
    let mut current = &mut json;
    for (i, part) in parts.iter().enumerate() {
        if i == parts.len() - 1 {
            let parsed: serde_json::Value = serde_json::from_str(value)
                .unwrap_or_else(|_| serde_json::Value::String(value.to_string()));
            current[part] = parsed;
        } else {
            if !current.get(part).is_some_and(|v| v.is_object()) {
                current[part] = serde_json::json!({});
            }
            current = &mut current[part];
        }
    }

    let updated: Config = serde_json::from_value(json)
        .map_err(|e| anyhow::anyhow!("Invalid configuration after set: {}", e))?;
    updated.validate()?;
    Ok(updated)
}

/// Run the config command.
pub fn run(args: ConfigArgs, path: Option<&Path>, config: &Config) -> anyhow::Result<()> {
    match args.command {
        ConfigCommand::Show => {
            println!("{}", config.to_json5()?);
        }

        ConfigCommand::Get { key } => {
            let value = get_value(config, &key)?;
            println!("{}", serde_json::to_string_pretty(&value)?);
        }

        ConfigCommand::Set { key, value } => {
            let updated = set_value(config, &key, &value)?;
            updated.save(&config_path(path)?)?;
            println!("Set {} = {}", key, value);
        }

        ConfigCommand::Init { force } => {
            let path = config_path(path)?;
            if path.exists() && !force {
                anyhow::bail!(
                    "Config file already exists: {:?}. Use --force to overwrite.",
                    path
                );
            }

            Config::default().save(&path)?;
            println!("Created config file: {:?}", path);
        }

        ConfigCommand::Path => {
            println!("{}", config_path(path)?.display());
        }

        ConfigCommand::Validate => {
            let path = config_path(path)?;
            let loaded = Config::load(&path)
                .map_err(|e| anyhow::anyhow!("Failed to load config: {}", e))?;
            loaded
                .validate()
                .map_err(|e| anyhow::anyhow!("Configuration error: {}", e))?;
            println!("Configuration is valid");
        }
    }

    Ok(())
}
