//! CourseHub command-line interface.

pub mod commands;
pub mod logging;

use clap::{Parser, Subcommand};
use coursehub_core::Config;
use std::path::{Path, PathBuf};

/// CourseHub - course chat and notification gateway
#[derive(Parser)]
#[command(name = "coursehub")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Increase logging verbosity
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Path to config file
    #[arg(short, long, env = "COURSEHUB_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand)]
pub enum Commands {
    /// Run the chat and notification gateway
    Gateway(commands::gateway::GatewayArgs),

    /// Manage users
    Users(commands::users::UsersArgs),

    /// Manage login sessions
    Sessions(commands::sessions::SessionsArgs),

    /// Load demo users, messages and course events
    Seed(commands::seed::SeedArgs),

    /// Configuration management
    Config(commands::config::ConfigArgs),

    /// Show version information
    Version,
}

/// Load the configuration from `path`, or the default location, falling back
/// to defaults when no file exists.
pub fn load_config(path: Option<&Path>) -> anyhow::Result<Config> {
    Ok(Config::load_or_default(path)?)
}

/// Run the CLI with the given arguments.
pub async fn run(cli: Cli, config: Config) -> anyhow::Result<()> {
    match cli.command {
        Commands::Gateway(args) => commands::gateway::run(args, config).await,
        Commands::Users(args) => commands::users::run(args, &config),
        Commands::Sessions(args) => commands::sessions::run(args, &config),
        Commands::Seed(args) => commands::seed::run(args, &config).await,
        Commands::Config(args) => commands::config::run(args, cli.config.as_deref(), &config),
        Commands::Version => {
            println!("coursehub {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}
