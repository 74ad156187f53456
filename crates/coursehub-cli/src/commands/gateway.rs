//! Gateway command.

use super::open_store;
use clap::Args;
use coursehub_core::config::BindMode;
use coursehub_core::Config;
use coursehub_gateway::Gateway;
use std::path::PathBuf;
use tracing::info;

/// Gateway command arguments.
#[derive(Args)]
pub struct GatewayArgs {
    #[command(subcommand)]
    pub command: GatewayCommand,
}

#[derive(clap::Subcommand)]
pub enum GatewayCommand {
    /// Start the gateway server
    Run {
        /// Bind mode (loopback, lan)
        #[arg(short, long)]
        bind: Option<String>,

        /// Port number
        #[arg(short, long)]
        port: Option<u16>,

        /// SQLite database path
        #[arg(long, env = "COURSEHUB_DATABASE")]
        database: Option<PathBuf>,
    },
}

/// Apply command-line overrides on top of the loaded configuration.
pub fn apply_overrides(
    mut config: Config,
    bind: Option<&str>,
    port: Option<u16>,
    database: Option<PathBuf>,
) -> anyhow::Result<Config> {
    if let Some(bind) = bind {
        config.gateway.bind = bind.parse::<BindMode>().map_err(anyhow::Error::msg)?;
    }
    if let Some(port) = port {
        config.gateway.port = port;
    }
    if let Some(database) = database {
        config.storage.database = Some(database);
    }
    config.validate()?;
    Ok(config)
}

/// Run the gateway command.
pub async fn run(args: GatewayArgs, config: Config) -> anyhow::Result<()> {
    match args.command {
        GatewayCommand::Run {
            bind,
            port,
            database,
        } => {
            let config = apply_overrides(config, bind.as_deref(), port, database)?;
            let store = open_store(&config)?;

            info!(
                "Using database {}",
                config.database_path()?.display()
            );

            let gateway = Gateway::new(config, store);
            gateway.run().await?;
        }
    }

    Ok(())
}
