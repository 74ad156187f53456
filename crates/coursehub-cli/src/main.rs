//! CourseHub CLI entry point.

use clap::Parser;
use coursehub_cli::{load_config, logging, run, Cli};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = load_config(cli.config.as_deref())?;
    logging::init(&config.logging, cli.verbose)?;

    run(cli, config).await
}
