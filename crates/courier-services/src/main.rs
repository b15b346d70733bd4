//! courier server binary

use anyhow::Result;
use clap::Parser;
use courier_services::{init_logging, Cli};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = cli.resolve()?;

    init_logging(&config.log_level, config.log_format)?;

    courier_services::run(config).await
}
