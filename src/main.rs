use clap::Parser;
use plex_tools::cli::{init_logging, InfoCli};
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = InfoCli::parse();
    init_logging(cli.verbose);

    info!("Starting plex-info v{}", env!("CARGO_PKG_VERSION"));

    cli.run().await?;

    Ok(())
}
