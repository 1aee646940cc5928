use clap::Parser;
use plex_tools::cli::{init_logging, ServerCli};
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = ServerCli::parse();
    init_logging(cli.verbose);

    info!("Starting plex-info-server v{}", env!("CARGO_PKG_VERSION"));

    cli.run().await?;

    Ok(())
}
