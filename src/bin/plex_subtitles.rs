use clap::Parser;
use plex_tools::cli::{init_logging, SubtitlesCli};
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = SubtitlesCli::parse();
    init_logging(cli.verbose);

    info!("Starting plex-subtitles v{}", env!("CARGO_PKG_VERSION"));

    cli.run().await?;

    Ok(())
}
