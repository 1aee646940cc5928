pub mod server;
pub mod subtitles;

pub use server::ServerCli;
pub use subtitles::SubtitlesCli;

use crate::config::Config;
use crate::core::aggregator::{health_issues, library_stats, quality_report};
use crate::core::{LibraryUsage, MediaItem, MediaKind, MetadataSource};
use crate::error::{Error, Result};
use crate::report::{
    write_report, HealthView, LibrariesView, ListingView, QualityView, StatsView, SystemInfo,
    SystemView,
};
use crate::sources::{LocalMachine, PlexClient};
use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;
use tracing::{info, warn, Level};

pub const DEFAULT_OUTPUT: &str = "plex_info.txt";

const EXAMPLES: &str = "\
Examples:
  # List all available libraries
  plex-info

  # List all movies with details
  plex-info --library \"Movies\"

  # Find items missing subtitles
  plex-info --library \"Movies\" --list-missing

  # Analyze quality distribution
  plex-info --library \"Movies\" --quality

  # Get library statistics
  plex-info --library \"Movies\" --stats

  # Check library health
  plex-info --library \"Movies\" --health

  # View server information
  plex-info --system";

#[derive(Parser, Debug, Clone)]
#[command(name = "plex-info")]
#[command(about = "Plex library analysis: subtitles, quality, statistics and health")]
#[command(version, after_help = EXAMPLES)]
pub struct InfoCli {
    /// Library to analyze (e.g. "Movies"). Lists all libraries when omitted
    #[arg(short, long)]
    pub library: Option<String>,

    /// Filter by media type
    #[arg(short = 't', long = "type", value_enum)]
    pub media_type: Option<MediaKind>,

    /// Show only items missing subtitles
    #[arg(long)]
    pub list_missing: bool,

    /// Analyze video quality and codec distribution
    #[arg(long, requires = "library")]
    pub quality: bool,

    /// Show watch counts, genres, years and content ratings
    #[arg(long, requires = "library")]
    pub stats: bool,

    /// Check for missing metadata, SD content, missing subtitles and more
    #[arg(long, requires = "library")]
    pub health: bool,

    /// Show Plex server information
    #[arg(long)]
    pub system: bool,

    /// Report file (the item listing is always saved, to plex_info.txt by default)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Plex server URL (default: PLEX_URL or http://localhost:32400)
    #[arg(long)]
    pub plex_url: Option<String>,

    /// Plex authentication token (default: PLEX_TOKEN)
    #[arg(long)]
    pub plex_token: Option<String>,

    /// TOML config file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,
}

/// A rendered report and whether it goes to the default output file.
#[derive(Debug, Clone)]
pub struct Rendered {
    pub text: String,
    pub save: bool,
}

impl InfoCli {
    pub async fn run(&self) -> anyhow::Result<()> {
        let mut config = Config::load(self.config.as_deref())?;
        if let Some(url) = &self.plex_url {
            config.plex_url = url.clone();
        }
        if let Some(token) = &self.plex_token {
            config.plex_token = Some(token.clone());
        }
        config.validate()?;

        let plex = PlexClient::new(&config)?;
        let rendered = self.render(&plex).await?;
        print!("{}", rendered.text);

        let output = self
            .output
            .clone()
            .or_else(|| rendered.save.then(|| PathBuf::from(DEFAULT_OUTPUT)));
        if let Some(path) = output {
            write_report(&path, &rendered.text)
                .with_context(|| format!("Failed to write report to {}", path.display()))?;
        }

        Ok(())
    }

    /// Builds the report the flags ask for. Flags are checked in the order
    /// system, quality, stats, health; otherwise items (or libraries) are listed.
    pub async fn render(&self, source: &dyn MetadataSource) -> Result<Rendered> {
        if self.system {
            info!("Gathering system information...");
            let info = system_info(source).await?;
            return Ok(Rendered {
                text: SystemView { info: &info }.to_string(),
                save: false,
            });
        }

        let Some(library_name) = self.library.as_deref() else {
            if self.quality || self.stats || self.health {
                return Err(Error::InvalidConfig(
                    "--library is required for --quality, --stats and --health".to_string(),
                ));
            }
            let libraries = library_usage(source).await?;
            return Ok(Rendered {
                text: LibrariesView { libraries: &libraries }.to_string(),
                save: false,
            });
        };

        let library = source.library(library_name).await?;
        let items = source.items(&library, self.media_type).await?;

        let text = if self.quality {
            info!("Analyzing quality distribution for library: {}", library_name);
            let report = quality_report(&items);
            QualityView { library: library_name, report: &report }.to_string()
        } else if self.stats {
            info!("Gathering statistics for library: {}", library_name);
            let stats = library_stats(&items);
            StatsView { library: library_name, stats: &stats }.to_string()
        } else if self.health {
            info!("Checking health for library: {}", library_name);
            let health = health_issues(&items);
            HealthView { library: library_name, health: &health }.to_string()
        } else {
            return Ok(self.listing(items));
        };

        Ok(Rendered { text, save: false })
    }

    fn listing(&self, items: Vec<MediaItem>) -> Rendered {
        let items: Vec<MediaItem> = if self.list_missing {
            items.into_iter().filter(|i| !i.has_subtitles()).collect()
        } else {
            items
        };

        if self.list_missing && items.is_empty() {
            return Rendered {
                text: "\n✓ All items in the library have subtitles!\n\n".to_string(),
                save: false,
            };
        }

        Rendered {
            text: ListingView { items: &items }.to_string(),
            save: true,
        }
    }
}

/// Usage for every library. A library that fails to load is logged and left out.
pub async fn library_usage(source: &dyn MetadataSource) -> Result<Vec<LibraryUsage>> {
    let mut usage = Vec::new();
    for library in source.libraries().await? {
        match source.library_usage(&library).await {
            Ok(u) => usage.push(u),
            Err(e) => warn!("Could not read library '{}': {}", library.title, e),
        }
    }
    Ok(usage)
}

pub async fn system_info(source: &dyn MetadataSource) -> Result<SystemInfo> {
    Ok(SystemInfo {
        server: source.server_info().await?,
        libraries: library_usage(source).await?,
        local: LocalMachine::detect().await,
    })
}

pub fn init_logging(verbose: bool) {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();
}
