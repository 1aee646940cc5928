use crate::config::{parse_languages, Config};
use crate::core::downloader::enumerate_items;
use crate::core::{
    DownloadOptions, DownloadSummary, MediaKind, MetadataSource, SubtitleDownloader,
    SubtitleSource,
};
use crate::error::{Error, Result};
use crate::report::{write_report, DownloadView};
use crate::sources::{OpenSubtitlesClient, PlexClient};
use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;
use tracing::info;

/// Pause between successful downloads.
const DOWNLOAD_PAUSE: Duration = Duration::from_secs(1);

#[derive(Parser, Debug, Clone)]
#[command(name = "plex-subtitles")]
#[command(about = "Download missing subtitles for Plex items from OpenSubtitles")]
#[command(version)]
pub struct SubtitlesCli {
    /// Library to scan. Scans every movie and show library when omitted
    #[arg(short, long)]
    pub library: Option<String>,

    /// Filter by media type
    #[arg(short = 't', long = "type", value_enum)]
    pub media_type: Option<MediaKind>,

    /// Comma-separated language codes (default: SUBTITLE_LANGUAGES or "en")
    #[arg(long)]
    pub languages: Option<String>,

    /// Stop after this many successful downloads
    #[arg(short, long)]
    pub max_downloads: Option<usize>,

    /// Write the download report to this file
    #[arg(short, long)]
    pub report: Option<PathBuf>,

    /// Replace subtitle files that already exist
    #[arg(long)]
    pub overwrite: bool,

    /// TOML config file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,
}

impl SubtitlesCli {
    pub async fn run(&self) -> anyhow::Result<()> {
        let config = Config::load(self.config.as_deref())?;

        let plex = PlexClient::new(&config)?;
        let opensubtitles = OpenSubtitlesClient::connect(&config)
            .await
            .context("Could not log into OpenSubtitles")?;

        let summary = self
            .execute(&config, &plex, &opensubtitles, Some(DOWNLOAD_PAUSE))
            .await?;
        let text = DownloadView { summary: &summary }.to_string();
        print!("{}", text);

        if let Some(path) = &self.report {
            write_report(path, &text)
                .with_context(|| format!("Failed to write report to {}", path.display()))?;
        }

        Ok(())
    }

    /// Enumerates items and runs the downloader against the given sources.
    pub async fn execute(
        &self,
        config: &Config,
        metadata: &dyn MetadataSource,
        subtitles: &dyn SubtitleSource,
        pause: Option<Duration>,
    ) -> Result<DownloadSummary> {
        let languages = match &self.languages {
            Some(list) => parse_languages(list)?,
            None => config.languages.clone(),
        };
        if languages.is_empty() {
            return Err(Error::InvalidConfig(
                "at least one subtitle language is required".to_string(),
            ));
        }

        let items = enumerate_items(metadata, self.library.as_deref(), self.media_type).await?;

        let downloader = SubtitleDownloader::new(
            subtitles,
            DownloadOptions {
                languages,
                max_downloads: self.max_downloads,
                overwrite: self.overwrite,
                pause,
            },
        );
        let summary = downloader.run(&items).await;

        info!(
            "Downloaded {} subtitles ({} skipped, {} failed)",
            summary.records.len(),
            summary.skipped.len(),
            summary.failed.len()
        );
        Ok(summary)
    }
}
