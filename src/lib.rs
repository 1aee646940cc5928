pub mod cli;
pub mod config;
pub mod core;
pub mod dashboard;
pub mod error;
pub mod report;
pub mod sources;
pub mod utils;

pub use config::Config;
pub use core::{MediaItem, MetadataSource, SubtitleDownloader, SubtitleSource};
pub use error::{Error, Result};
pub use sources::{OpenSubtitlesClient, PlexClient};
