use crate::core::metadata::subtitle_extension;
use crate::core::{
    DownloadRecord, LibrarySection, MediaItem, MediaKind, MetadataSource, SubtitleCandidate,
    SubtitleSource,
};
use crate::error::Result;
use crate::utils::sanitize_filename;
use serde::Serialize;
use std::fmt;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};

#[derive(Debug, Clone)]
pub struct DownloadOptions {
    pub languages: Vec<String>,
    /// Stop after this many successful writes.
    pub max_downloads: Option<usize>,
    /// Replace subtitle files that already exist instead of skipping them.
    pub overwrite: bool,
    /// Pause after each successful download to stay under provider quotas.
    pub pause: Option<Duration>,
}

impl Default for DownloadOptions {
    fn default() -> Self {
        Self {
            languages: vec!["en".to_string()],
            max_downloads: None,
            overwrite: false,
            pause: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SkipReason {
    NoResults,
    AlreadyExists,
    NoFilePath,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::NoResults => write!(f, "no subtitles found"),
            SkipReason::AlreadyExists => write!(f, "subtitle file already exists"),
            SkipReason::NoFilePath => write!(f, "media file path unknown"),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SkippedItem {
    pub rating_key: String,
    pub title: String,
    pub language: String,
    pub reason: SkipReason,
}

#[derive(Debug, Clone, Serialize)]
pub struct FailedItem {
    pub rating_key: String,
    pub title: String,
    pub language: String,
    pub error: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct DownloadSummary {
    pub languages: Vec<String>,
    /// Number of (item, language) pairs lacking subtitles.
    pub candidates: usize,
    pub records: Vec<DownloadRecord>,
    pub skipped: Vec<SkippedItem>,
    pub failed: Vec<FailedItem>,
    pub max_downloads: Option<usize>,
    /// True when the run stopped with candidates left unprocessed.
    pub limit_reached: bool,
}

enum Outcome {
    Downloaded(DownloadRecord),
    Skipped(SkipReason),
}

/// Collects the items of one library, or of every video library when
/// `library` is `None`.
pub async fn enumerate_items(
    source: &dyn MetadataSource,
    library: Option<&str>,
    kind: Option<MediaKind>,
) -> Result<Vec<MediaItem>> {
    let libraries: Vec<LibrarySection> = match library {
        Some(name) => vec![source.library(name).await?],
        None => source
            .libraries()
            .await?
            .into_iter()
            .filter(|l| l.library_type.is_video())
            .collect(),
    };

    let mut items = Vec::new();
    for library in &libraries {
        info!("Scanning library: {}", library.title);
        items.extend(source.items(library, kind).await?);
    }
    info!("Found {} items across {} libraries", items.len(), libraries.len());
    Ok(items)
}

pub struct SubtitleDownloader<'a> {
    subtitles: &'a dyn SubtitleSource,
    options: DownloadOptions,
}

impl<'a> SubtitleDownloader<'a> {
    pub fn new(subtitles: &'a dyn SubtitleSource, options: DownloadOptions) -> Self {
        Self { subtitles, options }
    }

    /// Pairs every item with each requested language it has no subtitle for.
    pub fn candidates<'i>(&self, items: &'i [MediaItem]) -> Vec<(&'i MediaItem, String)> {
        items
            .iter()
            .flat_map(|item| {
                self.options
                    .languages
                    .iter()
                    .filter(move |lang| !item.has_subtitle_language(lang))
                    .map(move |lang| (item, lang.clone()))
            })
            .collect()
    }

    /// Highest rating wins; equal ratings fall back to download count.
    pub fn select_best(candidates: &[SubtitleCandidate]) -> Option<&SubtitleCandidate> {
        candidates.iter().max_by(|a, b| {
            a.rating
                .total_cmp(&b.rating)
                .then_with(|| a.download_count.cmp(&b.download_count))
        })
    }

    pub async fn run(&self, items: &[MediaItem]) -> DownloadSummary {
        let candidates = self.candidates(items);
        info!(
            "{} of {} items are missing subtitles in [{}]",
            candidates.len(),
            items.len(),
            self.options.languages.join(", ")
        );

        let mut summary = DownloadSummary {
            languages: self.options.languages.clone(),
            candidates: candidates.len(),
            max_downloads: self.options.max_downloads,
            ..Default::default()
        };

        for (item, language) in candidates {
            if let Some(max) = self.options.max_downloads {
                if summary.records.len() >= max {
                    info!("Reached maximum of {} downloads, stopping", max);
                    summary.limit_reached = true;
                    break;
                }
            }

            match self.process(item, &language).await {
                Ok(Outcome::Downloaded(record)) => {
                    info!(
                        "Downloaded {} subtitle for {} -> {}",
                        language,
                        item.title,
                        record.path.display()
                    );
                    summary.records.push(record);
                    if let Some(pause) = self.options.pause {
                        tokio::time::sleep(pause).await;
                    }
                }
                Ok(Outcome::Skipped(reason)) => {
                    debug!("Skipping {} [{}]: {}", item.title, language, reason);
                    summary.skipped.push(SkippedItem {
                        rating_key: item.rating_key.clone(),
                        title: item.title.clone(),
                        language,
                        reason,
                    });
                }
                Err(e) => {
                    warn!("Failed to get {} subtitle for {}: {}", language, item.title, e);
                    summary.failed.push(FailedItem {
                        rating_key: item.rating_key.clone(),
                        title: item.title.clone(),
                        language,
                        error: e.to_string(),
                    });
                }
            }
        }

        summary
    }

    async fn process(&self, item: &MediaItem, language: &str) -> Result<Outcome> {
        let Some(media_path) = item.file_path.as_deref() else {
            return Ok(Outcome::Skipped(SkipReason::NoFilePath));
        };

        let results = self.subtitles.search(item, language).await?;
        debug!(
            "{} returned {} results for {} [{}]",
            self.subtitles.name(),
            results.len(),
            item.title,
            language
        );
        let Some(best) = Self::select_best(&results) else {
            return Ok(Outcome::Skipped(SkipReason::NoResults));
        };

        // Check before downloading so existing files don't use up quota.
        let expected_ext = subtitle_extension(best.file_name.as_deref());
        let expected = subtitle_path(media_path, &item.title, language, expected_ext);
        if !self.options.overwrite && tokio::fs::try_exists(&expected).await.unwrap_or(false) {
            return Ok(Outcome::Skipped(SkipReason::AlreadyExists));
        }

        let file = self.subtitles.download(best).await?;
        let path = subtitle_path(media_path, &item.title, language, file.extension());

        if !write_subtitle(&path, &file.content, self.options.overwrite).await? {
            return Ok(Outcome::Skipped(SkipReason::AlreadyExists));
        }

        Ok(Outcome::Downloaded(DownloadRecord {
            rating_key: item.rating_key.clone(),
            title: item.title.clone(),
            candidate: best.clone(),
            path,
            downloaded_at: chrono::Utc::now(),
        }))
    }
}

/// `<media dir>/<sanitized title>.<language>.<ext>`
pub fn subtitle_path(media_path: &Path, title: &str, language: &str, ext: &str) -> PathBuf {
    let dir = media_path.parent().unwrap_or_else(|| Path::new("."));
    dir.join(format!("{}.{}.{}", sanitize_filename(title), language, ext))
}

/// Returns `false` when the file exists and `overwrite` is off.
async fn write_subtitle(path: &Path, content: &[u8], overwrite: bool) -> Result<bool> {
    let mut options = OpenOptions::new();
    options.write(true);
    if overwrite {
        options.create(true).truncate(true);
    } else {
        options.create_new(true);
    }

    let mut file = match options.open(path).await {
        Ok(file) => file,
        Err(e) if e.kind() == ErrorKind::AlreadyExists => return Ok(false),
        Err(e) => return Err(e.into()),
    };
    file.write_all(content).await?;
    file.flush().await?;
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(rating: f64, download_count: u64, file_id: u64) -> SubtitleCandidate {
        SubtitleCandidate {
            language: "en".to_string(),
            rating,
            download_count,
            release: None,
            uploader: None,
            file_id,
            file_name: None,
        }
    }

    #[test]
    fn test_select_best_breaks_rating_ties_by_downloads() {
        let candidates = vec![
            candidate(7.0, 50_000, 1),
            candidate(9.2, 120, 2),
            candidate(9.2, 4_500, 3),
        ];
        let best = SubtitleDownloader::select_best(&candidates).unwrap();
        assert_eq!(best.file_id, 3);
    }

    #[test]
    fn test_select_best_empty() {
        assert!(SubtitleDownloader::select_best(&[]).is_none());
    }

    #[test]
    fn test_subtitle_path_beside_media() {
        let path = subtitle_path(
            Path::new("/media/movies/Alien (1979)/Alien.mkv"),
            "Alien: Director's Cut",
            "en",
            "srt",
        );
        assert_eq!(
            path,
            PathBuf::from("/media/movies/Alien (1979)/Alien_ Director's Cut.en.srt")
        );
    }

    #[tokio::test]
    async fn test_write_subtitle_respects_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("movie.en.srt");

        assert!(write_subtitle(&path, b"first", false).await.unwrap());
        assert!(!write_subtitle(&path, b"second", false).await.unwrap());
        assert_eq!(std::fs::read(&path).unwrap(), b"first");

        assert!(write_subtitle(&path, b"third", true).await.unwrap());
        assert_eq!(std::fs::read(&path).unwrap(), b"third");
    }
}
