use crate::core::{MediaItem, Resolution};
use serde::Serialize;
use std::collections::HashMap;

/// Files above this size are flagged by the health check (50 GiB).
pub const LARGE_FILE_THRESHOLD: u64 = 50 * 1024 * 1024 * 1024;
/// Summaries shorter than this (after trimming) count as missing.
pub const MIN_SUMMARY_LEN: usize = 10;
pub const TOP_N: usize = 10;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DistributionRow {
    pub key: String,
    pub count: u64,
    pub percentage: f64,
}

/// Bucket counts over a population, ordered by count descending then key.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Distribution {
    pub total: u64,
    pub rows: Vec<DistributionRow>,
}

impl Distribution {
    pub fn from_counts(counts: HashMap<String, u64>, total: u64) -> Self {
        let mut rows: Vec<DistributionRow> = counts
            .into_iter()
            .map(|(key, count)| DistributionRow {
                percentage: percentage(count, total),
                key,
                count,
            })
            .collect();
        rows.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.key.cmp(&b.key)));
        Self { total, rows }
    }

    fn tally<'a, I>(keys: I, total: u64) -> Self
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut counts: HashMap<String, u64> = HashMap::new();
        for key in keys {
            *counts.entry(key.to_string()).or_insert(0) += 1;
        }
        Self::from_counts(counts, total)
    }

    pub fn top(mut self, n: usize) -> Self {
        self.rows.truncate(n);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn count_sum(&self) -> u64 {
        self.rows.iter().map(|r| r.count).sum()
    }
}

pub fn percentage(count: u64, total: u64) -> f64 {
    if total == 0 {
        0.0
    } else {
        count as f64 / total as f64 * 100.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodecKind {
    Video,
    Audio,
}

pub fn resolution_distribution(items: &[MediaItem]) -> Distribution {
    Distribution::tally(
        items.iter().map(|i| i.resolution.as_str()),
        items.len() as u64,
    )
}

pub fn codec_distribution(items: &[MediaItem], kind: CodecKind) -> Distribution {
    Distribution::tally(
        items.iter().map(|i| match kind {
            CodecKind::Video => i.video_codec.as_str(),
            CodecKind::Audio => i.audio_codec.as_str(),
        }),
        items.len() as u64,
    )
}

/// Items without a release year are not bucketed.
pub fn top_n_by_year(items: &[MediaItem], n: usize) -> Distribution {
    let years: Vec<String> = items
        .iter()
        .filter_map(|i| i.release_year())
        .map(|y| y.to_string())
        .collect();
    Distribution::tally(years.iter().map(String::as_str), items.len() as u64).top(n)
}

/// An item counts once per genre it carries.
pub fn top_n_by_genre(items: &[MediaItem], n: usize) -> Distribution {
    Distribution::tally(
        items.iter().flat_map(|i| i.genres.iter().map(String::as_str)),
        items.len() as u64,
    )
    .top(n)
}

pub fn content_rating_distribution(items: &[MediaItem]) -> Distribution {
    Distribution::tally(
        items.iter().filter_map(|i| i.content_rating.as_deref()),
        items.len() as u64,
    )
}

#[derive(Debug, Clone, Serialize)]
pub struct QualityReport {
    pub total_items: u64,
    pub resolutions: Distribution,
    pub video_codecs: Distribution,
    pub audio_codecs: Distribution,
}

pub fn quality_report(items: &[MediaItem]) -> QualityReport {
    QualityReport {
        total_items: items.len() as u64,
        resolutions: resolution_distribution(items),
        video_codecs: codec_distribution(items, CodecKind::Video),
        audio_codecs: codec_distribution(items, CodecKind::Audio),
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct LibraryStats {
    pub total_items: u64,
    pub total_size: u64,
    pub watched_count: u64,
    pub unwatched_count: u64,
    pub total_duration_ms: u64,
    pub by_year: Distribution,
    pub by_genre: Distribution,
    pub by_rating: Distribution,
}

pub fn library_stats(items: &[MediaItem]) -> LibraryStats {
    let watched_count = items.iter().filter(|i| i.watched()).count() as u64;
    LibraryStats {
        total_items: items.len() as u64,
        total_size: items.iter().map(|i| i.size_bytes).sum(),
        watched_count,
        unwatched_count: items.len() as u64 - watched_count,
        total_duration_ms: items.iter().filter_map(|i| i.duration_ms).sum(),
        by_year: top_n_by_year(items, TOP_N),
        by_genre: top_n_by_genre(items, TOP_N),
        by_rating: content_rating_distribution(items),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HealthIssue {
    pub rating_key: String,
    pub title: String,
    pub detail: Option<String>,
    pub size_bytes: u64,
}

impl HealthIssue {
    fn new(item: &MediaItem, detail: Option<String>) -> Self {
        Self {
            rating_key: item.rating_key.clone(),
            title: item.title.clone(),
            detail,
            size_bytes: item.size_bytes,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct HealthReport {
    pub total_items: u64,
    pub missing_metadata: Vec<HealthIssue>,
    pub low_quality: Vec<HealthIssue>,
    pub no_subtitles: Vec<HealthIssue>,
    pub very_large_files: Vec<HealthIssue>,
    pub never_watched: Vec<HealthIssue>,
}

pub fn health_issues(items: &[MediaItem]) -> HealthReport {
    let mut report = HealthReport {
        total_items: items.len() as u64,
        ..Default::default()
    };

    for item in items {
        let summary_len = item
            .summary
            .as_deref()
            .map(|s| s.trim().chars().count())
            .unwrap_or(0);
        if summary_len < MIN_SUMMARY_LEN {
            report
                .missing_metadata
                .push(HealthIssue::new(item, Some("No summary".to_string())));
        } else if item.year.is_none() {
            report
                .missing_metadata
                .push(HealthIssue::new(item, Some("No year".to_string())));
        }

        if item.resolution == Resolution::Sd {
            report
                .low_quality
                .push(HealthIssue::new(item, Some(item.resolution.to_string())));
        }

        if !item.has_subtitles() {
            report.no_subtitles.push(HealthIssue::new(item, None));
        }

        if item.size_bytes > LARGE_FILE_THRESHOLD {
            report.very_large_files.push(HealthIssue::new(item, None));
        }

        if item.view_count == 0 {
            report.never_watched.push(HealthIssue::new(item, None));
        }
    }

    report
}
