use super::{banner, footer, section, truncate};
use crate::core::DownloadSummary;
use crate::utils::format_count;
use std::fmt;

pub struct DownloadView<'a> {
    pub summary: &'a DownloadSummary,
}

impl fmt::Display for DownloadView<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let summary = self.summary;
        banner(f, "SUBTITLE DOWNLOAD REPORT")?;
        writeln!(f)?;
        writeln!(f, "Languages: {}", summary.languages.join(", ").to_uppercase())?;
        writeln!(f, "Items missing subtitles: {}", format_count(summary.candidates as u64))?;
        writeln!(
            f,
            "Downloaded: {} (limit: {})",
            format_count(summary.records.len() as u64),
            summary
                .max_downloads
                .map(|m| format_count(m as u64))
                .unwrap_or_else(|| "none".to_string())
        )?;
        writeln!(f, "Skipped: {}", format_count(summary.skipped.len() as u64))?;
        writeln!(f, "Failed: {}", format_count(summary.failed.len() as u64))?;
        if summary.limit_reached {
            writeln!(f, "Stopped early: download limit reached")?;
        }

        section(f, &format!("DOWNLOADED ({})", summary.records.len()))?;
        writeln!(
            f,
            "{:<4} {:<36} {:<5} {:>6} {:>9}  {}",
            "#", "Title", "Lang", "Rating", "Downloads", "Uploader"
        )?;
        for (idx, record) in summary.records.iter().enumerate() {
            let c = &record.candidate;
            writeln!(
                f,
                "{:<4} {:<36} {:<5} {:>6.1} {:>9}  {}",
                idx + 1,
                truncate(&record.title, 36),
                c.language.to_uppercase(),
                c.rating,
                format_count(c.download_count),
                c.uploader.as_deref().unwrap_or("-"),
            )?;
            if let Some(release) = &c.release {
                writeln!(f, "     Release: {}", release)?;
            }
            writeln!(f, "     Saved To: {}", record.path.display())?;
            writeln!(
                f,
                "     At: {}",
                record.downloaded_at.format("%Y-%m-%d %H:%M:%S UTC")
            )?;
        }

        if !summary.skipped.is_empty() {
            section(f, &format!("SKIPPED ({})", summary.skipped.len()))?;
            for (idx, skipped) in summary.skipped.iter().enumerate() {
                writeln!(
                    f,
                    "{}. {} [{}] - {}",
                    idx + 1,
                    skipped.title,
                    skipped.language.to_uppercase(),
                    skipped.reason
                )?;
            }
        }

        if !summary.failed.is_empty() {
            section(f, &format!("FAILED ({})", summary.failed.len()))?;
            for (idx, failed) in summary.failed.iter().enumerate() {
                writeln!(
                    f,
                    "{}. {} [{}] - {}",
                    idx + 1,
                    failed.title,
                    failed.language.to_uppercase(),
                    failed.error
                )?;
            }
        }

        footer(f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::downloader::{FailedItem, SkipReason, SkippedItem};
    use crate::core::{DownloadRecord, SubtitleCandidate};
    use chrono::TimeZone;
    use std::path::PathBuf;

    #[test]
    fn test_empty_summary() {
        let summary = DownloadSummary {
            languages: vec!["en".to_string()],
            ..Default::default()
        };
        let text = DownloadView { summary: &summary }.to_string();

        assert!(text.contains("Languages: EN\n"));
        assert!(text.contains("Items missing subtitles: 0\n"));
        assert!(text.contains("Downloaded: 0 (limit: none)\n"));
        assert!(text.contains("DOWNLOADED (0)"));
        assert!(!text.contains("SKIPPED"));
        assert!(!text.contains("Stopped early"));
    }

    #[test]
    fn test_summary_sections() {
        let summary = DownloadSummary {
            languages: vec!["en".to_string(), "es".to_string()],
            candidates: 4,
            records: vec![DownloadRecord {
                rating_key: "1".to_string(),
                title: "Alien".to_string(),
                candidate: SubtitleCandidate {
                    language: "en".to_string(),
                    rating: 9.2,
                    download_count: 4500,
                    release: Some("Alien.1979.BluRay".to_string()),
                    uploader: Some("subber".to_string()),
                    file_id: 3,
                    file_name: None,
                },
                path: PathBuf::from("/movies/Alien.en.srt"),
                downloaded_at: chrono::Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap(),
            }],
            skipped: vec![SkippedItem {
                rating_key: "2".to_string(),
                title: "Heat".to_string(),
                language: "es".to_string(),
                reason: SkipReason::NoResults,
            }],
            failed: vec![FailedItem {
                rating_key: "3".to_string(),
                title: "Ran".to_string(),
                language: "en".to_string(),
                error: "HTTP error: timed out".to_string(),
            }],
            max_downloads: Some(1),
            limit_reached: true,
        };
        let text = DownloadView { summary: &summary }.to_string();

        assert!(text.contains("Languages: EN, ES\n"));
        assert!(text.contains("Downloaded: 1 (limit: 1)\n"));
        assert!(text.contains("Stopped early: download limit reached\n"));
        assert!(text.contains("1    Alien"));
        assert!(text.contains("   9.2     4,500  subber\n"));
        assert!(text.contains("     Saved To: /movies/Alien.en.srt\n"));
        assert!(text.contains("     At: 2024-03-01 12:00:00 UTC\n"));
        assert!(text.contains("1. Heat [ES] - no subtitles found\n"));
        assert!(text.contains("1. Ran [EN] - HTTP error: timed out\n"));
    }
}
