use super::{banner, footer, section, HEALTH_PREVIEW};
use crate::core::aggregator::{percentage, Distribution, QualityReport};
use crate::core::{HealthIssue, HealthReport, LibraryStats};
use crate::utils::{format_bytes, format_count, format_runtime_ms};
use std::fmt;

pub struct QualityView<'a> {
    pub library: &'a str,
    pub report: &'a QualityReport,
}

impl fmt::Display for QualityView<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        banner(f, &format!("VIDEO QUALITY ANALYSIS - {}", self.library))?;
        writeln!(f)?;
        writeln!(f, "Total Items: {}", format_count(self.report.total_items))?;

        for (title, dist) in [
            ("RESOLUTION DISTRIBUTION", &self.report.resolutions),
            ("VIDEO CODEC DISTRIBUTION", &self.report.video_codecs),
            ("AUDIO CODEC DISTRIBUTION", &self.report.audio_codecs),
        ] {
            section(f, title)?;
            distribution_rows(f, dist)?;
        }

        footer(f)
    }
}

fn distribution_rows(f: &mut fmt::Formatter<'_>, dist: &Distribution) -> fmt::Result {
    for row in &dist.rows {
        writeln!(
            f,
            "{:<15}: {:>5} ({:5.1}%)",
            row.key,
            format_count(row.count),
            row.percentage
        )?;
    }
    Ok(())
}

pub struct StatsView<'a> {
    pub library: &'a str,
    pub stats: &'a LibraryStats,
}

impl fmt::Display for StatsView<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let stats = self.stats;
        banner(f, &format!("LIBRARY STATISTICS - {}", self.library))?;

        writeln!(f)?;
        writeln!(f, "Total Items: {}", format_count(stats.total_items))?;
        writeln!(f, "Total Size: {}", format_bytes(stats.total_size))?;
        if stats.total_duration_ms > 0 {
            writeln!(f, "Total Runtime: {}", format_runtime_ms(stats.total_duration_ms))?;
        }

        writeln!(f)?;
        writeln!(
            f,
            "Watched: {} ({:.1}%)",
            format_count(stats.watched_count),
            percentage(stats.watched_count, stats.total_items)
        )?;
        writeln!(
            f,
            "Unwatched: {} ({:.1}%)",
            format_count(stats.unwatched_count),
            percentage(stats.unwatched_count, stats.total_items)
        )?;

        if !stats.by_year.is_empty() {
            section(f, "BY YEAR (Top 10)")?;
            for row in &stats.by_year.rows {
                writeln!(f, "{}: {}", row.key, format_count(row.count))?;
            }
        }

        if !stats.by_genre.is_empty() {
            section(f, "BY GENRE (Top 10)")?;
            for row in &stats.by_genre.rows {
                writeln!(f, "{:<25}: {}", row.key, format_count(row.count))?;
            }
        }

        if !stats.by_rating.is_empty() {
            section(f, "BY CONTENT RATING")?;
            for row in &stats.by_rating.rows {
                writeln!(f, "{:<15}: {}", row.key, format_count(row.count))?;
            }
        }

        footer(f)
    }
}

pub struct HealthView<'a> {
    pub library: &'a str,
    pub health: &'a HealthReport,
}

impl fmt::Display for HealthView<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let health = self.health;
        banner(f, &format!("LIBRARY HEALTH CHECK - {}", self.library))?;
        writeln!(f)?;
        writeln!(f, "Total Items Scanned: {}", format_count(health.total_items))?;

        issue_section(
            f,
            "MISSING METADATA",
            &health.missing_metadata,
            "✓ No issues found",
            |i| format!("{} - Issue: {}", i.title, i.detail.as_deref().unwrap_or("Unknown")),
        )?;
        issue_section(
            f,
            "LOW QUALITY (SD)",
            &health.low_quality,
            "✓ No SD content found",
            |i| format!("{} - {}", i.title, i.detail.as_deref().unwrap_or("SD")),
        )?;
        issue_section(
            f,
            "MISSING SUBTITLES",
            &health.no_subtitles,
            "✓ All items have subtitles",
            |i| i.title.clone(),
        )?;
        issue_section(
            f,
            "VERY LARGE FILES (>50GB)",
            &health.very_large_files,
            "✓ No files larger than 50GB",
            |i| format!("{} - {}", i.title, format_bytes(i.size_bytes)),
        )?;
        issue_section(
            f,
            "NEVER WATCHED",
            &health.never_watched,
            "✓ All items have been watched at least once",
            |i| i.title.clone(),
        )?;

        footer(f)
    }
}

fn issue_section<F>(
    f: &mut fmt::Formatter<'_>,
    title: &str,
    issues: &[HealthIssue],
    all_clear: &str,
    describe: F,
) -> fmt::Result
where
    F: Fn(&HealthIssue) -> String,
{
    section(f, &format!("{}: {} items", title, issues.len()))?;
    if issues.is_empty() {
        return writeln!(f, "{}", all_clear);
    }
    for (idx, issue) in issues.iter().take(HEALTH_PREVIEW).enumerate() {
        writeln!(f, "{}. {}", idx + 1, describe(issue))?;
    }
    if issues.len() > HEALTH_PREVIEW {
        writeln!(f, "... and {} more", issues.len() - HEALTH_PREVIEW)?;
    }
    Ok(())
}
