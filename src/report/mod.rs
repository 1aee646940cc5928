//! Plain-text report rendering.
//!
//! Every report is a small borrowing view that implements [`fmt::Display`],
//! so callers can print it, embed it in the dashboard or write it to disk
//! with [`write_report`].

mod analysis;
mod downloads;
mod library;

pub use analysis::{HealthView, QualityView, StatsView};
pub use downloads::DownloadView;
pub use library::{LibrariesView, ListingView, SystemInfo, SystemView};

use crate::error::Result;
use std::fmt;
use std::path::Path;
use tracing::info;

pub const WIDTH: usize = 80;
/// Health sections list at most this many items.
pub const HEALTH_PREVIEW: usize = 10;

pub(crate) fn heavy_rule(f: &mut fmt::Formatter<'_>) -> fmt::Result {
    writeln!(f, "{}", "=".repeat(WIDTH))
}

pub(crate) fn light_rule(f: &mut fmt::Formatter<'_>) -> fmt::Result {
    writeln!(f, "{}", "-".repeat(WIDTH))
}

/// `\n====\nTITLE\n====`
pub(crate) fn banner(f: &mut fmt::Formatter<'_>, title: &str) -> fmt::Result {
    writeln!(f)?;
    heavy_rule(f)?;
    writeln!(f, "{}", title)?;
    heavy_rule(f)
}

/// `\n----\nTITLE\n----`
pub(crate) fn section(f: &mut fmt::Formatter<'_>, title: &str) -> fmt::Result {
    writeln!(f)?;
    light_rule(f)?;
    writeln!(f, "{}", title)?;
    light_rule(f)
}

pub(crate) fn footer(f: &mut fmt::Formatter<'_>) -> fmt::Result {
    writeln!(f)?;
    heavy_rule(f)?;
    writeln!(f)
}

/// Cuts `text` to `width` characters, marking the cut with `...`.
pub(crate) fn truncate(text: &str, width: usize) -> String {
    if text.chars().count() <= width {
        text.to_string()
    } else {
        let mut cut: String = text.chars().take(width.saturating_sub(3)).collect();
        cut.push_str("...");
        cut
    }
}

pub fn write_report(path: &Path, report: &str) -> Result<()> {
    std::fs::write(path, report)?;
    info!("Report saved to: {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("exactly10!", 10), "exactly10!");
        assert_eq!(truncate("a much longer title", 10), "a much ...");
    }

    #[test]
    fn test_write_report() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.txt");
        write_report(&path, "hello\n").unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "hello\n");

        let missing = dir.path().join("no/such/dir/report.txt");
        assert!(write_report(&missing, "x").is_err());
    }
}
