pub mod aggregator;
pub mod downloader;
pub mod metadata;
pub mod source;

pub use aggregator::{Distribution, DistributionRow, HealthIssue, HealthReport, LibraryStats};
pub use downloader::{DownloadOptions, DownloadSummary, SubtitleDownloader};
pub use metadata::{
    normalize_language_code, DownloadRecord, LibrarySection, LibraryType, LibraryUsage,
    MediaItem, MediaKind, Resolution, ServerInfo, SubtitleCandidate, SubtitleFile,
    SubtitleStream,
};
pub use source::{MetadataSource, SubtitleSource};
