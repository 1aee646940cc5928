use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Movie,
    Episode,
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MediaKind::Movie => write!(f, "movie"),
            MediaKind::Episode => write!(f, "episode"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LibraryType {
    Movie,
    Show,
    Artist,
    Photo,
    Other(String),
}

impl LibraryType {
    pub fn from_plex(value: &str) -> Self {
        match value {
            "movie" => LibraryType::Movie,
            "show" => LibraryType::Show,
            "artist" => LibraryType::Artist,
            "photo" => LibraryType::Photo,
            other => LibraryType::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            LibraryType::Movie => "movie",
            LibraryType::Show => "show",
            LibraryType::Artist => "artist",
            LibraryType::Photo => "photo",
            LibraryType::Other(other) => other,
        }
    }

    /// Libraries whose items carry video files that can take subtitles.
    pub fn is_video(&self) -> bool {
        matches!(self, LibraryType::Movie | LibraryType::Show)
    }

    /// Noun used when counting this library's leaf items.
    pub fn item_noun(&self) -> &'static str {
        match self {
            LibraryType::Movie => "movies",
            LibraryType::Show => "episodes",
            LibraryType::Artist => "tracks",
            _ => "items",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LibrarySection {
    pub key: String,
    pub title: String,
    pub library_type: LibraryType,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServerInfo {
    pub friendly_name: String,
    pub version: Option<String>,
    pub platform: Option<String>,
    pub platform_version: Option<String>,
    pub machine_identifier: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LibraryUsage {
    pub section: LibrarySection,
    pub items_count: u64,
    pub total_size: u64,
}

/// Coarse quality class of a video stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Resolution {
    #[serde(rename = "4K")]
    Uhd4k,
    #[serde(rename = "1080p")]
    Hd1080,
    #[serde(rename = "720p")]
    Hd720,
    #[serde(rename = "SD")]
    Sd,
    Unknown,
}

impl Resolution {
    pub fn from_height(height: u32) -> Self {
        match height {
            h if h >= 2160 => Resolution::Uhd4k,
            h if h >= 1080 => Resolution::Hd1080,
            h if h >= 720 => Resolution::Hd720,
            _ => Resolution::Sd,
        }
    }

    /// Maps Plex's `videoResolution` attribute ("4k", "1080", "720", "480", "sd").
    pub fn from_plex_label(label: &str) -> Self {
        match label.to_lowercase().as_str() {
            "4k" | "2160" | "2160p" => Resolution::Uhd4k,
            "1080" | "1080p" => Resolution::Hd1080,
            "720" | "720p" => Resolution::Hd720,
            "sd" | "480" | "576" | "360" | "240" => Resolution::Sd,
            _ => Resolution::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Resolution::Uhd4k => "4K",
            Resolution::Hd1080 => "1080p",
            Resolution::Hd720 => "720p",
            Resolution::Sd => "SD",
            Resolution::Unknown => "Unknown",
        }
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubtitleStream {
    /// Normalized code, see [`normalize_language_code`].
    pub language_code: String,
    pub language: String,
    pub format: String,
    pub title: Option<String>,
    pub forced: bool,
    pub external: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaItem {
    pub rating_key: String,
    pub kind: MediaKind,
    /// Display title. Episodes read `Show - S01E02 - Title`.
    pub title: String,
    pub show_title: Option<String>,
    pub season_number: Option<u32>,
    pub episode_number: Option<u32>,
    pub file_path: Option<PathBuf>,
    pub size_bytes: u64,
    pub resolution: Resolution,
    pub video_codec: String,
    pub audio_codec: String,
    pub view_count: u32,
    pub last_viewed_at: Option<DateTime<Utc>>,
    pub summary: Option<String>,
    pub year: Option<i32>,
    pub originally_available_at: Option<NaiveDate>,
    pub genres: Vec<String>,
    pub content_rating: Option<String>,
    pub duration_ms: Option<u64>,
    pub web_url: Option<String>,
    pub subtitle_streams: Vec<SubtitleStream>,
}

impl MediaItem {
    pub fn watched(&self) -> bool {
        self.view_count > 0
    }

    pub fn has_subtitles(&self) -> bool {
        !self.subtitle_streams.is_empty()
    }

    /// Matches on the primary subtag, so a `pt-br` request is satisfied by a
    /// `pt` stream.
    pub fn has_subtitle_language(&self, language: &str) -> bool {
        let wanted = canonical_language(language);
        let wanted = primary_subtag(&wanted);
        self.subtitle_streams
            .iter()
            .any(|s| primary_subtag(&s.language_code) == wanted)
    }

    /// Distinct subtitle languages, in stream order.
    pub fn subtitle_languages(&self) -> Vec<&str> {
        let mut languages: Vec<&str> = Vec::new();
        for stream in &self.subtitle_streams {
            if !languages.contains(&stream.language_code.as_str()) {
                languages.push(&stream.language_code);
            }
        }
        languages
    }

    /// Release year, falling back to the original air date.
    pub fn release_year(&self) -> Option<i32> {
        self.year
            .or_else(|| self.originally_available_at.map(|d| d.year()))
    }

    /// Title of the movie or show, without the episode decoration.
    pub fn base_title(&self) -> &str {
        self.show_title.as_deref().unwrap_or(&self.title)
    }
}

pub fn episode_title(show: &str, season: u32, episode: u32, title: &str) -> String {
    format!("{} - S{:02}E{:02} - {}", show, season, episode, title)
}

/// Canonical form of a requested language. The primary subtag is normalized
/// like a stream code and a region subtag is kept: `POR-BR` becomes `pt-br`.
pub fn canonical_language(code: &str) -> String {
    let code = code.trim().to_lowercase();
    match code.split_once('-') {
        Some((primary, region)) => {
            format!("{}-{}", normalize_language_code(Some(primary)), region)
        }
        None => normalize_language_code(Some(&code)),
    }
}

pub fn primary_subtag(code: &str) -> &str {
    code.split('-').next().unwrap_or(code)
}

/// Normalizes Plex language codes: common ISO 639-2 codes map to their
/// two-letter form, other three-letter codes are truncated.
pub fn normalize_language_code(code: Option<&str>) -> String {
    let code = match code.map(str::trim) {
        Some(code) if !code.is_empty() => code.to_lowercase(),
        _ => return "unknown".to_string(),
    };

    if code.chars().count() == 3 {
        match code.as_str() {
            "eng" => "en".to_string(),
            "spa" => "es".to_string(),
            "fra" => "fr".to_string(),
            "deu" => "de".to_string(),
            "ita" => "it".to_string(),
            "por" => "pt".to_string(),
            other => other.chars().take(2).collect(),
        }
    } else {
        code
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubtitleCandidate {
    pub language: String,
    pub rating: f64,
    pub download_count: u64,
    pub release: Option<String>,
    pub uploader: Option<String>,
    /// Provider file reference used to request the download.
    pub file_id: u64,
    pub file_name: Option<String>,
}

/// A downloaded subtitle file, not yet written to disk.
#[derive(Debug, Clone)]
pub struct SubtitleFile {
    pub file_name: String,
    pub content: Vec<u8>,
}

impl SubtitleFile {
    pub fn extension(&self) -> &str {
        subtitle_extension(Some(&self.file_name))
    }
}

/// Extension of a provider file name, `srt` when it has none that looks real.
pub fn subtitle_extension(file_name: Option<&str>) -> &str {
    match file_name.and_then(|name| name.rsplit_once('.')) {
        Some((_, ext)) if !ext.is_empty() && ext.len() <= 4 => ext,
        _ => "srt",
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DownloadRecord {
    pub rating_key: String,
    pub title: String,
    pub candidate: SubtitleCandidate,
    pub path: PathBuf,
    pub downloaded_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolution_from_height() {
        assert_eq!(Resolution::from_height(2160), Resolution::Uhd4k);
        assert_eq!(Resolution::from_height(1080), Resolution::Hd1080);
        assert_eq!(Resolution::from_height(800), Resolution::Hd720);
        assert_eq!(Resolution::from_height(576), Resolution::Sd);
        assert_eq!(Resolution::from_plex_label("4k"), Resolution::Uhd4k);
        assert_eq!(Resolution::from_plex_label("sd"), Resolution::Sd);
        assert_eq!(Resolution::from_plex_label("weird"), Resolution::Unknown);
    }

    #[test]
    fn test_normalize_language_code() {
        assert_eq!(normalize_language_code(Some("eng")), "en");
        assert_eq!(normalize_language_code(Some("DEU")), "de");
        assert_eq!(normalize_language_code(Some("jpn")), "jp");
        assert_eq!(normalize_language_code(Some("EN")), "en");
        assert_eq!(normalize_language_code(Some("")), "unknown");
        assert_eq!(normalize_language_code(None), "unknown");
    }

    #[test]
    fn test_subtitle_file_extension() {
        let file = SubtitleFile {
            file_name: "movie.eng.ass".to_string(),
            content: vec![],
        };
        assert_eq!(file.extension(), "ass");

        let file = SubtitleFile {
            file_name: "no_extension".to_string(),
            content: vec![],
        };
        assert_eq!(file.extension(), "srt");

        assert_eq!(subtitle_extension(Some("Alien.1979.subtitles")), "srt");
        assert_eq!(subtitle_extension(None), "srt");
    }

    #[test]
    fn test_canonical_language() {
        assert_eq!(canonical_language("ENG"), "en");
        assert_eq!(canonical_language(" pt-BR "), "pt-br");
        assert_eq!(canonical_language("por-br"), "pt-br");
        assert_eq!(primary_subtag("pt-br"), "pt");
        assert_eq!(primary_subtag("en"), "en");
    }

    #[test]
    fn test_region_request_matches_base_stream() {
        let mut item = crate::core::aggregator::tests::item("1", Resolution::Hd1080, "H264");
        item.subtitle_streams[0].language_code = normalize_language_code(Some("por"));

        assert!(item.has_subtitle_language("pt-br"));
        assert!(item.has_subtitle_language("pt"));
        assert!(item.has_subtitle_language("por"));
        assert!(!item.has_subtitle_language("en"));
    }
}
