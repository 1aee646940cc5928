//! Plex Media Server client.
//!
//! Talks to the server's JSON API (`Accept: application/json`) using an
//! `X-Plex-Token`. Library listings don't carry stream details, so each item
//! is re-read from `/library/metadata/{ratingKey}` to resolve its subtitle
//! streams.

use crate::config::Config;
use crate::core::metadata::episode_title;
use crate::core::{
    normalize_language_code, LibrarySection, LibraryType, LibraryUsage, MediaItem, MediaKind,
    MetadataSource, Resolution, ServerInfo, SubtitleStream,
};
use crate::error::{Error, Result};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use std::path::PathBuf;
use std::time::Duration;
use tokio::sync::OnceCell;
use tracing::{debug, info, warn};

const PLEX_HEADERS: &[(&str, &str)] = &[
    ("X-Plex-Product", "plex-tools"),
    ("X-Plex-Client-Identifier", "plex-tools-cli"),
    ("Accept", "application/json"),
];

/// Plex `type` filter values for `/library/sections/{key}/all`.
const TYPE_MOVIE: u32 = 1;
const TYPE_EPISODE: u32 = 4;
const TYPE_TRACK: u32 = 10;
const TYPE_PHOTO: u32 = 13;

const STREAM_TYPE_SUBTITLE: u32 = 3;

pub struct PlexClient {
    client: reqwest::Client,
    base_url: String,
    token: String,
    identity: OnceCell<ServerInfo>,
}

impl PlexClient {
    pub fn new(config: &Config) -> Result<Self> {
        let token = config.plex_token()?.to_string();
        let client = reqwest::Client::builder()
            .user_agent(&config.user_agent)
            .timeout(Duration::from_secs(config.timeout))
            .build()?;

        Ok(Self {
            client,
            base_url: config.plex_url.trim_end_matches('/').to_string(),
            token,
            identity: OnceCell::new(),
        })
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T> {
        let url = format!("{}{}", self.base_url, path);
        debug!("GET {}", url);

        let mut request = self
            .client
            .get(&url)
            .header("X-Plex-Token", &self.token)
            .query(query);
        for (name, value) in PLEX_HEADERS {
            request = request.header(*name, *value);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Api {
                service: "Plex",
                status: status.as_u16(),
                message: if body.is_empty() {
                    status.canonical_reason().unwrap_or("request failed").to_string()
                } else {
                    body
                },
            });
        }

        Ok(response.json().await?)
    }

    async fn identity(&self) -> Result<&ServerInfo> {
        self.identity
            .get_or_try_init(|| async {
                let response: PlexResponse<PlexIdentity> = self.get_json("/", &[]).await?;
                let identity = response.media_container;
                info!("Connected to Plex server: {}", identity.friendly_name);
                Ok::<_, Error>(ServerInfo {
                    friendly_name: identity.friendly_name,
                    version: identity.version,
                    platform: identity.platform,
                    platform_version: identity.platform_version,
                    machine_identifier: identity.machine_identifier,
                })
            })
            .await
    }

    async fn list(
        &self,
        library: &LibrarySection,
        plex_type: Option<u32>,
    ) -> Result<Vec<PlexMetadata>> {
        let query: Vec<(&str, String)> = plex_type
            .map(|t| vec![("type", t.to_string())])
            .unwrap_or_default();
        let response: PlexResponse<PlexMetadataContainer> = self
            .get_json(&format!("/library/sections/{}/all", library.key), &query)
            .await?;
        Ok(response.media_container.metadata)
    }

    async fn details(&self, rating_key: &str) -> Result<Option<PlexMetadata>> {
        let response: PlexResponse<PlexMetadataContainer> = self
            .get_json(&format!("/library/metadata/{}", rating_key), &[])
            .await?;
        Ok(response.media_container.metadata.into_iter().next())
    }

    fn web_url(&self, machine_identifier: Option<&str>, rating_key: &str) -> Option<String> {
        machine_identifier.map(|machine| {
            format!(
                "{}/web/index.html#!/server/{}/details?key=/library/metadata/{}",
                self.base_url, machine, rating_key
            )
        })
    }
}

#[async_trait]
impl MetadataSource for PlexClient {
    async fn server_info(&self) -> Result<ServerInfo> {
        Ok(self.identity().await?.clone())
    }

    async fn libraries(&self) -> Result<Vec<LibrarySection>> {
        let response: PlexResponse<PlexDirectoryContainer> =
            self.get_json("/library/sections", &[]).await?;
        let libraries: Vec<LibrarySection> = response
            .media_container
            .directory
            .into_iter()
            .map(|dir| LibrarySection {
                key: dir.key,
                title: dir.title,
                library_type: LibraryType::from_plex(&dir.type_),
            })
            .collect();
        debug!("Found {} libraries", libraries.len());
        Ok(libraries)
    }

    async fn items(
        &self,
        library: &LibrarySection,
        kind: Option<MediaKind>,
    ) -> Result<Vec<MediaItem>> {
        let plex_type = match (kind, &library.library_type) {
            (Some(MediaKind::Movie), _) | (None, LibraryType::Movie) => TYPE_MOVIE,
            (Some(MediaKind::Episode), _) | (None, LibraryType::Show) => TYPE_EPISODE,
            (None, other) => {
                warn!(
                    "Library '{}' has type '{}', which holds no movies or episodes",
                    library.title,
                    other.as_str()
                );
                return Ok(Vec::new());
            }
        };

        let listing = self.list(library, Some(plex_type)).await?;
        info!("Scanning {} items in '{}'...", listing.len(), library.title);

        let machine = self.identity().await?.machine_identifier.clone();
        let mut items = Vec::with_capacity(listing.len());
        for meta in listing {
            let meta = match self.details(&meta.rating_key).await {
                Ok(Some(detailed)) => detailed,
                Ok(None) => meta,
                Err(e) => {
                    warn!("Could not load details for '{}': {}", meta.title, e);
                    meta
                }
            };
            let web_url = self.web_url(machine.as_deref(), &meta.rating_key);
            items.push(to_media_item(meta, web_url));
        }
        Ok(items)
    }

    async fn library_usage(&self, library: &LibrarySection) -> Result<LibraryUsage> {
        let plex_type = match library.library_type {
            LibraryType::Movie => Some(TYPE_MOVIE),
            LibraryType::Show => Some(TYPE_EPISODE),
            LibraryType::Artist => Some(TYPE_TRACK),
            LibraryType::Photo => Some(TYPE_PHOTO),
            LibraryType::Other(_) => None,
        };
        let listing = self.list(library, plex_type).await?;

        Ok(LibraryUsage {
            section: library.clone(),
            items_count: listing.len() as u64,
            total_size: listing.iter().filter_map(first_part_size).sum(),
        })
    }
}

fn first_part_size(meta: &PlexMetadata) -> Option<u64> {
    meta.media.first()?.part.first()?.size
}

fn to_media_item(meta: PlexMetadata, web_url: Option<String>) -> MediaItem {
    let is_episode = meta.type_.as_deref() == Some("episode");
    let media = meta.media.first();
    let part = media.and_then(|m| m.part.first());

    let resolution = media
        .and_then(|m| {
            m.video_resolution
                .as_deref()
                .map(Resolution::from_plex_label)
                .filter(|r| *r != Resolution::Unknown)
                .or_else(|| m.height.map(Resolution::from_height))
        })
        .unwrap_or(Resolution::Unknown);

    let codec = |value: Option<&String>| {
        value
            .filter(|c| !c.is_empty())
            .map(|c| c.to_uppercase())
            .unwrap_or_else(|| "Unknown".to_string())
    };

    let subtitle_streams = meta
        .media
        .iter()
        .flat_map(|m| m.part.iter())
        .flat_map(|p| p.stream.iter())
        .filter(|s| s.stream_type == Some(STREAM_TYPE_SUBTITLE))
        .map(|s| SubtitleStream {
            language_code: normalize_language_code(s.language_code.as_deref()),
            language: s.language.clone().unwrap_or_else(|| "Unknown".to_string()),
            format: s
                .codec
                .clone()
                .or_else(|| s.format.clone())
                .unwrap_or_else(|| "srt".to_string()),
            title: s.title.clone().filter(|t| !t.is_empty()),
            forced: s.forced,
            external: s.key.is_some(),
        })
        .collect();

    let (title, show_title) = match (is_episode, &meta.grandparent_title) {
        (true, Some(show)) => (
            episode_title(
                show,
                meta.parent_index.unwrap_or(0),
                meta.index.unwrap_or(0),
                &meta.title,
            ),
            Some(show.clone()),
        ),
        _ => (meta.title.clone(), None),
    };

    MediaItem {
        kind: if is_episode { MediaKind::Episode } else { MediaKind::Movie },
        title,
        show_title,
        season_number: meta.parent_index.filter(|_| is_episode),
        episode_number: meta.index.filter(|_| is_episode),
        file_path: part.and_then(|p| p.file.as_ref()).map(PathBuf::from),
        size_bytes: part.and_then(|p| p.size).unwrap_or(0),
        resolution,
        video_codec: codec(media.and_then(|m| m.video_codec.as_ref())),
        audio_codec: codec(media.and_then(|m| m.audio_codec.as_ref())),
        view_count: meta.view_count.unwrap_or(0),
        last_viewed_at: meta.last_viewed_at.and_then(|ts| DateTime::from_timestamp(ts, 0)),
        summary: meta.summary,
        year: meta.year,
        originally_available_at: meta
            .originally_available_at
            .as_deref()
            .and_then(|d| NaiveDate::parse_from_str(d, "%Y-%m-%d").ok()),
        genres: meta.genre.into_iter().map(|g| g.tag).collect(),
        content_rating: meta.content_rating.filter(|r| !r.is_empty()),
        duration_ms: meta.duration,
        web_url,
        subtitle_streams,
        rating_key: meta.rating_key,
    }
}

/// Plex sends flags as `true`, `1` or `"1"` depending on the endpoint.
fn flexible_bool<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> std::result::Result<bool, D::Error> {
    Ok(match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::Bool(b) => b,
        serde_json::Value::Number(n) => n.as_i64().unwrap_or(0) != 0,
        serde_json::Value::String(s) => s == "1" || s.eq_ignore_ascii_case("true"),
        _ => false,
    })
}

// Plex API response types

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct PlexResponse<T> {
    media_container: T,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PlexIdentity {
    #[serde(default)]
    friendly_name: String,
    version: Option<String>,
    platform: Option<String>,
    platform_version: Option<String>,
    machine_identifier: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PlexDirectoryContainer {
    #[serde(rename = "Directory", default)]
    directory: Vec<PlexDirectory>,
}

#[derive(Debug, Deserialize)]
struct PlexDirectory {
    key: String,
    title: String,
    #[serde(rename = "type")]
    type_: String,
}

#[derive(Debug, Deserialize)]
struct PlexMetadataContainer {
    #[serde(rename = "Metadata", default)]
    metadata: Vec<PlexMetadata>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PlexMetadata {
    rating_key: String,
    title: String,
    #[serde(rename = "type")]
    type_: Option<String>,
    grandparent_title: Option<String>,
    parent_index: Option<u32>,
    index: Option<u32>,
    summary: Option<String>,
    year: Option<i32>,
    originally_available_at: Option<String>,
    content_rating: Option<String>,
    duration: Option<u64>,
    view_count: Option<u32>,
    last_viewed_at: Option<i64>,
    #[serde(rename = "Genre", default)]
    genre: Vec<PlexTag>,
    #[serde(rename = "Media", default)]
    media: Vec<PlexMedia>,
}

#[derive(Debug, Deserialize)]
struct PlexTag {
    tag: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PlexMedia {
    height: Option<u32>,
    video_resolution: Option<String>,
    video_codec: Option<String>,
    audio_codec: Option<String>,
    #[serde(rename = "Part", default)]
    part: Vec<PlexPart>,
}

#[derive(Debug, Deserialize)]
struct PlexPart {
    file: Option<String>,
    size: Option<u64>,
    #[serde(rename = "Stream", default)]
    stream: Vec<PlexStream>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PlexStream {
    stream_type: Option<u32>,
    language_code: Option<String>,
    language: Option<String>,
    codec: Option<String>,
    format: Option<String>,
    title: Option<String>,
    #[serde(default, deserialize_with = "flexible_bool")]
    forced: bool,
    /// Only sidecar subtitle files have a download key.
    key: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPISODE_DETAILS: &str = r#"{
        "MediaContainer": {
            "size": 1,
            "Metadata": [{
                "ratingKey": "4211",
                "type": "episode",
                "title": "Pilot",
                "grandparentTitle": "Breaking Bad",
                "parentIndex": 1,
                "index": 1,
                "summary": "A high school chemistry teacher turns to crime.",
                "year": 2008,
                "originallyAvailableAt": "2008-01-20",
                "contentRating": "TV-MA",
                "duration": 3480000,
                "viewCount": 2,
                "lastViewedAt": 1700000000,
                "Genre": [{"tag": "Drama"}, {"tag": "Crime"}],
                "Media": [{
                    "height": 1080,
                    "videoResolution": "1080",
                    "videoCodec": "hevc",
                    "audioCodec": "eac3",
                    "Part": [{
                        "file": "/data/tv/Breaking Bad/Season 01/S01E01.mkv",
                        "size": 2147483648,
                        "Stream": [
                            {"streamType": 1, "codec": "hevc"},
                            {"streamType": 3, "languageCode": "eng", "language": "English", "codec": "srt", "key": "/library/streams/99"},
                            {"streamType": 3, "languageCode": "spa", "language": "Español", "codec": "pgs", "forced": 1, "title": "Forced"}
                        ]
                    }]
                }]
            }]
        }
    }"#;

    #[test]
    fn test_episode_conversion() {
        let response: PlexResponse<PlexMetadataContainer> =
            serde_json::from_str(EPISODE_DETAILS).unwrap();
        let meta = response.media_container.metadata.into_iter().next().unwrap();
        let item = to_media_item(meta, Some("http://plex/web".to_string()));

        assert_eq!(item.kind, MediaKind::Episode);
        assert_eq!(item.title, "Breaking Bad - S01E01 - Pilot");
        assert_eq!(item.base_title(), "Breaking Bad");
        assert_eq!(item.resolution, Resolution::Hd1080);
        assert_eq!(item.video_codec, "HEVC");
        assert_eq!(item.audio_codec, "EAC3");
        assert_eq!(item.size_bytes, 2_147_483_648);
        assert_eq!(item.view_count, 2);
        assert!(item.last_viewed_at.is_some());
        assert_eq!(item.genres, vec!["Drama", "Crime"]);
        assert_eq!(
            item.file_path,
            Some(PathBuf::from("/data/tv/Breaking Bad/Season 01/S01E01.mkv"))
        );

        assert_eq!(item.subtitle_streams.len(), 2);
        let english = &item.subtitle_streams[0];
        assert_eq!(english.language_code, "en");
        assert!(english.external);
        assert!(!english.forced);
        let spanish = &item.subtitle_streams[1];
        assert_eq!(spanish.language_code, "es");
        assert_eq!(spanish.format, "pgs");
        assert!(spanish.forced);
        assert!(!spanish.external);
    }

    #[test]
    fn test_movie_without_media() {
        let json = r#"{"MediaContainer": {"Metadata": [
            {"ratingKey": "7", "type": "movie", "title": "Bare"}
        ]}}"#;
        let response: PlexResponse<PlexMetadataContainer> = serde_json::from_str(json).unwrap();
        let meta = response.media_container.metadata.into_iter().next().unwrap();
        let item = to_media_item(meta, None);

        assert_eq!(item.kind, MediaKind::Movie);
        assert_eq!(item.resolution, Resolution::Unknown);
        assert_eq!(item.video_codec, "Unknown");
        assert_eq!(item.size_bytes, 0);
        assert!(item.file_path.is_none());
        assert!(!item.has_subtitles());
        assert_eq!(item.view_count, 0);
    }

    #[test]
    fn test_resolution_falls_back_to_height() {
        let json = r#"{"MediaContainer": {"Metadata": [{
            "ratingKey": "8", "type": "movie", "title": "Old",
            "Media": [{"height": 480, "Part": []}]
        }]}}"#;
        let response: PlexResponse<PlexMetadataContainer> = serde_json::from_str(json).unwrap();
        let meta = response.media_container.metadata.into_iter().next().unwrap();
        assert_eq!(to_media_item(meta, None).resolution, Resolution::Sd);
    }

    #[test]
    fn test_client_requires_token() {
        let config = Config::default();
        assert!(matches!(
            PlexClient::new(&config),
            Err(Error::MissingCredential("PLEX_TOKEN"))
        ));
    }
}
