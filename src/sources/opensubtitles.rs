//! OpenSubtitles.com REST API (v1) client.
//!
//! Searching only needs the API key. Downloads need the JWT returned by
//! `/login`, so [`OpenSubtitlesClient::connect`] logs in up front and a
//! missing credential fails at startup.

use crate::config::Config;
use crate::core::{MediaItem, MediaKind, SubtitleCandidate, SubtitleFile, SubtitleSource};
use crate::error::{Error, Result};
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, info};

pub const BASE_URL: &str = "https://api.opensubtitles.com/api/v1";

pub struct OpenSubtitlesClient {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    token: String,
}

#[derive(Debug, Deserialize)]
struct LoginResponse {
    token: String,
    base_url: Option<String>,
    user: Option<LoginUser>,
}

#[derive(Debug, Deserialize)]
struct LoginUser {
    allowed_downloads: Option<i64>,
    remaining_downloads: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    total_count: u64,
    #[serde(default)]
    data: Vec<SearchResult>,
}

#[derive(Debug, Deserialize)]
struct SearchResult {
    attributes: SubtitleAttributes,
}

#[derive(Debug, Deserialize)]
struct SubtitleAttributes {
    language: Option<String>,
    download_count: Option<u64>,
    ratings: Option<f64>,
    release: Option<String>,
    uploader: Option<Uploader>,
    #[serde(default)]
    files: Vec<RemoteFile>,
}

#[derive(Debug, Deserialize)]
struct Uploader {
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RemoteFile {
    file_id: u64,
    file_name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct DownloadResponse {
    link: String,
    file_name: Option<String>,
    remaining: Option<i64>,
}

impl OpenSubtitlesClient {
    /// Builds the client and logs in with the configured credentials.
    pub async fn connect(config: &Config) -> Result<Self> {
        let credentials = config.opensubtitles_credentials()?;
        let client = reqwest::Client::builder()
            .user_agent(&config.user_agent)
            .timeout(Duration::from_secs(config.timeout))
            .build()?;

        info!("Logging into OpenSubtitles as {}", credentials.username);
        let response = client
            .post(format!("{}/login", BASE_URL))
            .header("Api-Key", credentials.api_key)
            .json(&serde_json::json!({
                "username": credentials.username,
                "password": credentials.password,
            }))
            .send()
            .await?;
        let login: LoginResponse = read_json(response).await?;

        if let Some(user) = &login.user {
            info!(
                "OpenSubtitles login successful ({} of {} downloads remaining)",
                user.remaining_downloads.unwrap_or(0),
                user.allowed_downloads.unwrap_or(0)
            );
        }

        Ok(Self {
            client,
            api_key: credentials.api_key.to_string(),
            base_url: login
                .base_url
                .as_deref()
                .map(api_base_url)
                .unwrap_or_else(|| BASE_URL.to_string()),
            token: login.token,
        })
    }
}

#[async_trait]
impl SubtitleSource for OpenSubtitlesClient {
    fn name(&self) -> &'static str {
        "OpenSubtitles"
    }

    async fn search(&self, item: &MediaItem, language: &str) -> Result<Vec<SubtitleCandidate>> {
        let params = search_params(item, language);
        debug!("Searching OpenSubtitles: {:?}", params);

        let response = self
            .client
            .get(format!("{}/subtitles", self.base_url))
            .header("Api-Key", &self.api_key)
            .query(&params)
            .send()
            .await?;
        let search: SearchResponse = read_json(response).await?;
        debug!("OpenSubtitles search returned {} results", search.total_count);

        Ok(to_candidates(search, language))
    }

    async fn download(&self, candidate: &SubtitleCandidate) -> Result<SubtitleFile> {
        let response = self
            .client
            .post(format!("{}/download", self.base_url))
            .header("Api-Key", &self.api_key)
            .bearer_auth(&self.token)
            .json(&serde_json::json!({ "file_id": candidate.file_id }))
            .send()
            .await?;
        let link: DownloadResponse = read_json(response).await?;
        if let Some(remaining) = link.remaining {
            info!("OpenSubtitles downloads remaining today: {}", remaining);
        }

        let response = self.client.get(&link.link).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(Error::Api {
                service: "OpenSubtitles",
                status: status.as_u16(),
                message: "subtitle file download failed".to_string(),
            });
        }
        let content = response.bytes().await?.to_vec();

        Ok(SubtitleFile {
            file_name: link
                .file_name
                .or_else(|| candidate.file_name.clone())
                .unwrap_or_else(|| format!("{}.srt", candidate.file_id)),
            content,
        })
    }
}

async fn read_json<T: serde::de::DeserializeOwned>(response: reqwest::Response) -> Result<T> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(Error::Api {
            service: "OpenSubtitles",
            status: status.as_u16(),
            message: body,
        });
    }
    Ok(response.json().await?)
}

/// The login response names a host such as `vip-api.opensubtitles.com`.
fn api_base_url(host: &str) -> String {
    let host = host.trim_end_matches('/');
    let base = if host.starts_with("http://") || host.starts_with("https://") {
        host.to_string()
    } else {
        format!("https://{}", host)
    };
    if base.ends_with("/api/v1") {
        base
    } else {
        format!("{}/api/v1", base)
    }
}

fn search_params(item: &MediaItem, language: &str) -> Vec<(&'static str, String)> {
    let mut params = vec![("languages", language.to_string())];
    match item.kind {
        MediaKind::Episode => {
            params.push(("type", "episode".to_string()));
            params.push(("query", item.base_title().to_string()));
            if let Some(season) = item.season_number {
                params.push(("season_number", season.to_string()));
            }
            if let Some(episode) = item.episode_number {
                params.push(("episode_number", episode.to_string()));
            }
        }
        MediaKind::Movie => {
            params.push(("type", "movie".to_string()));
            params.push(("query", item.title.clone()));
            if let Some(year) = item.year {
                params.push(("year", year.to_string()));
            }
        }
    }
    params
}

/// Flattens search results into candidates; results without files are dropped.
fn to_candidates(response: SearchResponse, language: &str) -> Vec<SubtitleCandidate> {
    response
        .data
        .into_iter()
        .filter_map(|result| {
            let attrs = result.attributes;
            let file = attrs.files.into_iter().next()?;
            Some(SubtitleCandidate {
                language: attrs.language.unwrap_or_else(|| language.to_string()),
                rating: attrs.ratings.unwrap_or(0.0),
                download_count: attrs.download_count.unwrap_or(0),
                release: attrs.release,
                uploader: attrs.uploader.and_then(|u| u.name),
                file_id: file.file_id,
                file_name: file.file_name,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::aggregator::tests::item;
    use crate::core::Resolution;

    #[test]
    fn test_to_candidates() {
        let json = r#"{
            "total_pages": 1,
            "total_count": 3,
            "page": 1,
            "data": [
                {"id": "1", "type": "subtitle", "attributes": {
                    "language": "en", "download_count": 5012, "ratings": 8.5,
                    "release": "Alien.1979.1080p.BluRay", "uploader": {"name": "subber"},
                    "files": [{"file_id": 101, "file_name": "Alien.1979.1080p.BluRay.srt"}]
                }},
                {"id": "2", "type": "subtitle", "attributes": {
                    "language": "en", "download_count": 12, "files": []
                }},
                {"id": "3", "type": "subtitle", "attributes": {
                    "files": [{"file_id": 303}]
                }}
            ]
        }"#;
        let response: SearchResponse = serde_json::from_str(json).unwrap();
        let candidates = to_candidates(response, "en");

        assert_eq!(candidates.len(), 2);
        assert_eq!(candidates[0].file_id, 101);
        assert_eq!(candidates[0].rating, 8.5);
        assert_eq!(candidates[0].uploader.as_deref(), Some("subber"));
        assert_eq!(candidates[1].file_id, 303);
        assert_eq!(candidates[1].rating, 0.0);
        assert_eq!(candidates[1].language, "en");
    }

    #[test]
    fn test_search_params() {
        let movie = item("1", Resolution::Hd1080, "H264");
        let params = search_params(&movie, "es");
        assert!(params.contains(&("languages", "es".to_string())));
        assert!(params.contains(&("type", "movie".to_string())));
        assert!(params.contains(&("query", "Movie 1".to_string())));
        assert!(params.contains(&("year", "2020".to_string())));

        let mut episode = item("2", Resolution::Hd720, "H264");
        episode.kind = MediaKind::Episode;
        episode.title = "Lost - S02E03 - Orientation".to_string();
        episode.show_title = Some("Lost".to_string());
        episode.season_number = Some(2);
        episode.episode_number = Some(3);
        let params = search_params(&episode, "en");
        assert!(params.contains(&("query", "Lost".to_string())));
        assert!(params.contains(&("season_number", "2".to_string())));
        assert!(params.contains(&("episode_number", "3".to_string())));
    }

    #[test]
    fn test_api_base_url() {
        assert_eq!(
            api_base_url("vip-api.opensubtitles.com"),
            "https://vip-api.opensubtitles.com/api/v1"
        );
        assert_eq!(api_base_url(BASE_URL), BASE_URL);
    }

    #[test]
    fn test_connect_requires_credentials() {
        let config = Config::default();
        let result = tokio_test::block_on(OpenSubtitlesClient::connect(&config));
        assert!(matches!(
            result,
            Err(Error::MissingCredential("OPENSUBTITLES_API_KEY"))
        ));
    }
}
