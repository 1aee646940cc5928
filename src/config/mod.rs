use crate::core::metadata::canonical_language;
use crate::error::{Error, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use tracing::debug;
use url::Url;

pub const DEFAULT_PLEX_URL: &str = "http://localhost:32400";
pub const DEFAULT_DASHBOARD_PORT: u16 = 9924;
pub const DEFAULT_CONFIG_FILE: &str = "plex-tools.toml";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub plex_url: String,
    pub plex_token: Option<String>,
    pub opensubtitles: OpenSubtitlesConfig,
    pub languages: Vec<String>,
    pub user_agent: String,
    /// Seconds before an HTTP request is abandoned.
    pub timeout: u64,
    pub dashboard_port: u16,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct OpenSubtitlesConfig {
    pub api_key: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
}

/// Borrowed OpenSubtitles credentials, all present.
#[derive(Debug, Clone, Copy)]
pub struct Credentials<'a> {
    pub api_key: &'a str,
    pub username: &'a str,
    pub password: &'a str,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            plex_url: DEFAULT_PLEX_URL.to_string(),
            plex_token: None,
            opensubtitles: OpenSubtitlesConfig::default(),
            languages: vec!["en".to_string()],
            user_agent: format!("plex-tools v{}", env!("CARGO_PKG_VERSION")),
            timeout: 30,
            dashboard_port: DEFAULT_DASHBOARD_PORT,
        }
    }
}

impl Config {
    /// Loads `.env`, then the TOML file (explicit path, `PLEX_TOOLS_CONFIG`,
    /// or `plex-tools.toml` if present), then environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        dotenvy::dotenv().ok();

        let path = path
            .map(Path::to_path_buf)
            .or_else(|| std::env::var("PLEX_TOOLS_CONFIG").ok().map(PathBuf::from))
            .or_else(|| {
                let default = PathBuf::from(DEFAULT_CONFIG_FILE);
                default.exists().then_some(default)
            });

        let mut config = match path {
            Some(path) => {
                debug!("Reading config file {}", path.display());
                Self::from_toml(&std::fs::read_to_string(&path)?)?
            }
            None => Self::default(),
        };

        config.apply_env(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_toml(contents: &str) -> Result<Self> {
        let mut config: Self = toml::from_str(contents)?;
        config.languages = parse_languages(&config.languages.join(","))?;
        Ok(config)
    }

    /// Overrides fields from an environment-like lookup. Empty values are ignored.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(url) = get("PLEX_URL") {
            self.plex_url = url;
        }
        if let Some(token) = get("PLEX_TOKEN") {
            self.plex_token = Some(token);
        }
        if let Some(key) = get("OPENSUBTITLES_API_KEY") {
            self.opensubtitles.api_key = Some(key);
        }
        if let Some(username) = get("OPENSUBTITLES_USERNAME") {
            self.opensubtitles.username = Some(username);
        }
        if let Some(password) = get("OPENSUBTITLES_PASSWORD") {
            self.opensubtitles.password = Some(password);
        }
        if let Some(languages) = get("SUBTITLE_LANGUAGES") {
            self.languages = parse_languages(&languages)?;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        Url::parse(&self.plex_url)
            .map_err(|e| Error::InvalidConfig(format!("PLEX_URL '{}': {}", self.plex_url, e)))?;

        if self.languages.is_empty() {
            return Err(Error::InvalidConfig(
                "at least one subtitle language is required".to_string(),
            ));
        }
        for language in &self.languages {
            check_language(language)?;
        }
        Ok(())
    }

    pub fn plex_token(&self) -> Result<&str> {
        self.plex_token
            .as_deref()
            .ok_or(Error::MissingCredential("PLEX_TOKEN"))
    }

    pub fn opensubtitles_credentials(&self) -> Result<Credentials<'_>> {
        let os = &self.opensubtitles;
        Ok(Credentials {
            api_key: os
                .api_key
                .as_deref()
                .ok_or(Error::MissingCredential("OPENSUBTITLES_API_KEY"))?,
            username: os
                .username
                .as_deref()
                .ok_or(Error::MissingCredential("OPENSUBTITLES_USERNAME"))?,
            password: os
                .password
                .as_deref()
                .ok_or(Error::MissingCredential("OPENSUBTITLES_PASSWORD"))?,
        })
    }
}

/// Parses a comma-separated language list such as `en, es,FR` into
/// canonical, de-duplicated codes (`eng` becomes `en`).
pub fn parse_languages(value: &str) -> Result<Vec<String>> {
    let mut languages: Vec<String> = Vec::new();
    for code in value.split(',').map(str::trim).filter(|c| !c.is_empty()) {
        let code = code.to_lowercase();
        check_language(&code)?;
        let code = canonical_language(&code);
        if !languages.contains(&code) {
            languages.push(code);
        }
    }
    Ok(languages)
}

fn check_language(code: &str) -> Result<()> {
    static LANGUAGE_CODE: OnceLock<Regex> = OnceLock::new();
    let re = LANGUAGE_CODE.get_or_init(|| Regex::new(r"^[a-z]{2,3}(-[a-z]{2})?$").unwrap());
    if re.is_match(code) {
        Ok(())
    } else {
        Err(Error::InvalidConfig(format!("invalid language code '{}'", code)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.plex_url, "http://localhost:32400");
        assert_eq!(config.dashboard_port, 9924);
        assert_eq!(config.languages, vec!["en"]);
        assert!(config.plex_token.is_none());
    }

    #[test]
    fn test_env_overrides_file() {
        let mut config = Config::from_toml(
            r#"
            plex_url = "http://nas.local:32400"
            plex_token = "from-file"
            languages = ["de"]

            [opensubtitles]
            api_key = "file-key"
            "#,
        )
        .unwrap();

        config
            .apply_env(lookup(&[
                ("PLEX_TOKEN", "from-env"),
                ("SUBTITLE_LANGUAGES", "en, ES"),
                ("OPENSUBTITLES_USERNAME", ""),
            ]))
            .unwrap();

        assert_eq!(config.plex_url, "http://nas.local:32400");
        assert_eq!(config.plex_token.as_deref(), Some("from-env"));
        assert_eq!(config.languages, vec!["en", "es"]);
        assert_eq!(config.opensubtitles.api_key.as_deref(), Some("file-key"));
        assert!(config.opensubtitles.username.is_none());
    }

    #[test]
    fn test_languages_are_canonical() {
        assert_eq!(parse_languages("ENG, en, POR-BR").unwrap(), vec!["en", "pt-br"]);

        let config = Config::from_toml(r#"languages = ["spa", "es", "fra"]"#).unwrap();
        assert_eq!(config.languages, vec!["es", "fr"]);
    }

    #[test]
    fn test_missing_credentials() {
        let config = Config::default();
        assert!(matches!(
            config.plex_token(),
            Err(Error::MissingCredential("PLEX_TOKEN"))
        ));

        let mut config = Config::default();
        config.opensubtitles.api_key = Some("key".to_string());
        config.opensubtitles.username = Some("user".to_string());
        assert!(matches!(
            config.opensubtitles_credentials(),
            Err(Error::MissingCredential("OPENSUBTITLES_PASSWORD"))
        ));
    }

    #[test]
    fn test_invalid_values_rejected() {
        assert!(parse_languages("en,english").is_err());
        assert_eq!(parse_languages("pt-br,,en").unwrap(), vec!["pt-br", "en"]);
        assert!(parse_languages(" , ").unwrap().is_empty());

        let mut config = Config::default();
        config.plex_url = "not a url".to_string();
        assert!(matches!(config.validate(), Err(Error::InvalidConfig(_))));
    }
}
