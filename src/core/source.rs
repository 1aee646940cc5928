use crate::core::{
    LibrarySection, LibraryUsage, MediaItem, MediaKind, ServerInfo, SubtitleCandidate,
    SubtitleFile,
};
use crate::error::{Error, Result};
use async_trait::async_trait;

/// Read access to a media server's libraries.
#[async_trait]
pub trait MetadataSource: Send + Sync {
    async fn server_info(&self) -> Result<ServerInfo>;

    async fn libraries(&self) -> Result<Vec<LibrarySection>>;

    /// Every playable item of a library, with subtitle streams resolved.
    /// Show libraries are flattened to episodes.
    async fn items(
        &self,
        library: &LibrarySection,
        kind: Option<MediaKind>,
    ) -> Result<Vec<MediaItem>>;

    async fn library_usage(&self, library: &LibrarySection) -> Result<LibraryUsage>;

    async fn library(&self, name: &str) -> Result<LibrarySection> {
        let libraries = self.libraries().await?;
        match libraries.iter().find(|l| l.title == name) {
            Some(library) => Ok(library.clone()),
            None => Err(Error::LibraryNotFound {
                name: name.to_string(),
                available: libraries.into_iter().map(|l| l.title).collect(),
            }),
        }
    }
}

/// Subtitle search and download provider.
#[async_trait]
pub trait SubtitleSource: Send + Sync {
    fn name(&self) -> &'static str;

    async fn search(&self, item: &MediaItem, language: &str) -> Result<Vec<SubtitleCandidate>>;

    async fn download(&self, candidate: &SubtitleCandidate) -> Result<SubtitleFile>;
}
