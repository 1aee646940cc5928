pub mod host;
pub mod opensubtitles;
pub mod plex;

pub use host::LocalMachine;
pub use opensubtitles::OpenSubtitlesClient;
pub use plex::PlexClient;
