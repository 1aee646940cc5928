use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("{0} is required. Set it in .env, the config file or on the command line")]
    MissingCredential(&'static str),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("could not find library '{name}'. Available libraries: {}", available.join(", "))]
    LibraryNotFound { name: String, available: Vec<String> },

    #[error("{service} request failed with status {status}: {message}")]
    Api {
        service: &'static str,
        status: u16,
        message: String,
    },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("could not parse config file: {0}")]
    ConfigParse(#[from] toml::de::Error),
}
