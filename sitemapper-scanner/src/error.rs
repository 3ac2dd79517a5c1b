use thiserror::Error;

#[derive(Error, Debug)]
pub enum ScanError {
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Task join error: {0}")]
    JoinError(#[from] tokio::task::JoinError),
}

/// Errors returned when a crawl session cannot be created.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Missing URL host: {0}")]
    MissingHost(String),

    #[error("Invalid configuration: {0}")]
    Config(String),
}

/// Reasons a discovered link is not admitted into the crawl.
///
/// These are routine filtering outcomes and never reach the caller of a crawl.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AdmitError {
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Not on the same site: {0}")]
    NotSameSite(String),

    #[error("URL already added: {0}")]
    AlreadyAdded(String),

    #[error("Deeper than the session's max level: {0}")]
    TooDeep(String),

    #[error("Session no longer accepts links: {0}")]
    Closed(String),
}

pub type Result<T> = std::result::Result<T, ScanError>;
