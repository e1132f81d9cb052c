use thiserror::Error;

#[derive(Error, Debug)]
pub enum FreshetError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Feed parsing error: {0}")]
    FeedParse(String),

    #[error("Error fetching and parsing feed {url}: {cause}")]
    FetchOrParse { url: String, cause: String },

    #[error("Duplicate feed name: {0}")]
    DuplicateFeed(String),

    #[error("Feed not found: {0}")]
    FeedNotFound(String),

    #[error("Aggregator already started")]
    AlreadyStarted,

    #[error("Aggregator not started")]
    NotStarted,

    #[error("Number of workers must be positive")]
    InvalidWorkerCount,

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, FreshetError>;
