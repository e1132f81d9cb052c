use chrono::{DateTime, Utc};

/// A named, URL-addressed syndication source.
#[derive(Debug, Clone, PartialEq)]
pub struct Feed {
    pub id: i64,
    /// Unique among feeds.
    pub name: String,
    pub url: String,
    /// Cache validators from the last successful fetch.
    pub etag: Option<String>,
    pub last_modified: Option<String>,
    pub created_at: DateTime<Utc>,
    /// Time of the last fully successful ingestion; `None` until the feed
    /// has been ingested once. Drives polling priority.
    pub updated_at: Option<DateTime<Utc>>,
}
