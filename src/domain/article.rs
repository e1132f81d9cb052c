use chrono::{DateTime, Utc};

/// One ingested item belonging to a feed, deduplicated by `(feed_id, link)`.
#[derive(Debug, Clone, PartialEq)]
pub struct Article {
    pub id: i64,
    pub feed_id: i64,
    pub title: String,
    pub link: String,
    pub description: String,
    pub published_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// A not-yet-persisted article produced by the ingestion pipeline.
#[derive(Debug, Clone)]
pub struct NewArticle {
    pub feed_id: i64,
    pub title: String,
    pub link: String,
    pub description: String,
    pub published_at: DateTime<Utc>,
}
