pub mod sqlite;

use chrono::{DateTime, Utc};

use crate::app::Result;
use crate::domain::{Article, Feed, NewArticle};

pub use sqlite::SqliteStore;

/// Persistence boundary for feeds and articles.
pub trait Store {
    // Feed operations
    /// Create a feed. Fails with `DuplicateFeed` when the name is taken.
    fn add_feed(&self, name: &str, url: &str) -> Result<Feed>;
    /// Delete a feed by name, cascading to its articles.
    fn delete_feed(&self, name: &str) -> Result<()>;
    /// Feeds ordered by creation time, newest first. `None` = unbounded.
    fn list_feeds(&self, limit: Option<usize>) -> Result<Vec<Feed>>;
    /// Up to `limit` feeds ordered by update time ascending, never-updated
    /// feeds first. This is the polling priority order.
    fn pick_outdated(&self, limit: usize) -> Result<Vec<Feed>>;
    /// Advance a feed's update timestamp, optionally refreshing its cache
    /// validators.
    fn mark_feed_updated(
        &self,
        feed_id: i64,
        at: DateTime<Utc>,
        etag: Option<&str>,
        last_modified: Option<&str>,
    ) -> Result<()>;

    // Article operations
    fn article_exists(&self, feed_id: i64, link: &str) -> Result<bool>;
    fn insert_article(&self, article: &NewArticle) -> Result<i64>;
    /// Latest articles of a feed, by publication time descending.
    fn articles_by_feed(&self, feed_name: &str, limit: usize) -> Result<Vec<Article>>;
}
