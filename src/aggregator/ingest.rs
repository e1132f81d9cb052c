use std::sync::Arc;

use chrono::Utc;
use tracing::debug;

use crate::app::{FreshetError, Result};
use crate::domain::{Feed, NewArticle};
use crate::fetcher::{FetchResult, Fetcher};
use crate::parser;
use crate::store::Store;

/// Processes one feed end-to-end: fetch, parse, dedup, persist.
pub struct Ingestor<S> {
    fetcher: Arc<dyn Fetcher + Send + Sync>,
    store: Arc<S>,
}

impl<S: Store> Ingestor<S> {
    pub fn new(fetcher: Arc<dyn Fetcher + Send + Sync>, store: Arc<S>) -> Self {
        Self { fetcher, store }
    }

    /// Ingest one feed, returning the number of newly stored articles.
    ///
    /// The feed's update timestamp only advances when every step succeeds,
    /// so a failed feed is retried on its next scheduled pass.
    pub async fn ingest(&self, feed: &Feed) -> Result<usize> {
        let fetched = self
            .fetcher
            .fetch(&feed.url, feed.etag.as_deref(), feed.last_modified.as_deref())
            .await
            .map_err(|e| fetch_or_parse(feed, e))?;

        let (body, etag, last_modified) = match fetched {
            FetchResult::NotModified => {
                debug!(url = %feed.url, "feed not modified");
                self.store
                    .mark_feed_updated(feed.id, Utc::now(), None, None)?;
                return Ok(0);
            }
            FetchResult::Content {
                body,
                etag,
                last_modified,
            } => (body, etag, last_modified),
        };

        let items = parser::parse(&body).map_err(|e| fetch_or_parse(feed, e))?;

        let mut inserted = 0;
        for item in items {
            if self.store.article_exists(feed.id, &item.link)? {
                continue;
            }
            self.store.insert_article(&NewArticle {
                feed_id: feed.id,
                title: item.title,
                link: item.link,
                description: item.description,
                published_at: item.published_at,
            })?;
            inserted += 1;
        }

        self.store.mark_feed_updated(
            feed.id,
            Utc::now(),
            etag.as_deref(),
            last_modified.as_deref(),
        )?;

        debug!(url = %feed.url, inserted, "feed ingested");
        Ok(inserted)
    }
}

fn fetch_or_parse(feed: &Feed, cause: FreshetError) -> FreshetError {
    FreshetError::FetchOrParse {
        url: feed.url.clone(),
        cause: cause.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::SqliteStore;
    use async_trait::async_trait;

    const RSS_BODY: &str = r#"<?xml version="1.0"?>
<rss version="2.0">
  <channel>
    <title>Test</title>
    <item>
      <title>One</title>
      <link>https://example.com/1</link>
      <pubDate>Mon, 01 Jan 2024 00:00:00 +0000</pubDate>
      <description>first</description>
    </item>
    <item>
      <title>Two</title>
      <link>https://example.com/2</link>
      <pubDate>Tue, 02 Jan 2024 00:00:00 +0000</pubDate>
      <description>second</description>
    </item>
  </channel>
</rss>"#;

    const ATOM_BODY: &str = r#"<?xml version="1.0"?>
<feed xmlns="http://www.w3.org/2005/Atom">
  <title>Atom</title>
  <id>urn:feed</id>
  <updated>2024-01-05T00:00:00Z</updated>
  <entry>
    <title>Entry</title>
    <id>urn:1</id>
    <link rel="alternate" href="https://example.com/atom1"/>
    <updated>2024-01-04T00:00:00Z</updated>
    <summary>summary</summary>
  </entry>
</feed>"#;

    struct StaticFetcher(&'static str);

    #[async_trait]
    impl Fetcher for StaticFetcher {
        async fn fetch(
            &self,
            _url: &str,
            _etag: Option<&str>,
            _last_modified: Option<&str>,
        ) -> Result<FetchResult> {
            Ok(FetchResult::Content {
                body: self.0.as_bytes().to_vec(),
                etag: Some("\"v1\"".into()),
                last_modified: None,
            })
        }
    }

    struct NotModifiedFetcher;

    #[async_trait]
    impl Fetcher for NotModifiedFetcher {
        async fn fetch(
            &self,
            _url: &str,
            _etag: Option<&str>,
            _last_modified: Option<&str>,
        ) -> Result<FetchResult> {
            Ok(FetchResult::NotModified)
        }
    }

    struct FailingFetcher;

    #[async_trait]
    impl Fetcher for FailingFetcher {
        async fn fetch(
            &self,
            _url: &str,
            _etag: Option<&str>,
            _last_modified: Option<&str>,
        ) -> Result<FetchResult> {
            Err(FreshetError::Io(std::io::Error::other(
                "connection refused",
            )))
        }
    }

    fn setup(fetcher: impl Fetcher + Send + Sync + 'static) -> (Arc<SqliteStore>, Ingestor<SqliteStore>, Feed) {
        let store = Arc::new(SqliteStore::in_memory().unwrap());
        let feed = store.add_feed("test", "https://example.com/feed.xml").unwrap();
        let ingestor = Ingestor::new(Arc::new(fetcher), store.clone());
        (store, ingestor, feed)
    }

    #[tokio::test]
    async fn ingest_stores_new_articles_once() {
        let (store, ingestor, feed) = setup(StaticFetcher(RSS_BODY));

        assert_eq!(ingestor.ingest(&feed).await.unwrap(), 2);
        // Second pass over the identical payload inserts nothing.
        assert_eq!(ingestor.ingest(&feed).await.unwrap(), 0);

        let articles = store.articles_by_feed("test", 10).unwrap();
        assert_eq!(articles.len(), 2);
    }

    #[tokio::test]
    async fn ingest_advances_update_timestamp_and_validators() {
        let (store, ingestor, feed) = setup(StaticFetcher(RSS_BODY));
        assert!(feed.updated_at.is_none());

        ingestor.ingest(&feed).await.unwrap();

        let feeds = store.list_feeds(None).unwrap();
        assert!(feeds[0].updated_at.is_some());
        assert_eq!(feeds[0].etag.as_deref(), Some("\"v1\""));
    }

    #[tokio::test]
    async fn not_modified_counts_as_success() {
        let (store, ingestor, feed) = setup(NotModifiedFetcher);

        assert_eq!(ingestor.ingest(&feed).await.unwrap(), 0);

        let feeds = store.list_feeds(None).unwrap();
        assert!(feeds[0].updated_at.is_some());
    }

    #[tokio::test]
    async fn fallback_payload_is_ingested() {
        let (store, ingestor, feed) = setup(StaticFetcher(ATOM_BODY));

        assert_eq!(ingestor.ingest(&feed).await.unwrap(), 1);

        let articles = store.articles_by_feed("test", 10).unwrap();
        assert_eq!(articles[0].link, "https://example.com/atom1");
        assert_eq!(articles[0].description, "summary");
    }

    #[tokio::test]
    async fn fetch_failure_names_the_feed() {
        let (store, ingestor, feed) = setup(FailingFetcher);

        let err = ingestor.ingest(&feed).await.unwrap_err();
        assert!(
            matches!(&err, FreshetError::FetchOrParse { url, .. } if url == "https://example.com/feed.xml")
        );

        // No success: the feed stays first in polling priority.
        let feeds = store.list_feeds(None).unwrap();
        assert!(feeds[0].updated_at.is_none());
    }

    #[tokio::test]
    async fn unparseable_payload_leaves_no_partial_state() {
        let (store, ingestor, feed) = setup(StaticFetcher("not a feed at all"));

        let err = ingestor.ingest(&feed).await.unwrap_err();
        assert!(matches!(err, FreshetError::FetchOrParse { .. }));
        assert!(store.articles_by_feed("test", 10).unwrap().is_empty());
        assert!(store.list_feeds(None).unwrap()[0].updated_at.is_none());
    }
}
