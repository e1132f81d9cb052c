use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};
use rusqlite_migration::{Migrations, M};

use crate::app::{FreshetError, Result};
use crate::domain::{Article, Feed, NewArticle};
use crate::store::Store;

pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        let conn = Connection::open(path)?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.run_migrations()?;
        Ok(store)
    }

    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.run_migrations()?;
        Ok(store)
    }

    fn run_migrations(&self) -> Result<()> {
        let migrations = Migrations::new(vec![M::up(include_str!(
            "../../migrations/001-initial/up.sql"
        ))]);

        let mut conn = self.conn()?;
        conn.execute("PRAGMA foreign_keys = ON", [])?;
        migrations
            .to_latest(&mut conn)
            .map_err(|_| FreshetError::Database(rusqlite::Error::InvalidQuery))?;

        Ok(())
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|e| {
            FreshetError::Database(rusqlite::Error::SqliteFailure(
                rusqlite::ffi::Error::new(1),
                Some(e.to_string()),
            ))
        })
    }
}

fn parse_datetime(s: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .ok()
        .or_else(|| s.parse::<DateTime<Utc>>().ok())
}

fn feed_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Feed> {
    Ok(Feed {
        id: row.get(0)?,
        name: row.get(1)?,
        url: row.get(2)?,
        etag: row.get(3)?,
        last_modified: row.get(4)?,
        created_at: row
            .get::<_, String>(5)
            .ok()
            .and_then(|s| parse_datetime(&s))
            .unwrap_or_else(Utc::now),
        updated_at: row
            .get::<_, Option<String>>(6)?
            .and_then(|s| parse_datetime(&s)),
    })
}

fn article_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Article> {
    Ok(Article {
        id: row.get(0)?,
        feed_id: row.get(1)?,
        title: row.get(2)?,
        link: row.get(3)?,
        description: row.get(4)?,
        published_at: row
            .get::<_, String>(5)
            .ok()
            .and_then(|s| parse_datetime(&s))
            .unwrap_or_else(Utc::now),
        created_at: row
            .get::<_, String>(6)
            .ok()
            .and_then(|s| parse_datetime(&s))
            .unwrap_or_else(Utc::now),
        updated_at: row
            .get::<_, Option<String>>(7)?
            .and_then(|s| parse_datetime(&s)),
    })
}

const FEED_COLUMNS: &str = "id, name, url, etag, last_modified, created_at, updated_at";

impl Store for SqliteStore {
    fn add_feed(&self, name: &str, url: &str) -> Result<Feed> {
        let conn = self.conn()?;
        let created_at = Utc::now();

        let inserted = conn.execute(
            "INSERT INTO feeds (name, url, created_at) VALUES (?1, ?2, ?3)",
            params![name, url, created_at.to_rfc3339()],
        );
        match inserted {
            Ok(_) => Ok(Feed {
                id: conn.last_insert_rowid(),
                name: name.to_string(),
                url: url.to_string(),
                etag: None,
                last_modified: None,
                created_at,
                updated_at: None,
            }),
            Err(rusqlite::Error::SqliteFailure(e, _))
                if e.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                Err(FreshetError::DuplicateFeed(name.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    fn delete_feed(&self, name: &str) -> Result<()> {
        let conn = self.conn()?;
        let deleted = conn.execute("DELETE FROM feeds WHERE name = ?1", params![name])?;
        if deleted == 0 {
            return Err(FreshetError::FeedNotFound(name.to_string()));
        }
        Ok(())
    }

    fn list_feeds(&self, limit: Option<usize>) -> Result<Vec<Feed>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {FEED_COLUMNS} FROM feeds ORDER BY created_at DESC, id DESC LIMIT ?1"
        ))?;

        // SQLite treats a negative LIMIT as unbounded.
        let limit = limit.map(|n| n as i64).unwrap_or(-1);
        let feeds = stmt
            .query_map(params![limit], feed_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(feeds)
    }

    fn pick_outdated(&self, limit: usize) -> Result<Vec<Feed>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {FEED_COLUMNS} FROM feeds
             ORDER BY updated_at ASC NULLS FIRST, id ASC LIMIT ?1"
        ))?;

        let feeds = stmt
            .query_map(params![limit as i64], feed_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(feeds)
    }

    fn mark_feed_updated(
        &self,
        feed_id: i64,
        at: DateTime<Utc>,
        etag: Option<&str>,
        last_modified: Option<&str>,
    ) -> Result<()> {
        let conn = self.conn()?;
        conn.execute(
            "UPDATE feeds SET updated_at = ?1,
                 etag = COALESCE(?2, etag),
                 last_modified = COALESCE(?3, last_modified)
             WHERE id = ?4",
            params![at.to_rfc3339(), etag, last_modified, feed_id],
        )?;
        Ok(())
    }

    fn article_exists(&self, feed_id: i64, link: &str) -> Result<bool> {
        let conn = self.conn()?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM articles WHERE feed_id = ?1 AND link = ?2",
            params![feed_id, link],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    fn insert_article(&self, article: &NewArticle) -> Result<i64> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO articles (feed_id, title, link, description, published_at, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                article.feed_id,
                article.title,
                article.link,
                article.description,
                article.published_at.to_rfc3339(),
                Utc::now().to_rfc3339()
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    fn articles_by_feed(&self, feed_name: &str, limit: usize) -> Result<Vec<Article>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT a.id, a.feed_id, a.title, a.link, a.description,
                    a.published_at, a.created_at, a.updated_at
             FROM articles a
             JOIN feeds f ON a.feed_id = f.id
             WHERE f.name = ?1
             ORDER BY a.published_at DESC
             LIMIT ?2",
        )?;

        let articles = stmt
            .query_map(params![feed_name, limit as i64], article_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(articles)
    }
}
