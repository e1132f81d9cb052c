//! Feed payload parsing.
//!
//! Payloads are tried as RSS 2.0 first. When the document is not RSS, or an
//! RSS parse produces no items, the raw bytes are handed to [`feed_rs`],
//! which covers Atom and the long tail of dialects. The two paths resolve
//! links, descriptions and publication times differently; see [`parse`].

use chrono::{DateTime, Utc};
use html_escape::decode_html_entities;
use tracing::warn;

use crate::app::{FreshetError, Result};

/// A normalized feed entry, ready for deduplication and storage.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedItem {
    pub title: String,
    pub link: String,
    pub description: String,
    pub published_at: DateTime<Utc>,
}

/// Parse a feed payload, preferring RSS 2.0 and falling back to Atom.
///
/// RSS items carry their link as given and their `pubDate` as RFC 1123;
/// an item with a missing or unparseable date is skipped with a warning.
/// Fallback entries prefer the `rel="alternate"` link (then any link with a
/// non-empty target), the summary over the full content body, and
/// `published` over `updated` over the current time.
pub fn parse(body: &[u8]) -> Result<Vec<ParsedItem>> {
    match rss::Channel::read_from(body) {
        Ok(channel) if !channel.items().is_empty() => Ok(from_rss(&channel)),
        _ => from_fallback(body),
    }
}

fn from_rss(channel: &rss::Channel) -> Vec<ParsedItem> {
    let mut items = Vec::new();
    for item in channel.items() {
        let published_at = match item
            .pub_date()
            .and_then(|d| DateTime::parse_from_rfc2822(d).ok())
        {
            Some(dt) => dt.with_timezone(&Utc),
            None => {
                warn!(
                    date = item.pub_date().unwrap_or(""),
                    "skipping item with missing or invalid publication date"
                );
                continue;
            }
        };

        items.push(ParsedItem {
            title: decode(item.title().unwrap_or_default()),
            link: item.link().unwrap_or_default().to_string(),
            description: decode(item.description().unwrap_or_default()),
            published_at,
        });
    }
    items
}

fn from_fallback(body: &[u8]) -> Result<Vec<ParsedItem>> {
    let feed = feed_rs::parser::parse(body).map_err(|e| FreshetError::FeedParse(e.to_string()))?;

    let items = feed
        .entries
        .into_iter()
        .map(|entry| {
            let link = entry
                .links
                .iter()
                .find(|l| l.rel.as_deref() == Some("alternate") && !l.href.is_empty())
                .or_else(|| entry.links.iter().find(|l| !l.href.is_empty()))
                .map(|l| l.href.clone())
                .unwrap_or_default();

            let description = entry
                .summary
                .map(|s| s.content)
                .filter(|s| !s.is_empty())
                .or_else(|| entry.content.and_then(|c| c.body))
                .unwrap_or_default();

            ParsedItem {
                title: decode(&entry.title.map(|t| t.content).unwrap_or_default()),
                link,
                description: decode(&description),
                published_at: entry.published.or(entry.updated).unwrap_or_else(Utc::now),
            }
        })
        .collect();

    Ok(items)
}

fn decode(s: &str) -> String {
    decode_html_entities(s).to_string()
}
