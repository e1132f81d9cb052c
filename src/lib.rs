//! # Freshet
//!
//! An RSS/Atom feed aggregator: feeds are registered through a small CLI and
//! a long-running daemon polls them on a schedule, deduplicates what it finds
//! and persists new articles.
//!
//! ## Architecture
//!
//! ```text
//! timer loop ──> job queue ──> worker pool ──> Ingestor
//!                                               │
//!                                 Fetcher ── Parser ── Store
//! ```
//!
//! - [`aggregator`]: the core — a timer-driven scheduler feeding an elastic
//!   pool of workers, reconfigurable while running
//! - [`control`]: Unix-socket control protocol (`set-interval`,
//!   `set-workers`) for live reconfiguration
//! - [`fetcher`]: HTTP client with ETag/conditional request support
//! - [`parser`]: RSS 2.0 parsing with an Atom fallback
//! - [`store`]: SQLite persistence layer
//!
//! ## Quick Start
//!
//! ```bash
//! # Register a feed
//! freshet add --name rust-blog --url https://blog.rust-lang.org/feed.xml
//!
//! # Run the aggregator in the foreground
//! freshet fetch
//!
//! # From another terminal, reconfigure it live
//! freshet set-interval 2m
//! freshet set-workers 5
//!
//! # Inspect what has been collected
//! freshet articles --feed-name rust-blog --num 5
//! ```

/// Application context and error handling.
///
/// [`AppContext`](app::AppContext) wires together the store and the fetcher
/// for the CLI entry points.
pub mod app;

/// The polling core: scheduler, elastic worker pool and ingestion pipeline.
pub mod aggregator;

/// Command-line interface using clap.
pub mod cli;

/// Environment-driven configuration (`FRESHET_INTERVAL`, `FRESHET_WORKERS`,
/// `FRESHET_DB`, `FRESHET_SOCKET`).
pub mod config;

/// Control protocol: one newline-terminated command per connection over a
/// Unix domain socket, plus the one-shot client used by the CLI.
pub mod control;

/// Core domain models.
///
/// - [`Feed`](domain::Feed): a named, URL-addressed syndication source
/// - [`Article`](domain::Article): one ingested item, deduplicated by
///   `(feed, link)`
pub mod domain;

/// Go-style duration literals (`20s`, `2m`, `1h30m`) used by the control
/// protocol and configuration.
pub mod duration;

/// HTTP fetching with conditional request support.
pub mod fetcher;

/// Feed payload parsing: RSS 2.0 first, Atom (and friends) as fallback.
pub mod parser;

/// SQLite persistence layer behind the [`Store`](store::Store) trait.
pub mod store;
