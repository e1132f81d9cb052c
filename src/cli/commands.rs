use std::sync::Arc;

use chrono::{SecondsFormat, Utc};
use tokio::signal::unix::{signal, SignalKind};
use tokio::sync::watch;
use url::Url;

use crate::aggregator::Aggregator;
use crate::app::{AppContext, Result};
use crate::control::{client, server::ControlServer};
use crate::duration::{format_duration, parse_duration};
use crate::store::Store;

/// Timestamp prefix used for all user-facing output.
fn timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true)
}

pub fn add_feed(ctx: &AppContext, name: &str, url: &str) {
    if let Err(e) = Url::parse(url) {
        println!("[{}] Invalid URL {url}: {e}", timestamp());
        return;
    }
    match ctx.store.add_feed(name, url) {
        Ok(_) => println!("[{}] Feed added successfully", timestamp()),
        Err(e) => println!("[{}] Error adding feed: {e}", timestamp()),
    }
}

pub fn list_feeds(ctx: &AppContext, num: Option<usize>) {
    let feeds = match ctx.store.list_feeds(num.filter(|&n| n > 0)) {
        Ok(feeds) => feeds,
        Err(e) => {
            println!("[{}] Error listing feeds: {e}", timestamp());
            return;
        }
    };

    println!("[{}] # Available RSS Feeds", timestamp());
    for (i, feed) in feeds.iter().enumerate() {
        println!(
            "{}. Name: {}\n   URL: {}\n   Added: {}",
            i + 1,
            feed.name,
            feed.url,
            feed.created_at.format("%Y-%m-%d %H:%M")
        );
    }
}

pub fn delete_feed(ctx: &AppContext, name: &str) {
    match ctx.store.delete_feed(name) {
        Ok(()) => println!("[{}] Feed deleted successfully", timestamp()),
        Err(e) => println!("[{}] Error deleting feed: {e}", timestamp()),
    }
}

pub fn show_articles(ctx: &AppContext, feed_name: &str, num: usize) {
    let articles = match ctx.store.articles_by_feed(feed_name, num) {
        Ok(articles) => articles,
        Err(e) => {
            println!("[{}] Error getting articles: {e}", timestamp());
            return;
        }
    };

    println!("[{}] Feed: {feed_name}", timestamp());
    for (i, article) in articles.iter().enumerate() {
        println!(
            "{}. [{}] {}\n   {}",
            i + 1,
            article.published_at.format("%Y-%m-%d"),
            article.title,
            article.link
        );
    }
}

/// Run the aggregator and its control listener until SIGINT/SIGTERM.
pub async fn fetch(ctx: AppContext) -> Result<()> {
    let agg = Arc::new(Aggregator::new(
        ctx.store.clone(),
        ctx.fetcher.clone(),
        ctx.config.interval,
        ctx.config.workers,
    ));

    // Bind before starting: an unusable control socket is a startup error.
    let server = ControlServer::bind(&ctx.config.socket_path)?;
    agg.start()?;

    println!(
        "[{}] The background process for fetching feeds has started (interval = {}, workers = {})",
        timestamp(),
        format_duration(ctx.config.interval),
        ctx.config.workers
    );

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let acceptor = tokio::spawn(server.serve(agg.clone(), shutdown_rx));

    wait_for_signal().await?;

    let _ = shutdown_tx.send(true);
    agg.stop().await?;
    if let Err(e) = acceptor.await {
        tracing::error!("control acceptor task failed: {e}");
    }

    println!("[{}] Graceful shutdown: aggregator stopped", timestamp());
    Ok(())
}

async fn wait_for_signal() -> Result<()> {
    let mut sigterm = signal(SignalKind::terminate())?;
    tokio::select! {
        _ = tokio::signal::ctrl_c() => {}
        _ = sigterm.recv() => {}
    }
    Ok(())
}

/// One-shot client for `set-interval`. Validates locally, then forwards the
/// request to the running aggregator's control socket.
pub async fn set_interval(ctx: &AppContext, interval: &str) {
    if parse_duration(interval).is_none() {
        println!("[{}] Invalid duration: {interval}", timestamp());
        std::process::exit(1);
    }

    match client::send_command(&ctx.config.socket_path, &format!("set-interval {interval}")).await {
        Ok(response) => println!("{response}"),
        Err(e) => println!(
            "[{}] Background process is not running or failed to connect: {e}",
            timestamp()
        ),
    }
}

/// One-shot client for `set-workers`.
pub async fn set_workers(ctx: &AppContext, count: i64) {
    if count <= 0 {
        println!("[{}] Invalid number of workers", timestamp());
        std::process::exit(1);
    }

    match client::send_command(&ctx.config.socket_path, &format!("set-workers {count}")).await {
        Ok(response) => println!("{response}"),
        Err(e) => println!(
            "[{}] Background process is not running or failed to connect: {e}",
            timestamp()
        ),
    }
}
