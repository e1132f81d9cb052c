pub mod commands;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "freshet")]
#[command(about = "An RSS/Atom feed aggregator with live-reconfigurable polling", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Add a new feed
    Add {
        /// Unique feed name
        #[arg(long)]
        name: String,
        /// Feed URL
        #[arg(long)]
        url: String,
    },
    /// List feeds, newest first
    List {
        /// Maximum number of feeds to show (0 or absent = all)
        #[arg(long)]
        num: Option<usize>,
    },
    /// Delete a feed by name
    Delete {
        /// Feed name
        #[arg(long)]
        name: String,
    },
    /// Show the latest articles of a feed
    Articles {
        /// Feed name
        #[arg(long = "feed-name")]
        feed_name: String,
        /// Number of articles to show
        #[arg(long, default_value_t = 3)]
        num: usize,
    },
    /// Run the aggregator and its control listener in the foreground
    Fetch,
    /// Change the poll interval of a running aggregator
    SetInterval {
        /// New interval, e.g. "2m" or "1h30m"
        interval: String,
    },
    /// Change the worker count of a running aggregator
    SetWorkers {
        /// New worker count
        count: i64,
    },
}
