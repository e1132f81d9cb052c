//! Line-oriented control protocol for a running aggregator.
//!
//! One connection carries exactly one newline-terminated request:
//!
//! ```text
//! set-interval 2m
//! set-workers 4
//! ```
//!
//! and receives exactly one line back: a timestamped confirmation or an
//! error. Requests are decoded into [`Command`] once at this boundary and
//! only a fully validated, in-bounds command mutates the aggregator.

pub mod client;
pub mod server;

use std::sync::Arc;
use std::time::Duration;

use chrono::{SecondsFormat, Utc};
use thiserror::Error;

use crate::aggregator::Aggregator;
use crate::duration::{format_duration, parse_duration};
use crate::store::Store;

/// Narrowest accepted poll interval.
pub const MIN_INTERVAL: Duration = Duration::from_secs(20);
/// Widest accepted poll interval.
pub const MAX_INTERVAL: Duration = Duration::from_secs(60 * 60);
/// Upper bound on the worker pool size.
pub const MAX_WORKERS: usize = 5;

/// A fully validated control command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    SetInterval(Duration),
    SetWorkers(usize),
}

/// Protocol-level rejections; rendered verbatim as the response line.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CommandError {
    #[error("Invalid command")]
    Malformed,
    #[error("Unknown command")]
    UnknownVerb,
    #[error("Invalid duration")]
    InvalidDuration,
    #[error("Invalid number")]
    InvalidNumber,
    #[error("Interval too short (minimum 20s)")]
    IntervalTooShort,
    #[error("Interval too long (maximum 60m)")]
    IntervalTooLong,
    #[error("Too many workers (maximum 5)")]
    TooManyWorkers,
    #[error("Error resizing: {0}")]
    Resize(String),
}

/// Decode one request line.
///
/// Validation order: arity, verb, argument syntax, policy bounds.
pub fn parse_command(line: &str) -> std::result::Result<Command, CommandError> {
    let parts: Vec<&str> = line.split_whitespace().collect();
    let &[verb, arg] = parts.as_slice() else {
        return Err(CommandError::Malformed);
    };

    match verb {
        "set-interval" => {
            let interval = parse_duration(arg).ok_or(CommandError::InvalidDuration)?;
            if interval < MIN_INTERVAL {
                return Err(CommandError::IntervalTooShort);
            }
            if interval > MAX_INTERVAL {
                return Err(CommandError::IntervalTooLong);
            }
            Ok(Command::SetInterval(interval))
        }
        "set-workers" => {
            let count: i64 = arg.parse().map_err(|_| CommandError::InvalidNumber)?;
            if count <= 0 {
                return Err(CommandError::InvalidNumber);
            }
            if count as usize > MAX_WORKERS {
                return Err(CommandError::TooManyWorkers);
            }
            Ok(Command::SetWorkers(count as usize))
        }
        _ => Err(CommandError::UnknownVerb),
    }
}

/// Decode and apply one request line, producing the confirmation line.
pub fn dispatch<S: Store + Send + Sync + 'static>(
    line: &str,
    agg: &Arc<Aggregator<S>>,
) -> std::result::Result<String, CommandError> {
    match parse_command(line)? {
        Command::SetInterval(interval) => {
            let old = agg.interval();
            agg.set_interval(interval);
            Ok(format!(
                "[{}] Interval of fetching feeds changed from {} to {}",
                stamp(),
                format_duration(old),
                format_duration(interval)
            ))
        }
        Command::SetWorkers(count) => {
            let old = agg.workers();
            agg.resize(count)
                .map_err(|e| CommandError::Resize(e.to_string()))?;
            Ok(format!(
                "[{}] Number of workers changed from {old} to {count}",
                stamp()
            ))
        }
    }
}

fn stamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::Result;
    use crate::fetcher::{FetchResult, Fetcher};
    use crate::store::SqliteStore;
    use async_trait::async_trait;

    #[test]
    fn parses_valid_commands() {
        assert_eq!(
            parse_command("set-interval 5m"),
            Ok(Command::SetInterval(Duration::from_secs(300)))
        );
        assert_eq!(
            parse_command("set-interval 20s"),
            Ok(Command::SetInterval(MIN_INTERVAL))
        );
        assert_eq!(
            parse_command("set-interval 60m"),
            Ok(Command::SetInterval(MAX_INTERVAL))
        );
        assert_eq!(parse_command("set-workers 1"), Ok(Command::SetWorkers(1)));
        assert_eq!(parse_command("set-workers 5\n"), Ok(Command::SetWorkers(5)));
    }

    #[test]
    fn rejects_malformed_lines() {
        assert_eq!(parse_command(""), Err(CommandError::Malformed));
        assert_eq!(parse_command("set-interval"), Err(CommandError::Malformed));
        assert_eq!(
            parse_command("set-interval 5m extra"),
            Err(CommandError::Malformed)
        );
    }

    #[test]
    fn rejects_unknown_verbs() {
        assert_eq!(parse_command("reboot now"), Err(CommandError::UnknownVerb));
    }

    #[test]
    fn rejects_bad_arguments() {
        assert_eq!(
            parse_command("set-interval soon"),
            Err(CommandError::InvalidDuration)
        );
        assert_eq!(
            parse_command("set-workers many"),
            Err(CommandError::InvalidNumber)
        );
        assert_eq!(
            parse_command("set-workers 0"),
            Err(CommandError::InvalidNumber)
        );
        assert_eq!(
            parse_command("set-workers -3"),
            Err(CommandError::InvalidNumber)
        );
    }

    #[test]
    fn rejects_out_of_bounds_arguments() {
        assert_eq!(
            parse_command("set-interval 5s"),
            Err(CommandError::IntervalTooShort)
        );
        assert_eq!(
            parse_command("set-interval 61m"),
            Err(CommandError::IntervalTooLong)
        );
        assert_eq!(
            parse_command("set-workers 10"),
            Err(CommandError::TooManyWorkers)
        );
    }

    #[test]
    fn error_lines_match_the_protocol() {
        assert_eq!(CommandError::Malformed.to_string(), "Invalid command");
        assert_eq!(CommandError::UnknownVerb.to_string(), "Unknown command");
        assert_eq!(CommandError::InvalidDuration.to_string(), "Invalid duration");
        assert_eq!(CommandError::InvalidNumber.to_string(), "Invalid number");
        assert_eq!(
            CommandError::IntervalTooShort.to_string(),
            "Interval too short (minimum 20s)"
        );
        assert_eq!(
            CommandError::IntervalTooLong.to_string(),
            "Interval too long (maximum 60m)"
        );
        assert_eq!(
            CommandError::TooManyWorkers.to_string(),
            "Too many workers (maximum 5)"
        );
    }

    struct EmptyFetcher;

    #[async_trait]
    impl Fetcher for EmptyFetcher {
        async fn fetch(
            &self,
            _url: &str,
            _etag: Option<&str>,
            _last_modified: Option<&str>,
        ) -> Result<FetchResult> {
            Ok(FetchResult::NotModified)
        }
    }

    fn running_aggregator(
        interval: Duration,
        workers: usize,
    ) -> Arc<Aggregator<SqliteStore>> {
        let store = Arc::new(SqliteStore::in_memory().unwrap());
        let agg = Arc::new(Aggregator::new(
            store,
            Arc::new(EmptyFetcher),
            interval,
            workers,
        ));
        agg.start().unwrap();
        agg
    }

    #[tokio::test]
    async fn interval_change_reports_old_and_new() {
        let agg = running_aggregator(Duration::from_secs(180), 3);

        let response = dispatch("set-interval 5m", &agg).unwrap();
        assert!(response.contains("changed from 3m0s to 5m0s"));
        assert_eq!(agg.interval(), Duration::from_secs(300));

        agg.stop().await.unwrap();
    }

    #[tokio::test]
    async fn worker_change_reports_old_and_new() {
        let agg = running_aggregator(Duration::from_secs(180), 3);

        let response = dispatch("set-workers 5", &agg).unwrap();
        assert!(response.contains("Number of workers changed from 3 to 5"));
        assert_eq!(agg.workers(), 5);

        agg.stop().await.unwrap();
    }

    #[tokio::test]
    async fn rejected_commands_leave_state_untouched() {
        let agg = running_aggregator(Duration::from_secs(180), 3);

        assert!(dispatch("set-workers 10", &agg).is_err());
        assert_eq!(agg.workers(), 3);

        assert!(dispatch("set-interval 5s", &agg).is_err());
        assert_eq!(agg.interval(), Duration::from_secs(180));

        agg.stop().await.unwrap();
    }
}
