//! Environment-driven configuration.
//!
//! | variable           | default                         |
//! |--------------------|---------------------------------|
//! | `FRESHET_INTERVAL` | `3m`                            |
//! | `FRESHET_WORKERS`  | `3`                             |
//! | `FRESHET_DB`       | `<data_dir>/freshet/freshet.db` |
//! | `FRESHET_SOCKET`   | `<tmp>/freshet.sock`            |

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use crate::app::error::{FreshetError, Result};
use crate::duration::parse_duration;

pub const DEFAULT_INTERVAL: &str = "3m";
pub const DEFAULT_WORKERS: usize = 3;

#[derive(Debug, Clone)]
pub struct Config {
    /// How often the aggregator polls for outdated feeds.
    pub interval: Duration,
    /// Initial worker pool size.
    pub workers: usize,
    /// SQLite database location.
    pub db_path: PathBuf,
    /// Control socket of a running `fetch` process.
    pub socket_path: PathBuf,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let interval_str = env_or("FRESHET_INTERVAL", DEFAULT_INTERVAL);
        let interval = parse_duration(&interval_str).ok_or_else(|| {
            FreshetError::Config(format!("invalid FRESHET_INTERVAL: {interval_str}"))
        })?;

        let workers = match env::var("FRESHET_WORKERS") {
            Ok(val) => val
                .parse::<usize>()
                .ok()
                .filter(|&n| n > 0)
                .ok_or_else(|| FreshetError::Config(format!("invalid FRESHET_WORKERS: {val}")))?,
            Err(_) => DEFAULT_WORKERS,
        };

        let db_path = match env::var_os("FRESHET_DB") {
            Some(path) => PathBuf::from(path),
            None => default_db_path()?,
        };

        let socket_path = match env::var_os("FRESHET_SOCKET") {
            Some(path) => PathBuf::from(path),
            None => env::temp_dir().join("freshet.sock"),
        };

        Ok(Self {
            interval,
            workers,
            db_path,
            socket_path,
        })
    }
}

fn env_or(key: &str, default: &str) -> String {
    match env::var(key) {
        Ok(val) if !val.is_empty() => val,
        _ => default.to_string(),
    }
}

fn default_db_path() -> Result<PathBuf> {
    let data_dir = dirs::data_dir()
        .ok_or_else(|| FreshetError::Config("could not determine data directory".into()))?;
    Ok(data_dir.join("freshet").join("freshet.db"))
}
