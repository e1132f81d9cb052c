use std::sync::Arc;

use crate::app::error::Result;
use crate::config::Config;
use crate::fetcher::{Fetcher, HttpFetcher};
use crate::store::SqliteStore;

/// Wires the store and the fetcher together for the CLI entry points.
pub struct AppContext {
    pub config: Config,
    pub store: Arc<SqliteStore>,
    pub fetcher: Arc<dyn Fetcher + Send + Sync>,
}

impl AppContext {
    pub fn new(config: Config) -> Result<Self> {
        if let Some(parent) = config.db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let store = Arc::new(SqliteStore::new(&config.db_path)?);
        let fetcher: Arc<dyn Fetcher + Send + Sync> = Arc::new(HttpFetcher::new());

        Ok(Self {
            config,
            store,
            fetcher,
        })
    }
}
