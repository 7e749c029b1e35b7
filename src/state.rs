//! Application state management

use crate::config::{DbConfig, RefreshConfig};
use crate::db::sqlite::SqliteDb;
use crate::error::Result;
use std::sync::Arc;

/// Application state shared across services
pub struct AppState {
    /// SQLite database connection
    pub sqlite: Arc<SqliteDb>,

    /// Refresh engine configuration
    pub refresh: RefreshConfig,
}

impl AppState {
    /// Create new application state
    pub fn new(db_config: &DbConfig, refresh: RefreshConfig) -> Result<Self> {
        if let Some(parent) = db_config.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        tracing::info!("Opening database at {:?}", db_config.path);
        let sqlite = Arc::new(SqliteDb::new(db_config)?);

        Ok(Self { sqlite, refresh })
    }

    /// State backed by an in-memory database, for tests and tooling.
    pub fn in_memory() -> Result<Self> {
        Ok(Self {
            sqlite: Arc::new(SqliteDb::open_in_memory()?),
            refresh: RefreshConfig::default(),
        })
    }
}
