//! Store handle and scoped connection lifecycle.
//!
//! # Responsibility
//! - Bind one store to one file path for the owner's lifetime.
//! - Apply durability settings once at open, tolerating failure.
//! - Open one configured connection per unit of work.
//!
//! # Invariants
//! - A failed configuration step never prevents `Store` construction.
//! - Every `ScopedConnection` closes its connection when dropped.
//! - Acquired connections carry the store's per-connection settings.

use super::config::StoreConfig;
use super::DbResult;
use crate::logging::sanitize_message;
use log::{error, info, trace, warn};
use rusqlite::Connection;
use std::ops::{Deref, DerefMut};
use std::path::{Path, PathBuf};
use std::time::Instant;

const MAX_LOGGED_ERROR_CHARS: usize = 240;

/// Owner of one SQLite store file.
#[derive(Debug)]
pub struct Store {
    path: PathBuf,
    config: StoreConfig,
    degraded: bool,
}

impl Store {
    /// Opens a store with the default durability settings.
    ///
    /// See [`Store::open_with_config`].
    pub fn open(path: impl AsRef<Path>) -> Self {
        Self::open_with_config(path, StoreConfig::default())
    }

    /// Opens a store and applies one-time durability configuration.
    ///
    /// # Side effects
    /// - Opens and closes one throwaway connection to set `journal_mode`.
    /// - Emits `store_open` logging events with duration and status.
    ///
    /// Configuration failure is logged and leaves the store in degraded
    /// mode; it is still returned so the application can start.
    pub fn open_with_config(path: impl AsRef<Path>, config: StoreConfig) -> Self {
        let started_at = Instant::now();
        let mut store = Self {
            path: path.as_ref().to_path_buf(),
            config,
            degraded: false,
        };
        info!(
            "event=store_open module=db status=start journal_mode={} synchronous={} foreign_keys={}",
            store.config.journal_mode.as_pragma(),
            store.config.synchronous.as_pragma(),
            store.config.foreign_keys
        );

        match store.apply_durability() {
            Ok(actual_mode) => info!(
                "event=store_open module=db status=ok journal_mode={} duration_ms={}",
                actual_mode,
                started_at.elapsed().as_millis()
            ),
            Err(err) => {
                store.degraded = true;
                error!(
                    "event=store_open module=db status=error error_code=store_config_failed duration_ms={} error={}",
                    started_at.elapsed().as_millis(),
                    sanitize_message(&err.to_string(), MAX_LOGGED_ERROR_CHARS)
                );
            }
        }

        store
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Whether one-time durability configuration failed at open.
    pub fn is_degraded(&self) -> bool {
        self.degraded
    }

    /// Opens a new connection configured with the store's per-connection
    /// settings. The connection closes when the returned guard is dropped.
    pub fn acquire(&self) -> DbResult<ScopedConnection> {
        let conn = Connection::open(&self.path)?;
        conn.busy_timeout(self.config.busy_timeout)?;
        conn.execute_batch(&format!(
            "PRAGMA synchronous = {}; PRAGMA foreign_keys = {};",
            self.config.synchronous.as_pragma(),
            if self.config.foreign_keys { "ON" } else { "OFF" }
        ))?;
        Ok(ScopedConnection {
            conn,
            acquired_at: Instant::now(),
        })
    }

    fn apply_durability(&self) -> DbResult<String> {
        let conn = self.acquire()?;
        let requested = self.config.journal_mode.as_pragma();
        let actual: String =
            conn.pragma_update_and_check(None, "journal_mode", requested, |row| row.get(0))?;
        if !actual.eq_ignore_ascii_case(requested) {
            warn!(
                "event=store_open module=db status=warn requested_journal_mode={} actual_journal_mode={}",
                requested, actual
            );
        }
        Ok(actual)
    }
}

/// Connection bound to one operation or transaction.
pub struct ScopedConnection {
    conn: Connection,
    acquired_at: Instant,
}

impl Deref for ScopedConnection {
    type Target = Connection;

    fn deref(&self) -> &Self::Target {
        &self.conn
    }
}

impl DerefMut for ScopedConnection {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.conn
    }
}

impl Drop for ScopedConnection {
    fn drop(&mut self) {
        trace!(
            "event=db_release module=db held_ms={}",
            self.acquired_at.elapsed().as_millis()
        );
    }
}
