//! Resumable result store for verification sweeps.
//!
//! The store maps each `(k, rule)` cell to its latest outcome and persists
//! the whole map as a line-oriented text file. Writes are rate limited: a
//! caller may ask for a flush after every cell, but the file is rewritten at
//! most once per save interval, so at most one interval of work is lost on
//! abrupt termination.

pub mod log;
pub mod persist;
pub mod record;

pub use log::ResultLog;
pub use persist::{load_records, parse_records, render_records, write_records, Records};
pub use record::{CellKey, FixedSeconds, LineError, Outcome, ResultRecord, TIMEOUT_TAG};

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, info};

/// Result store error.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to read result store '{}': {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write '{}': {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub type StoreResult<T> = Result<T, StoreError>;

/// In-memory records plus the bookkeeping for rate-limited flushing.
#[derive(Debug)]
pub struct ResultStore {
    path: PathBuf,
    records: Records,
    save_interval: Duration,
    last_flush: Instant,
}

impl ResultStore {
    /// Load the store at `path` (empty if the file does not exist).
    pub fn open(path: impl Into<PathBuf>, save_interval: Duration) -> StoreResult<Self> {
        let path = path.into();
        let records = load_records(&path)?;
        info!(records = records.len(), path = %path.display(), "loaded result store");
        Ok(Self::with_records(path, records, save_interval))
    }

    /// A store seeded with `records`; nothing is read from disk.
    pub fn with_records(path: impl Into<PathBuf>, records: Records, save_interval: Duration) -> Self {
        Self {
            path: path.into(),
            records,
            save_interval,
            last_flush: Instant::now(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn records(&self) -> &Records {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn get(&self, key: &CellKey) -> Option<&Outcome> {
        self.records.get(key)
    }

    pub fn last_flush(&self) -> Instant {
        self.last_flush
    }

    /// Insert or overwrite a cell's outcome, returning the previous one.
    pub fn record(&mut self, key: CellKey, outcome: Outcome) -> Option<Outcome> {
        self.records.insert(key, outcome)
    }

    /// Write the store if at least one save interval has passed since the
    /// last flush. Returns the instant of the most recent flush.
    pub fn flush_if_due(&mut self) -> StoreResult<Instant> {
        if self.last_flush.elapsed() >= self.save_interval {
            self.flush()
        } else {
            Ok(self.last_flush)
        }
    }

    /// Write the store now.
    pub fn flush(&mut self) -> StoreResult<Instant> {
        write_records(&self.path, &self.records)?;
        self.last_flush = Instant::now();
        debug!(records = self.records.len(), path = %self.path.display(), "flushed result store");
        Ok(self.last_flush)
    }
}
