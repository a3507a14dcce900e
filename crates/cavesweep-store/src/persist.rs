//! Loading and atomically rewriting the store file.

use crate::record::{CellKey, Outcome, ResultRecord};
use crate::{StoreError, StoreResult};
use std::collections::BTreeMap;
use std::fs;
use std::io::{self, Write};
use std::path::Path;
use tempfile::NamedTempFile;
use tracing::{debug, warn};

/// Every known cell outcome, ordered by `(k, rule)`.
pub type Records = BTreeMap<CellKey, Outcome>;

/// Parse store text. Short lines are dropped silently; malformed lines are
/// dropped with a warning. A later line for the same cell wins.
pub fn parse_records(text: &str) -> Records {
    let mut records = Records::new();
    for (idx, line) in text.lines().enumerate() {
        match ResultRecord::parse_line(line) {
            Ok(Some(record)) => {
                records.insert(record.key, record.outcome);
            }
            Ok(None) => {
                if !line.trim().is_empty() {
                    debug!(line = idx + 1, "skipping short store line");
                }
            }
            Err(e) => warn!(line = idx + 1, error = %e, "skipping unreadable store line"),
        }
    }
    records
}

/// Render records in key order, one line each.
pub fn render_records(records: &Records) -> String {
    let mut out = String::new();
    for (key, outcome) in records {
        out.push_str(&ResultRecord::new(*key, *outcome).to_string());
        out.push('\n');
    }
    out
}

/// Load a store file. A missing file is an empty store.
///
/// Bytes that are not UTF-8 only spoil the line they sit on; that line
/// then fails to parse and is skipped like any other malformed line.
pub fn load_records(path: &Path) -> StoreResult<Records> {
    match fs::read(path) {
        Ok(bytes) => Ok(parse_records(&String::from_utf8_lossy(&bytes))),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(Records::new()),
        Err(source) => Err(StoreError::Read {
            path: path.to_path_buf(),
            source,
        }),
    }
}

/// Replace the store file with `records`.
///
/// The text goes to a temporary file in the same directory which is then
/// renamed over `path`, so readers only ever see a complete store.
pub fn write_records(path: &Path, records: &Records) -> StoreResult<()> {
    let write_err = |source: io::Error| StoreError::Write {
        path: path.to_path_buf(),
        source,
    };

    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    let mut tmp = NamedTempFile::new_in(dir).map_err(write_err)?;
    tmp.write_all(render_records(records).as_bytes())
        .map_err(write_err)?;
    tmp.as_file().sync_all().map_err(write_err)?;
    tmp.persist(path).map_err(|e| write_err(e.error))?;
    Ok(())
}
