//! Medicine store backed by a pretty-printed JSON file.
//!
//! The whole record set is read at open and rewritten on every mutation.
//! Writes go to a sibling temp file that is renamed over the target, so a
//! crash mid-write leaves the previous file intact.
//!
//! Another process may write the same file (the CLI's one-shot commands
//! while `watch` runs). Every mutation first re-reads the file if it changed
//! on disk since this store last saw it, so one writer does not overwrite
//! the other's records.

mod medicines;
mod schedule;

#[allow(unused_imports)]
pub use medicines::*;
#[allow(unused_imports)]
pub use schedule::*;

use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::models::{MedicineId, MedicineRecord, ValidationError};

/// Store errors.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Medicine not found: {0}")]
    NotFound(MedicineId),

    #[error("Invalid medicine: {0}")]
    Invalid(#[from] ValidationError),
}

pub type StoreResult<T> = Result<T, StoreError>;

enum Backing {
    File(PathBuf),
    Memory,
}

/// Modification time and length of the data file when last read or written.
type DiskStamp = (SystemTime, u64);

/// Owned medicine list plus where it persists to.
pub struct MedicineStore {
    backing: Backing,
    records: Vec<MedicineRecord>,
    seen: Option<DiskStamp>,
}

impl MedicineStore {
    /// Open the store at path. A missing or unreadable file yields an empty store.
    pub fn open<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref().to_path_buf();
        let records = load_records(&path);
        info!(count = records.len(), path = ?path, "Loaded medicines");
        Self {
            seen: disk_stamp(&path),
            backing: Backing::File(path),
            records,
        }
    }

    /// Create a store that never touches disk (for testing).
    pub fn in_memory() -> Self {
        Self::with_records(Vec::new())
    }

    /// Create an in-memory store seeded with records.
    pub fn with_records(records: Vec<MedicineRecord>) -> Self {
        Self {
            backing: Backing::Memory,
            records,
            seen: None,
        }
    }

    /// Backing file, if any.
    pub fn path(&self) -> Option<&Path> {
        match &self.backing {
            Backing::File(path) => Some(path),
            Backing::Memory => None,
        }
    }

    /// All records in store order.
    pub fn records(&self) -> &[MedicineRecord] {
        &self.records
    }

    /// Re-read the backing file, replacing in-memory state.
    pub fn reload(&mut self) {
        if let Backing::File(path) = &self.backing {
            self.records = load_records(path);
            self.seen = disk_stamp(path);
            debug!(count = self.records.len(), "Reloaded medicines");
        }
    }

    /// Reload only if the backing file changed since this store last read
    /// or wrote it. Returns true when records were re-read.
    ///
    /// A file that vanished or is no longer a regular file keeps the
    /// in-memory records.
    pub fn refresh(&mut self) -> bool {
        let Backing::File(path) = &self.backing else {
            return false;
        };
        match disk_stamp(path) {
            Some(stamp) if self.seen != Some(stamp) => {
                self.reload();
                true
            }
            _ => false,
        }
    }

    /// Persist the current record set. Logs and returns false on failure.
    pub fn save(&self) -> bool {
        match self.persist(&self.records) {
            Ok(()) => true,
            Err(e) => {
                warn!(error = %e, "Failed to save medicines");
                false
            }
        }
    }

    fn persist(&self, records: &[MedicineRecord]) -> StoreResult<()> {
        match &self.backing {
            Backing::File(path) => save_records(path, records),
            Backing::Memory => Ok(()),
        }
    }

    /// Persist `next` and adopt it. On failure the current state is kept.
    fn commit(&mut self, next: Vec<MedicineRecord>) -> StoreResult<()> {
        self.persist(&next)?;
        self.records = next;
        if let Backing::File(path) = &self.backing {
            self.seen = disk_stamp(path);
        }
        Ok(())
    }
}

/// Read records from path.
///
/// Never fails: a missing file is empty, and content that is not a JSON
/// array is moved aside to `<file>.corrupt` and treated as empty. Records
/// that do not parse are skipped; the file is then copied to
/// `<file>.corrupt` so the next save does not lose them.
pub fn load_records(path: &Path) -> Vec<MedicineRecord> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            info!(path = ?path, "Data file not found, starting empty");
            return Vec::new();
        }
        Err(e) => {
            warn!(path = ?path, error = %e, "Failed to read data file");
            return Vec::new();
        }
    };

    let value: serde_json::Value = match serde_json::from_str(&content) {
        Ok(value) => value,
        Err(e) => {
            warn!(path = ?path, error = %e, "Data file is not valid JSON");
            quarantine(path);
            return Vec::new();
        }
    };

    let serde_json::Value::Array(values) = value else {
        warn!(path = ?path, "Data file does not hold an array");
        quarantine(path);
        return Vec::new();
    };

    let total = values.len();
    let records: Vec<MedicineRecord> = values
        .into_iter()
        .enumerate()
        .filter_map(|(index, value)| match serde_json::from_value(value) {
            Ok(record) => Some(record),
            Err(e) => {
                warn!(path = ?path, index, error = %e, "Skipping malformed medicine");
                None
            }
        })
        .collect();

    if records.len() < total {
        back_up(path);
    }
    records
}

/// Write records to path as 2-space indented JSON, replacing atomically.
pub fn save_records(path: &Path, records: &[MedicineRecord]) -> StoreResult<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            fs::create_dir_all(parent)?;
        }
    }

    let json = serde_json::to_string_pretty(records)?;

    let temp_path = sibling(path, ".tmp");
    fs::write(&temp_path, json)?;
    fs::rename(&temp_path, path)?;

    debug!(count = records.len(), path = ?path, "Saved medicines");
    Ok(())
}

/// Path of the file a malformed data file is moved to.
pub fn corrupt_path(path: &Path) -> PathBuf {
    sibling(path, ".corrupt")
}

fn sibling(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(suffix);
    path.with_file_name(name)
}

fn quarantine(path: &Path) {
    let target = corrupt_path(path);
    match fs::rename(path, &target) {
        Ok(()) => warn!(from = ?path, to = ?target, "Moved malformed data file aside"),
        Err(e) => warn!(path = ?path, error = %e, "Could not move malformed data file aside"),
    }
}

fn back_up(path: &Path) {
    let target = corrupt_path(path);
    match fs::copy(path, &target) {
        Ok(_) => warn!(from = ?path, to = ?target, "Copied data file with malformed medicines"),
        Err(e) => warn!(path = ?path, error = %e, "Could not back up data file"),
    }
}

fn disk_stamp(path: &Path) -> Option<DiskStamp> {
    let metadata = fs::metadata(path).ok()?;
    if !metadata.is_file() {
        return None;
    }
    Some((metadata.modified().ok()?, metadata.len()))
}
