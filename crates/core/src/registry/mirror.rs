//! Disk mirror of the live snapshot.
//!
//! After every successful refresh the whole table is rewritten as one JSON
//! document; at startup that document is read back into a fresh snapshot so
//! the service answers from the last good copy without waiting for the first
//! download. Writes go to a sibling temp file first and are renamed into
//! place, so a crash mid-save leaves the previous mirror intact.

use std::collections::HashMap;
use std::fmt::Display;
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use chrono::DateTime;
use serde::{Deserialize, Serialize};

use super::{Record, Snapshot};

/// Errors from reading or writing the mirror file.
#[derive(Debug, thiserror::Error)]
pub enum MirrorError {
    /// The persisted snapshot could not be read or decoded.
    #[error("failed to read snapshot mirror at {}: {detail}", path.display())]
    ReadFailed { path: PathBuf, detail: String },

    /// The snapshot could not be written durably.
    #[error("failed to write snapshot mirror at {}: {detail}", path.display())]
    WriteFailed { path: PathBuf, detail: String },
}

/// On-disk layout, rewritten wholesale on every save.
#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MirrorFile {
    last_update: i64,
    count: usize,
    data: Vec<(String, Record)>,
}

/// Serializes the lookup table to durable storage and restores it at startup.
pub struct SnapshotMirror {
    path: PathBuf,
}

impl SnapshotMirror {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Persist a snapshot.
    ///
    /// A failure here never invalidates the in-memory snapshot; callers log
    /// and move on.
    pub fn save(&self, snapshot: &Snapshot) -> Result<(), MirrorError> {
        let file = MirrorFile {
            last_update: snapshot
                .fetched_at()
                .map(|t| t.timestamp_millis())
                .unwrap_or_default(),
            count: snapshot.len(),
            data: snapshot
                .iter()
                .map(|(key, record)| (key.clone(), record.clone()))
                .collect(),
        };
        let bytes = serde_json::to_vec(&file).map_err(|e| self.write_failed(e))?;

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| self.write_failed(e))?;
        }

        let temp = self.path.with_extension("tmp");
        let mut out = File::create(&temp).map_err(|e| self.write_failed(e))?;
        out.write_all(&bytes).map_err(|e| self.write_failed(e))?;
        out.sync_all().map_err(|e| self.write_failed(e))?;
        fs::rename(&temp, &self.path).map_err(|e| self.write_failed(e))?;

        tracing::debug!(
            path = %self.path.display(),
            entries = file.count,
            "snapshot mirrored to disk"
        );
        Ok(())
    }

    /// Read the mirror back into a fresh snapshot. Startup only.
    ///
    /// A missing file is not an error; the cache simply starts empty.
    pub fn load(&self) -> Result<Option<Snapshot>, MirrorError> {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(self.read_failed(e)),
        };
        let file: MirrorFile =
            serde_json::from_slice(&bytes).map_err(|e| self.read_failed(e))?;

        let entries: HashMap<String, Record> = file.data.into_iter().collect();
        let fetched_at = DateTime::from_timestamp_millis(file.last_update);
        Ok(Some(Snapshot::from_entries(entries, fetched_at)))
    }

    fn read_failed(&self, detail: impl Display) -> MirrorError {
        MirrorError::ReadFailed { path: self.path.clone(), detail: detail.to_string() }
    }

    fn write_failed(&self, detail: impl Display) -> MirrorError {
        MirrorError::WriteFailed { path: self.path.clone(), detail: detail.to_string() }
    }
}
