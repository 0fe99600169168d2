//! Append-only dataset file: one pretty-printed JSON array of records.
//!
//! Every append reads the whole array, pushes one record and rewrites the
//! file through a temp file in the same directory, so an interrupted write
//! leaves the previous complete array behind. A missing file is an empty
//! dataset. An unreadable file is set aside as `<name>.corrupt-<timestamp>`
//! and the dataset restarts from empty.

use anyhow::{Context, Result};
use serde::Serialize;
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{debug, error};

use crate::models::DatasetRecord;
use crate::observe::{Event, Observer};

/// What was on disk before an operation.
enum OnDisk {
    Missing,
    Records(Vec<DatasetRecord>),
    Corrupt(String),
}

pub struct DatasetStore {
    path: PathBuf,
}

impl DatasetStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read(&self) -> Result<OnDisk> {
        // Bytes, not text: a write cut short mid-character is corrupt, not an I/O error
        let content = match fs::read(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(OnDisk::Missing),
            Err(e) => return Err(e).with_context(|| format!("Failed to read dataset: {:?}", self.path)),
        };
        if content.iter().all(u8::is_ascii_whitespace) {
            return Ok(OnDisk::Records(Vec::new()));
        }
        match serde_json::from_slice::<Vec<DatasetRecord>>(&content) {
            Ok(records) => Ok(OnDisk::Records(records)),
            Err(e) => Ok(OnDisk::Corrupt(e.to_string())),
        }
    }

    /// Every stored record, in append order. Missing or corrupt files read
    /// as empty; only I/O errors other than "not found" are returned.
    pub fn load_all(&self) -> Result<Vec<DatasetRecord>> {
        match self.read()? {
            OnDisk::Missing => Ok(Vec::new()),
            OnDisk::Records(records) => Ok(records),
            OnDisk::Corrupt(reason) => {
                error!(path = %self.path.display(), reason = %reason, "dataset file unreadable, treating as empty");
                Ok(Vec::new())
            }
        }
    }

    /// Append one record and rewrite the file.
    pub fn append(&self, obs: &Observer, record: &DatasetRecord) -> Result<()> {
        let mut records = match self.read()? {
            OnDisk::Missing => Vec::new(),
            OnDisk::Records(records) => records,
            OnDisk::Corrupt(reason) => {
                let backup = self.set_aside();
                obs.record(Event::StoreRecovered {
                    path: self.path.clone(),
                    backup,
                    reason,
                });
                Vec::new()
            }
        };
        records.push(record.clone());
        self.write_all(&records)?;
        debug!(path = %self.path.display(), records = records.len(), "dataset written");
        Ok(())
    }

    /// Rename a corrupt dataset out of the way. `None` if the rename failed.
    fn set_aside(&self) -> Option<PathBuf> {
        let stamp = chrono::Utc::now().format("%Y%m%dT%H%M%SZ");
        let mut name = self.path.file_name()?.to_os_string();
        name.push(format!(".corrupt-{}", stamp));
        let backup = self.path.with_file_name(name);
        match fs::rename(&self.path, &backup) {
            Ok(()) => Some(backup),
            Err(e) => {
                error!(path = %self.path.display(), error = %e, "could not set aside corrupt dataset");
                None
            }
        }
    }

    fn write_all(&self, records: &[DatasetRecord]) -> Result<()> {
        let dir = match self.path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir,
            _ => Path::new("."),
        };
        let mut tmp = NamedTempFile::new_in(dir)
            .with_context(|| format!("Failed to create temp file in {:?}", dir))?;
        tmp.write_all(&to_pretty_json(records)?)?;
        tmp.write_all(b"\n")?;
        tmp.as_file().sync_all()?;
        tmp.persist(&self.path)
            .with_context(|| format!("Failed to replace dataset: {:?}", self.path))?;
        Ok(())
    }
}

/// Four-space indented JSON with non-ASCII kept as-is.
fn to_pretty_json<T: Serialize + ?Sized>(value: &T) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
    value.serialize(&mut ser)?;
    Ok(buf)
}
