use std::{
    fs::{self, File, OpenOptions},
    io::{self, BufRead, BufReader, Write},
    path::{Path, PathBuf},
    sync::Mutex,
};

use anyhow::{Context, Result, anyhow};
use chrono::Utc;
use log::warn;

use crate::range::tally;
use crate::{Range, Record, Retriever, Sink, ViewCount};

/// Append-only NDJSON log of views, one serialized [`Record`] per line.
///
/// Retrieval scans the whole log, so this is meant for local use and
/// tests rather than large volumes.
pub struct FileStore {
    path: PathBuf,
    // Serializes appends from concurrent flush threads.
    write_lock: Mutex<()>,
}

impl FileStore {
    /// Open (or lazily create) the log at `path`.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();

        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }

        Ok(Self {
            path,
            write_lock: Mutex::new(()),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn append(&self, records: &[Record]) -> Result<()> {
        if records.is_empty() {
            return Ok(());
        }

        let mut buf = String::new();
        for record in records {
            buf.push_str(&serde_json::to_string(record)?);
            buf.push('\n');
        }

        let _guard = self
            .write_lock
            .lock()
            .map_err(|_| anyhow!("file store lock poisoned"))?;

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .with_context(|| format!("Failed to open {}", self.path.display()))?;

        // One write_all per batch keeps a batch's lines contiguous in the log.
        file.write_all(buf.as_bytes())
            .with_context(|| format!("Failed to append to {}", self.path.display()))?;

        Ok(())
    }

    /// Every well-formed record in the log, in append order.
    pub fn records(&self) -> Result<Vec<Record>> {
        let file = match File::open(&self.path) {
            Ok(f) => f,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(e).with_context(|| format!("Failed to open {}", self.path.display()));
            }
        };

        let mut records = Vec::new();
        // Raw bytes: a torn or corrupt line must not fail the whole scan.
        for line in BufReader::new(file).split(b'\n') {
            let line = line.with_context(|| format!("Failed to read {}", self.path.display()))?;
            if line.trim_ascii().is_empty() {
                continue;
            }
            match serde_json::from_slice::<Record>(&line) {
                Ok(record) => records.push(record),
                Err(e) => warn!("Skipping malformed view line: {e}"),
            }
        }

        Ok(records)
    }
}

impl Sink for FileStore {
    fn write(&self, record: &Record) -> Result<()> {
        self.append(std::slice::from_ref(record))
    }

    fn batch_write(&self, records: &[Record]) -> Result<()> {
        self.append(records)
    }
}

impl Retriever for FileStore {
    fn retrieve(&self, id: &str, ranges: &[Range]) -> Result<Vec<ViewCount>> {
        if ranges.is_empty() {
            return Ok(Vec::new());
        }

        let timestamps = self
            .records()?
            .into_iter()
            .filter(|r| r.id == id)
            .map(|r| r.timestamp);

        Ok(tally(timestamps, ranges, Utc::now()))
    }
}

#[cfg(test)]
#[path = "file_tests.rs"]
mod tests;
