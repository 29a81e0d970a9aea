use std::sync::RwLock;

use anyhow::{Result, anyhow};
use chrono::{DateTime, Utc};
use hashbrown::HashMap;

use crate::range::tally;
use crate::{Range, Record, Retriever, Sink, ViewCount};

/// Process-local store keyed by view identifier.
#[derive(Default)]
pub struct MemoryStore {
    views: RwLock<HashMap<String, Vec<DateTime<Utc>>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total number of stored views across all identifiers.
    pub fn len(&self) -> usize {
        self.views
            .read()
            .map(|views| views.values().map(Vec::len).sum())
            .unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn insert_all<'a>(&self, records: impl IntoIterator<Item = &'a Record>) -> Result<()> {
        let mut views = self
            .views
            .write()
            .map_err(|_| anyhow!("memory store lock poisoned"))?;

        for record in records {
            views
                .entry_ref(record.id.as_str())
                .or_insert_with(Vec::new)
                .push(record.timestamp);
        }

        Ok(())
    }
}

impl Sink for MemoryStore {
    fn write(&self, record: &Record) -> Result<()> {
        self.insert_all(std::iter::once(record))
    }

    fn batch_write(&self, records: &[Record]) -> Result<()> {
        self.insert_all(records)
    }
}

impl Retriever for MemoryStore {
    fn retrieve(&self, id: &str, ranges: &[Range]) -> Result<Vec<ViewCount>> {
        if ranges.is_empty() {
            return Ok(Vec::new());
        }

        let views = self
            .views
            .read()
            .map_err(|_| anyhow!("memory store lock poisoned"))?;

        let timestamps = views.get(id).map(Vec::as_slice).unwrap_or_default();
        Ok(tally(timestamps.iter().copied(), ranges, Utc::now()))
    }
}

#[cfg(test)]
#[path = "memory_tests.rs"]
mod tests;
