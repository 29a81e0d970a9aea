use anyhow::Result;

use crate::{Range, Record, ViewCount};

/// Downstream writer for tracked views.
///
/// Either call may fail transiently; callers decide whether to retry.
pub trait Sink: Send + Sync {
    fn write(&self, record: &Record) -> Result<()>;

    /// Write `records` as one unit, preserving their order.
    fn batch_write(&self, records: &[Record]) -> Result<()>;
}

/// Read side: per-range view counts for one identifier.
pub trait Retriever: Send + Sync {
    /// One [`ViewCount`] per entry of `ranges`, in the same order.
    fn retrieve(&self, id: &str, ranges: &[Range]) -> Result<Vec<ViewCount>>;
}
