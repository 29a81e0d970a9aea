mod file;
mod memory;
mod range;
mod record;
mod sink;

pub use file::FileStore;
pub use memory::MemoryStore;
pub use range::{DEFAULT_RANGES, Range, ViewCount};
pub use record::Record;
pub use sink::{Retriever, Sink};
