pub mod memory;
pub mod trait_def;

pub use memory::MemoryStore;
pub use trait_def::{LinkEntry, LinkStore, StorageError, StorageResult};
