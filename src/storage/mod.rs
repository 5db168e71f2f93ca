pub mod memory;
pub mod sqlite;
pub mod trait_def;

#[cfg(test)]
mod store_tests;

pub use memory::MemoryEventStore;
pub use sqlite::SqliteEventStore;
pub use trait_def::{EventFilter, EventStore};
