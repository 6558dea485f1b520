//! Storage implementations for Hydra.
//!
//! Every backend here implements the conversation store plus the catalog,
//! order, and profile traits the tools read through.

pub mod in_memory;
pub mod knowledge;
pub mod seed;

#[cfg(feature = "sqlite")]
pub mod sqlite;

pub use in_memory::InMemoryStore;
pub use knowledge::StaticKnowledge;
pub use seed::{CatalogWriter, SeedReport, seed_demo_data};

#[cfg(feature = "sqlite")]
pub use sqlite::SqliteStore;
