//! Durable storage substrate for proposal records.
//!
//! - Trait abstraction so the store can run over any key-value engine
//! - In-memory backend for tests and ephemeral runs
//! - File backend (one CBOR record per id) for real deployments

pub mod file;
pub mod memory;
pub mod traits;

pub use file::FileBackend;
pub use memory::MemoryBackend;
pub use traits::{StorageBackend, StorageError, StorageResult};
