//! Trait abstraction for the durable proposal substrate.
//!
//! The store only needs a key-value layer keyed by proposal id that can
//! export everything and bulk-import it back. Any engine that round-trips
//! exactly can sit behind [`StorageBackend`].

use crate::governance::types::{Proposal, ProposalId};
use crate::serialization::SerializationError;
use async_trait::async_trait;
use std::path::PathBuf;

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Storage substrate errors.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] SerializationError),

    /// Stored data is readable but inconsistent (e.g. a record filed under the wrong id).
    #[error("Corrupted store: {0}")]
    Corrupted(String),

    /// The backend refused the write.
    #[error("Write rejected: {0}")]
    WriteRejected(String),

    /// Another process holds the data directory.
    #[error("Data directory {} is in use by another process", .0.display())]
    Locked(PathBuf),

    /// An incoming record disagrees with the one already stored under its id.
    #[error("Conflicting record: {0}")]
    Conflict(String),
}

/// Durable key-value storage for proposal records.
#[async_trait]
pub trait StorageBackend: Send + Sync {
    /// Insert or replace the record stored under `record.id`.
    async fn put(&self, record: &Proposal) -> StorageResult<()>;

    /// Every stored record, ordered by id.
    async fn export_all(&self) -> StorageResult<Vec<(ProposalId, Proposal)>>;

    /// Insert or replace every entry, all or nothing: on error the backend
    /// holds exactly what it held before. Importing the same entries twice
    /// leaves the backend unchanged.
    async fn import_all(&self, entries: &[(ProposalId, Proposal)]) -> StorageResult<()>;

    /// Persisted allocator value, `None` on a cold start.
    async fn load_next_id(&self) -> StorageResult<Option<ProposalId>>;

    /// Persist the allocator value.
    async fn store_next_id(&self, next: ProposalId) -> StorageResult<()>;
}
