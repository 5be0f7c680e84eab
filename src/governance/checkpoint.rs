//! Snapshot checkpoints for process replacement.
//!
//! The store itself lives in memory over a [`StorageBackend`]. Checkpoints
//! add a second, self-contained copy of the whole store: one sealed CBOR
//! file (see [`crate::serialization::seal_snapshot`]) written at
//! controlled points:
//!
//! - startup: [`Checkpointer::restore`] into an empty store
//! - periodically: [`Checkpointer::spawn_periodic`]
//! - graceful shutdown: a final [`Checkpointer::checkpoint`]

use super::error::GovernanceResult;
use super::store::{ProposalStore, StoreSnapshot, SNAPSHOT_SCHEMA_VERSION};
use crate::serialization::{open_snapshot, seal_snapshot};
use crate::storage::file::write_atomic;
use crate::storage::{StorageBackend, StorageResult};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{info, warn};

/// Write a sealed snapshot to `path`, atomically.
pub async fn write_snapshot(path: &Path, snapshot: &StoreSnapshot) -> StorageResult<()> {
    let bytes = seal_snapshot(snapshot, SNAPSHOT_SCHEMA_VERSION)?;
    write_atomic(path, &bytes).await
}

/// Read and verify a sealed snapshot. `Ok(None)` if the file does not exist.
pub async fn read_snapshot(path: &Path) -> StorageResult<Option<StoreSnapshot>> {
    let bytes = match tokio::fs::read(path).await {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    let (_, snapshot) = open_snapshot(&bytes, SNAPSHOT_SCHEMA_VERSION)?;
    Ok(Some(snapshot))
}

/// Outcome of a startup restore.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RestoreOutcome {
    /// No snapshot file was found.
    NoSnapshot,
    /// The store already held records; the snapshot was left alone.
    StoreNotEmpty,
    /// This many proposals were imported.
    Restored(usize),
}

/// Ties a store to its checkpoint file.
pub struct Checkpointer<B: StorageBackend> {
    store: Arc<ProposalStore<B>>,
    path: PathBuf,
}

impl<B: StorageBackend + 'static> Checkpointer<B> {
    pub fn new(store: Arc<ProposalStore<B>>, path: impl Into<PathBuf>) -> Self {
        Self {
            store,
            path: path.into(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Export the store and write it to the checkpoint file.
    /// Returns the number of proposals written.
    pub async fn checkpoint(&self) -> StorageResult<usize> {
        let snapshot = self.store.export_snapshot().await;
        let count = snapshot.entries.len();
        write_snapshot(&self.path, &snapshot).await?;
        info!(
            path = %self.path.display(),
            proposals = count,
            next_id = %snapshot.next_proposal_id,
            "checkpoint written"
        );
        Ok(count)
    }

    /// Restore from the checkpoint file into an empty store.
    ///
    /// A store that already holds records is newer than any checkpoint it
    /// wrote, so the file is not applied over it.
    pub async fn restore(&self) -> GovernanceResult<RestoreOutcome> {
        if !self.store.is_empty().await {
            return Ok(RestoreOutcome::StoreNotEmpty);
        }
        let Some(snapshot) = read_snapshot(&self.path).await? else {
            return Ok(RestoreOutcome::NoSnapshot);
        };
        let imported = self.store.import_snapshot(snapshot).await?;
        info!(path = %self.path.display(), imported, "restored from checkpoint");
        Ok(RestoreOutcome::Restored(imported))
    }

    /// Checkpoint every `interval` until `shutdown` flips to `true`, then
    /// write one final checkpoint.
    pub fn spawn_periodic(
        self: Arc<Self>,
        interval: Duration,
        mut shutdown: watch::Receiver<bool>,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            // The first tick fires immediately; skip it.
            ticker.tick().await;

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        if let Err(e) = self.checkpoint().await {
                            warn!(error = %e, "periodic checkpoint failed");
                        }
                    }
                    changed = shutdown.changed() => {
                        if changed.is_err() || *shutdown.borrow() {
                            break;
                        }
                    }
                }
            }

            if let Err(e) = self.checkpoint().await {
                warn!(error = %e, "final checkpoint failed");
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::governance::clock::ManualClock;
    use crate::governance::types::CreateProposalRequest;
    use crate::serialization::{from_cbor, to_cbor, SerializationError, SnapshotEnvelope};
    use crate::storage::{MemoryBackend, StorageError};
    use tempfile::TempDir;

    async fn new_store() -> Arc<ProposalStore<MemoryBackend>> {
        Arc::new(
            ProposalStore::open(MemoryBackend::new(), Arc::new(ManualClock::new(0)))
                .await
                .unwrap(),
        )
    }

    fn request(title: &str) -> CreateProposalRequest {
        CreateProposalRequest {
            title: title.to_string(),
            description: String::new(),
            options: vec!["For".to_string(), "Against".to_string()],
            duration_hours: 72,
        }
    }

    #[tokio::test]
    async fn test_checkpoint_then_restore_into_fresh_store() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("snapshot.cbor");

        let store = new_store().await;
        let id = store.create_proposal(request("a"), "agent").await.unwrap();
        store.cast_vote(id, "For", "alice").await.unwrap();
        let written = Checkpointer::new(store.clone(), &path)
            .checkpoint()
            .await
            .unwrap();
        assert_eq!(written, 1);

        let fresh = new_store().await;
        let outcome = Checkpointer::new(fresh.clone(), &path)
            .restore()
            .await
            .unwrap();
        assert_eq!(outcome, RestoreOutcome::Restored(1));
        assert_eq!(fresh.export_snapshot().await, store.export_snapshot().await);
    }

    #[tokio::test]
    async fn test_restore_without_file() {
        let dir = TempDir::new().unwrap();
        let store = new_store().await;
        let outcome = Checkpointer::new(store, dir.path().join("missing.cbor"))
            .restore()
            .await
            .unwrap();
        assert_eq!(outcome, RestoreOutcome::NoSnapshot);
    }

    #[tokio::test]
    async fn test_restore_skips_non_empty_store() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("snapshot.cbor");

        let old = new_store().await;
        old.create_proposal(request("old"), "agent").await.unwrap();
        Checkpointer::new(old, &path).checkpoint().await.unwrap();

        let live = new_store().await;
        let id = live.create_proposal(request("live"), "agent").await.unwrap();
        let outcome = Checkpointer::new(live.clone(), &path)
            .restore()
            .await
            .unwrap();

        assert_eq!(outcome, RestoreOutcome::StoreNotEmpty);
        assert_eq!(live.get_proposal(id).await.unwrap().title, "live");
    }

    #[tokio::test]
    async fn test_corrupted_snapshot_is_storage_failure() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("snapshot.cbor");

        let store = new_store().await;
        store.create_proposal(request("a"), "agent").await.unwrap();
        Checkpointer::new(store, &path).checkpoint().await.unwrap();

        let mut envelope: SnapshotEnvelope = from_cbor(&std::fs::read(&path).unwrap()).unwrap();
        envelope.payload[0] ^= 0x20;
        std::fs::write(&path, to_cbor(&envelope).unwrap()).unwrap();

        assert!(matches!(
            read_snapshot(&path).await,
            Err(StorageError::Serialization(
                SerializationError::ChecksumMismatch { .. }
            ))
        ));

        let fresh = new_store().await;
        let err = Checkpointer::new(fresh.clone(), &path)
            .restore()
            .await
            .unwrap_err();
        assert!(err.is_storage_failure());
        assert!(fresh.is_empty().await);
    }

    #[tokio::test]
    async fn test_periodic_writes_final_checkpoint_on_shutdown() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("snapshot.cbor");

        let store = new_store().await;
        let checkpointer = Arc::new(Checkpointer::new(store.clone(), &path));
        let (tx, rx) = watch::channel(false);
        let handle = checkpointer.spawn_periodic(Duration::from_secs(3600), rx);

        store.create_proposal(request("late"), "agent").await.unwrap();
        tx.send(true).unwrap();
        handle.await.unwrap();

        let snapshot = read_snapshot(&path).await.unwrap().unwrap();
        assert_eq!(snapshot.entries.len(), 1);
        assert_eq!(snapshot.entries[0].1.title, "late");
    }
}
