//! In-memory storage backend.
//!
//! Used for tests and ephemeral runs. Clones share state, so a test can
//! keep a handle to inspect what the store wrote or to inject failures.

use super::traits::*;
use crate::governance::types::{Proposal, ProposalId};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};

/// In-memory backend.
#[derive(Clone, Default)]
pub struct MemoryBackend {
    state: Arc<Mutex<MemoryState>>,
}

#[derive(Default)]
struct MemoryState {
    records: BTreeMap<ProposalId, Proposal>,
    next_id: Option<ProposalId>,
    fail_writes: bool,
    fail_allocator_writes: bool,
    writes: u64,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent write fail (for exercising storage-failure paths).
    pub fn fail_writes(&self, fail: bool) {
        self.lock().fail_writes = fail;
    }

    /// Make only allocator writes fail; record writes still succeed.
    pub fn fail_allocator_writes(&self, fail: bool) {
        self.lock().fail_allocator_writes = fail;
    }

    /// Number of successful writes so far.
    pub fn write_count(&self) -> u64 {
        self.lock().writes
    }

    /// Number of stored records.
    pub fn len(&self) -> usize {
        self.lock().records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> MutexGuard<'_, MemoryState> {
        // A panic in another test thread must not wedge the backend.
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn check_writable(state: &MemoryState) -> StorageResult<()> {
        if state.fail_writes {
            return Err(StorageError::WriteRejected(
                "memory backend is failing writes".to_string(),
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl StorageBackend for MemoryBackend {
    async fn put(&self, record: &Proposal) -> StorageResult<()> {
        let mut state = self.lock();
        Self::check_writable(&state)?;
        state.records.insert(record.id, record.clone());
        state.writes += 1;
        Ok(())
    }

    async fn export_all(&self) -> StorageResult<Vec<(ProposalId, Proposal)>> {
        Ok(self
            .lock()
            .records
            .iter()
            .map(|(id, p)| (*id, p.clone()))
            .collect())
    }

    async fn import_all(&self, entries: &[(ProposalId, Proposal)]) -> StorageResult<()> {
        let mut state = self.lock();
        Self::check_writable(&state)?;
        for (id, record) in entries {
            state.records.insert(*id, record.clone());
        }
        state.writes += 1;
        Ok(())
    }

    async fn load_next_id(&self) -> StorageResult<Option<ProposalId>> {
        Ok(self.lock().next_id)
    }

    async fn store_next_id(&self, next: ProposalId) -> StorageResult<()> {
        let mut state = self.lock();
        Self::check_writable(&state)?;
        if state.fail_allocator_writes {
            return Err(StorageError::WriteRejected(
                "memory backend is failing allocator writes".to_string(),
            ));
        }
        state.next_id = Some(next);
        state.writes += 1;
        Ok(())
    }
}
