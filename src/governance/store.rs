//! Proposal store: keyed proposal records, the id allocator, and the
//! export/import upgrade path.
//!
//! ## Concurrency
//!
//! The store is a single logical actor. State lives behind one
//! `tokio::sync::RwLock`:
//!
//! - Mutations (`create_proposal`, `cast_vote`, `close_proposal`,
//!   `import_snapshot`) hold the write lock for the whole
//!   load → validate → persist → publish cycle, including the `.await` on
//!   the backend. At most one mutation is in flight at any time.
//! - Reads take the read lock and hand back clones, so they run
//!   concurrently and see a consistent snapshot.
//!
//! The in-memory index is only updated after the backend acknowledges the
//! record write. A storage failure therefore leaves both the index and the
//! allocator exactly as they were.
//!
//! The record write is the commit point of `create_proposal`. The persisted
//! allocator is a hint written afterwards: if that write fails the proposal
//! still exists, and `open` recovers the allocator from the highest stored
//! id, so an id is never handed out twice.

use super::clock::Clock;
use super::engine;
use super::error::{GovernanceError, GovernanceResult};
use super::types::{Ack, CreateProposalRequest, Proposal, ProposalId, Tally};
use crate::storage::{StorageBackend, StorageError, StorageResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

/// Snapshot schema understood by this build.
pub const SNAPSHOT_SCHEMA_VERSION: u32 = 1;

/// Flat export of the whole store, the unit of the upgrade path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreSnapshot {
    pub next_proposal_id: ProposalId,
    /// Every proposal, ordered by id.
    pub entries: Vec<(ProposalId, Proposal)>,
}

impl StoreSnapshot {
    /// Highest id present, if any.
    pub fn max_id(&self) -> Option<ProposalId> {
        self.entries.iter().map(|(id, _)| *id).max()
    }
}

struct StoreState {
    proposals: BTreeMap<ProposalId, Proposal>,
    next_id: ProposalId,
}

impl StoreState {
    /// Allocator floor: never hand out an id at or below one already stored.
    fn reconcile_next_id(&mut self, candidate: ProposalId) {
        let after_max = self
            .proposals
            .keys()
            .next_back()
            .map(|id| id.next().unwrap_or(*id))
            .unwrap_or(ProposalId::FIRST);
        self.next_id = self.next_id.max(candidate).max(after_max);
    }
}

/// Persistent proposal store.
pub struct ProposalStore<B: StorageBackend> {
    backend: B,
    clock: Arc<dyn Clock>,
    state: RwLock<StoreState>,
}

impl<B: StorageBackend> ProposalStore<B> {
    /// Open the store over `backend`, rebuilding the index from whatever the
    /// backend already holds. An empty backend is a cold start.
    pub async fn open(backend: B, clock: Arc<dyn Clock>) -> StorageResult<Self> {
        let entries = backend.export_all().await?;
        let stored_next = backend.load_next_id().await?;

        let mut proposals = BTreeMap::new();
        for (id, record) in entries {
            if id != record.id {
                return Err(StorageError::Corrupted(format!(
                    "entry {} carries record {}",
                    id, record.id
                )));
            }
            proposals.insert(id, record);
        }

        let mut state = StoreState {
            proposals,
            next_id: ProposalId::FIRST,
        };
        state.reconcile_next_id(stored_next.unwrap_or(ProposalId::FIRST));

        info!(
            proposals = state.proposals.len(),
            next_id = %state.next_id,
            cold_start = stored_next.is_none(),
            "proposal store opened"
        );

        Ok(Self {
            backend,
            clock,
            state: RwLock::new(state),
        })
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Create a proposal and return its id.
    ///
    /// Fails on a storage failure, or with `IdsExhausted` once the last id
    /// has been reached.
    pub async fn create_proposal(
        &self,
        request: CreateProposalRequest,
        creator_id: &str,
    ) -> GovernanceResult<ProposalId> {
        let mut state = self.state.write().await;

        let id = state.next_id;
        let next = id.next().ok_or(GovernanceError::IdsExhausted)?;
        let record = engine::new_proposal(id, request, creator_id, self.clock.now_nanos());

        self.backend.put(&record).await?;

        info!(
            proposal_id = %id,
            creator = %creator_id,
            options = record.options.len(),
            deadline = record.deadline,
            "proposal created"
        );

        state.proposals.insert(id, record);
        state.next_id = next;
        self.persist_next_id(next).await;
        Ok(id)
    }

    /// Record one vote.
    ///
    /// Checks, in order: exists, active, before deadline, new voter, valid
    /// option. The first failure is returned and nothing changes.
    pub async fn cast_vote(
        &self,
        proposal_id: ProposalId,
        option: &str,
        voter_id: &str,
    ) -> GovernanceResult<Ack> {
        let mut state = self.state.write().await;

        let current = state
            .proposals
            .get(&proposal_id)
            .ok_or(GovernanceError::NotFound(proposal_id))?;

        let updated = match engine::cast_vote(current, option, voter_id, self.clock.now_nanos())
        {
            Ok(updated) => updated,
            Err(e) => {
                warn!(
                    proposal_id = %proposal_id,
                    voter = %voter_id,
                    reason = e.tag(),
                    "vote rejected"
                );
                return Err(e);
            }
        };
        debug_assert!(engine::invariants_hold(&updated));

        self.backend.put(&updated).await?;

        info!(proposal_id = %proposal_id, voter = %voter_id, option = %option, "vote recorded");
        state.proposals.insert(proposal_id, updated);

        Ok(Ack::VoteRecorded {
            proposal_id,
            option: option.to_string(),
        })
    }

    /// Mark a proposal `Closed`, whatever its status or deadline.
    ///
    /// No authorization check: access control belongs to the caller.
    pub async fn close_proposal(&self, proposal_id: ProposalId) -> GovernanceResult<Ack> {
        let mut state = self.state.write().await;

        let current = state
            .proposals
            .get(&proposal_id)
            .ok_or(GovernanceError::NotFound(proposal_id))?;
        let updated = engine::close(current);

        self.backend.put(&updated).await?;

        info!(proposal_id = %proposal_id, "proposal closed");
        state.proposals.insert(proposal_id, updated);

        Ok(Ack::Closed { proposal_id })
    }

    /// Snapshot of one proposal.
    pub async fn get_proposal(&self, proposal_id: ProposalId) -> GovernanceResult<Proposal> {
        debug!(proposal_id = %proposal_id, "get_proposal");
        self.state
            .read()
            .await
            .proposals
            .get(&proposal_id)
            .cloned()
            .ok_or(GovernanceError::NotFound(proposal_id))
    }

    /// Every `Active` proposal, ordered by id. Past-deadline proposals that
    /// were never closed are included.
    pub async fn get_active_proposals(&self) -> Vec<Proposal> {
        self.state
            .read()
            .await
            .proposals
            .values()
            .filter(|p| p.is_active())
            .cloned()
            .collect()
    }

    /// Current tally for one proposal.
    pub async fn get_proposal_results(&self, proposal_id: ProposalId) -> GovernanceResult<Tally> {
        self.state
            .read()
            .await
            .proposals
            .get(&proposal_id)
            .map(engine::tally)
            .ok_or(GovernanceError::NotFound(proposal_id))
    }

    /// Number of stored proposals.
    pub async fn len(&self) -> usize {
        self.state.read().await.proposals.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Id the next `create_proposal` will hand out.
    pub async fn next_proposal_id(&self) -> ProposalId {
        self.state.read().await.next_id
    }

    /// Flat, id-ordered export of every record plus the allocator.
    pub async fn export_snapshot(&self) -> StoreSnapshot {
        let state = self.state.read().await;
        StoreSnapshot {
            next_proposal_id: state.next_id,
            entries: state
                .proposals
                .iter()
                .map(|(id, p)| (*id, p.clone()))
                .collect(),
        }
    }

    /// Merge a flat export into the store.
    ///
    /// Entries for ids the store does not hold are added. An entry equal to
    /// the stored record is skipped, so importing the same snapshot twice
    /// changes nothing. An entry that differs from the stored record fails
    /// the whole import with a conflict before anything is written. The
    /// allocator only ever moves forward. Returns the number of records
    /// added.
    pub async fn import_snapshot(&self, snapshot: StoreSnapshot) -> GovernanceResult<usize> {
        let mut state = self.state.write().await;

        let mut fresh: BTreeMap<ProposalId, Proposal> = BTreeMap::new();
        for (id, record) in snapshot.entries {
            if id != record.id {
                return Err(StorageError::Corrupted(format!(
                    "snapshot entry {} carries record {}",
                    id, record.id
                ))
                .into());
            }

            let matches_known = state
                .proposals
                .get(&id)
                .or_else(|| fresh.get(&id))
                .map(|known| *known == record);
            match matches_known {
                Some(true) => continue,
                Some(false) => {
                    warn!(proposal_id = %id, "snapshot entry conflicts with stored record");
                    return Err(StorageError::Conflict(format!(
                        "snapshot entry {} differs from the stored record",
                        id
                    ))
                    .into());
                }
                None => {
                    fresh.insert(id, record);
                }
            }
        }

        let fresh: Vec<(ProposalId, Proposal)> = fresh.into_iter().collect();
        if !fresh.is_empty() {
            self.backend.import_all(&fresh).await?;
        }

        let imported = fresh.len();
        for (id, record) in fresh {
            state.proposals.insert(id, record);
        }
        state.reconcile_next_id(snapshot.next_proposal_id);
        let next = state.next_id;
        self.persist_next_id(next).await;

        info!(imported, next_id = %next, "snapshot imported");
        Ok(imported)
    }

    /// Best-effort allocator write. The stored records stay authoritative.
    async fn persist_next_id(&self, next: ProposalId) {
        if let Err(e) = self.backend.store_next_id(next).await {
            warn!(next_id = %next, error = %e, "failed to persist allocator");
        }
    }
}
