//! Property-based tests for the voting engine and proposal store.
//!
//! Tests for:
//! - Allocation: ids strictly increasing, no gaps
//! - Tally: slot labels follow options, sum of counts equals voter count
//! - Duplicate voters never counted twice
//! - Closed and expired proposals never accept votes
//! - Export/import leaves every read unchanged

use super::clock::ManualClock;
use super::engine::{self, invariants_hold};
use super::error::GovernanceError;
use super::store::ProposalStore;
use super::types::{CreateProposalRequest, ProposalId, NANOS_PER_HOUR};
use crate::storage::MemoryBackend;
use proptest::prelude::*;
use std::collections::HashSet;
use std::sync::Arc;

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap()
}

fn option_labels() -> impl Strategy<Value = Vec<String>> {
    // Small alphabet so duplicate labels show up.
    prop::collection::vec(prop::sample::select(vec!["For", "Against", "Abstain", "Yes"]), 0..6)
        .prop_map(|v| v.into_iter().map(String::from).collect())
}

/// (option index, voter index) pairs; indexes are reduced modulo the pool.
fn vote_script() -> impl Strategy<Value = Vec<(usize, usize)>> {
    prop::collection::vec((0usize..8, 0usize..6), 0..40)
}

fn request(options: Vec<String>, hours: u64) -> CreateProposalRequest {
    CreateProposalRequest {
        title: "prop".to_string(),
        description: String::new(),
        options,
        duration_hours: hours,
    }
}

// ============================================================================
// ENGINE PROPERTIES
// ============================================================================

proptest! {
    /// Property: tally invariants hold after any vote sequence
    #[test]
    fn tally_matches_voters_after_any_votes(
        options in option_labels(),
        script in vote_script(),
    ) {
        let mut proposal = engine::new_proposal(ProposalId(1), request(options.clone(), 1), "c", 0);

        for (option_idx, voter_idx) in script {
            let option = options
                .get(option_idx % options.len().max(1))
                .cloned()
                .unwrap_or_else(|| "missing".to_string());
            let voter = format!("voter{}", voter_idx);
            if let Ok(updated) = engine::cast_vote(&proposal, &option, &voter, 0) {
                proposal = updated;
            }
            prop_assert!(invariants_hold(&proposal));
        }

        let tally = engine::tally(&proposal);
        let labels: Vec<&String> = tally.iter().map(|(l, _)| l).collect();
        let expected: Vec<&String> = options.iter().collect();
        prop_assert_eq!(labels, expected);
        prop_assert_eq!(proposal.total_votes(), proposal.voters.len() as u64);
    }

    /// Property: a voter is counted at most once
    #[test]
    fn voter_counted_at_most_once(script in vote_script()) {
        let options = vec!["For".to_string(), "Against".to_string()];
        let mut proposal = engine::new_proposal(ProposalId(1), request(options.clone(), 1), "c", 0);

        for (option_idx, voter_idx) in script {
            let voter = format!("voter{}", voter_idx);
            let already = proposal.has_voted(&voter);
            match engine::cast_vote(&proposal, &options[option_idx % 2], &voter, 0) {
                Ok(updated) => {
                    prop_assert!(!already);
                    proposal = updated;
                }
                Err(e) => {
                    prop_assert!(already);
                    prop_assert!(matches!(e, GovernanceError::DuplicateVoter));
                }
            }
        }

        let unique: HashSet<&String> = proposal.voters.iter().collect();
        prop_assert_eq!(unique.len(), proposal.voters.len());
    }

    /// Property: closed proposals reject every vote with InactiveProposal
    #[test]
    fn closed_rejects_everything(
        options in option_labels(),
        voter in "[a-z]{1,8}",
        now in any::<u64>(),
    ) {
        let proposal = engine::close(&engine::new_proposal(ProposalId(3), request(options.clone(), 1), "c", 0));
        let option = options.first().cloned().unwrap_or_default();
        let result = engine::cast_vote(&proposal, &option, &voter, now);
        prop_assert!(matches!(result, Err(GovernanceError::InactiveProposal(ProposalId(3)))));
    }

    /// Property: past the deadline every vote fails with DeadlinePassed
    #[test]
    fn expired_rejects_with_deadline_passed(
        hours in 0u64..1_000,
        overshoot in 1u64..1_000_000,
        voter in "[a-z]{1,8}",
    ) {
        let created = 1_000u64;
        let proposal = engine::new_proposal(
            ProposalId(1),
            request(vec!["For".to_string(), "Against".to_string()], hours),
            "c",
            created,
        );
        let now = created + hours * NANOS_PER_HOUR + overshoot;
        let result = engine::cast_vote(&proposal, "For", &voter, now);
        prop_assert!(matches!(result, Err(GovernanceError::DeadlinePassed(_))));
        prop_assert!(proposal.is_active());
    }
}

// ============================================================================
// STORE PROPERTIES
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Property: ids are 1..=n in creation order
    #[test]
    fn ids_strictly_increasing_without_gaps(count in 1usize..30) {
        let rt = runtime();
        let ids = rt.block_on(async {
            let store = ProposalStore::open(MemoryBackend::new(), Arc::new(ManualClock::new(0)))
                .await
                .unwrap();
            let mut ids = Vec::new();
            for _ in 0..count {
                ids.push(
                    store
                        .create_proposal(request(vec!["a".into(), "b".into()], 1), "c")
                        .await
                        .unwrap(),
                );
            }
            ids
        });

        let expected: Vec<ProposalId> = (1..=count as u64).map(ProposalId).collect();
        prop_assert_eq!(ids, expected);
    }

    /// Property: export then import preserves every read
    #[test]
    fn export_import_preserves_reads(
        proposals in prop::collection::vec((option_labels(), vote_script(), any::<bool>()), 1..6),
    ) {
        let rt = runtime();
        let (before, after) = rt.block_on(async {
            let clock = Arc::new(ManualClock::new(0));
            let store = ProposalStore::open(MemoryBackend::new(), clock.clone()).await.unwrap();

            for (options, script, closed) in &proposals {
                let id = store.create_proposal(request(options.clone(), 1), "c").await.unwrap();
                for (option_idx, voter_idx) in script {
                    let option = options
                        .get(option_idx % options.len().max(1))
                        .cloned()
                        .unwrap_or_default();
                    let _ = store.cast_vote(id, &option, &format!("v{}", voter_idx)).await;
                }
                if *closed {
                    store.close_proposal(id).await.unwrap();
                }
            }

            let snapshot = store.export_snapshot().await;
            let restored = ProposalStore::open(MemoryBackend::new(), clock).await.unwrap();
            restored.import_snapshot(snapshot.clone()).await.unwrap();
            restored.import_snapshot(snapshot).await.unwrap();

            let mut before = Vec::new();
            let mut after = Vec::new();
            for id in 1..=proposals.len() as u64 {
                let id = ProposalId(id);
                before.push((
                    store.get_proposal(id).await.unwrap(),
                    store.get_proposal_results(id).await.unwrap(),
                ));
                after.push((
                    restored.get_proposal(id).await.unwrap(),
                    restored.get_proposal_results(id).await.unwrap(),
                ));
            }

            let active_before = store.get_active_proposals().await;
            let active_after = restored.get_active_proposals().await;
            assert_eq!(active_before, active_after);
            assert_eq!(store.next_proposal_id().await, restored.next_proposal_id().await);

            (before, after)
        });

        prop_assert_eq!(before, after);
    }
}
