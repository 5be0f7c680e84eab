//! Voting engine: pure validation and transformation of proposal records.
//!
//! Nothing here touches storage or the clock. Callers pass `now` in and
//! write back whatever record comes out. Every transformation returns a
//! fresh record; the input is never mutated, so a rejected vote cannot
//! leave a half-applied record behind.
//!
//! State machine per proposal:
//!
//! | From   | Event        | To     |
//! |--------|--------------|--------|
//! | Active | vote         | Active |
//! | Active | close        | Closed |
//! | Closed | close        | Closed |
//!
//! There is no transition at the deadline. A past-deadline proposal stays
//! `Active` until explicitly closed; it just stops accepting votes.

use super::error::{GovernanceError, GovernanceResult};
use super::types::{
    CreateProposalRequest, Proposal, ProposalId, ProposalStatus, Tally, NANOS_PER_HOUR,
};

/// Build a fresh `Active` proposal.
///
/// Options are taken as given. Duplicate labels each get their own slot
/// and fewer than two options is accepted.
pub fn new_proposal(
    id: ProposalId,
    request: CreateProposalRequest,
    creator: &str,
    now: u64,
) -> Proposal {
    let votes = request
        .options
        .iter()
        .map(|option| (option.clone(), 0))
        .collect();
    let window = request.duration_hours.saturating_mul(NANOS_PER_HOUR);

    Proposal {
        id,
        title: request.title,
        description: request.description,
        options: request.options,
        votes,
        voters: Vec::new(),
        created: now,
        deadline: now.saturating_add(window),
        status: ProposalStatus::Active,
        creator: creator.to_string(),
    }
}

/// Check whether `voter_id` may vote for `option` at `now`.
///
/// Checks run in a fixed order and the first failure wins:
/// status, deadline, duplicate voter, option membership.
/// On success returns the index of the tally slot the vote goes to
/// (the first slot carrying that label).
pub fn validate_vote(
    proposal: &Proposal,
    option: &str,
    voter_id: &str,
    now: u64,
) -> GovernanceResult<usize> {
    if !proposal.is_active() {
        return Err(GovernanceError::InactiveProposal(proposal.id));
    }
    if !proposal.within_deadline(now) {
        return Err(GovernanceError::DeadlinePassed(proposal.id));
    }
    if proposal.has_voted(voter_id) {
        return Err(GovernanceError::DuplicateVoter);
    }
    proposal
        .votes
        .iter()
        .position(|(label, _)| label == option)
        .ok_or(GovernanceError::InvalidOption)
}

/// Return a copy of `proposal` with one vote added to `slot`.
///
/// `slot` must come from [`validate_vote`] on the same record.
pub fn apply_vote(proposal: &Proposal, slot: usize, voter_id: &str) -> Proposal {
    let mut updated = proposal.clone();
    if let Some((_, count)) = updated.votes.get_mut(slot) {
        *count += 1;
        updated.voters.push(voter_id.to_string());
    }
    updated
}

/// Validate then apply in one step.
pub fn cast_vote(
    proposal: &Proposal,
    option: &str,
    voter_id: &str,
    now: u64,
) -> GovernanceResult<Proposal> {
    let slot = validate_vote(proposal, option, voter_id, now)?;
    Ok(apply_vote(proposal, slot, voter_id))
}

/// Return a copy of `proposal` marked `Closed`. Closing twice is a no-op.
pub fn close(proposal: &Proposal) -> Proposal {
    let mut updated = proposal.clone();
    updated.status = ProposalStatus::Closed;
    updated
}

/// Current per-option counts.
pub fn tally(proposal: &Proposal) -> Tally {
    proposal.votes.clone()
}

/// Check the record-level invariants:
/// tally labels equal `options` in order, and counted votes equal voters.
pub fn invariants_hold(proposal: &Proposal) -> bool {
    let labels_match = proposal.votes.len() == proposal.options.len()
        && proposal
            .votes
            .iter()
            .zip(&proposal.options)
            .all(|((label, _), option)| label == option);

    let mut seen = std::collections::HashSet::new();
    let voters_unique = proposal.voters.iter().all(|v| seen.insert(v.as_str()));

    labels_match && voters_unique && proposal.total_votes() == proposal.voters.len() as u64
}
