//! Proposal records and the request/response shapes of the engine.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Nanoseconds in one hour. Deadlines are `created + duration_hours * NANOS_PER_HOUR`.
pub const NANOS_PER_HOUR: u64 = 3_600 * 1_000_000_000;

/// Proposal identifier. Allocated sequentially from 1, never reused.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct ProposalId(pub u64);

impl ProposalId {
    /// The id handed out on a cold start.
    pub const FIRST: ProposalId = ProposalId(1);

    /// The id that follows this one, or `None` once the id space is used up.
    pub fn next(self) -> Option<ProposalId> {
        self.0.checked_add(1).map(ProposalId)
    }
}

impl fmt::Display for ProposalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Proposal status. `Closed` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProposalStatus {
    Active,
    Closed,
}

impl fmt::Display for ProposalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Active => write!(f, "Active"),
            Self::Closed => write!(f, "Closed"),
        }
    }
}

/// Per-option vote counts, in option order.
///
/// A list of slots rather than a map: duplicate option labels each keep
/// their own slot.
pub type Tally = Vec<(String, u64)>;

/// A governance proposal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Proposal {
    pub id: ProposalId,
    pub title: String,
    pub description: String,
    pub options: Vec<String>,
    /// One slot per entry in `options`, same order.
    pub votes: Tally,
    /// Voter identifiers in arrival order. Membership is the duplicate-vote guard.
    pub voters: Vec<String>,
    /// Creation time, nanoseconds since the UNIX epoch.
    pub created: u64,
    /// Last instant (inclusive) at which a vote is accepted.
    pub deadline: u64,
    pub status: ProposalStatus,
    #[serde(default)]
    pub creator: String,
}

impl Proposal {
    /// Total votes recorded across all slots.
    pub fn total_votes(&self) -> u64 {
        self.votes.iter().map(|(_, count)| *count).sum()
    }

    /// Whether `voter_id` has already voted.
    pub fn has_voted(&self, voter_id: &str) -> bool {
        self.voters.iter().any(|v| v == voter_id)
    }

    pub fn is_active(&self) -> bool {
        self.status == ProposalStatus::Active
    }

    /// Whether the voting window is still open at `now` (ignores status).
    pub fn within_deadline(&self, now: u64) -> bool {
        now <= self.deadline
    }
}

/// Proposal creation request, as produced by the upstream collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateProposalRequest {
    pub title: String,
    pub description: String,
    pub options: Vec<String>,
    pub duration_hours: u64,
}

/// Vote request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteRequest {
    pub proposal_id: ProposalId,
    pub option: String,
    pub voter_id: String,
}

/// Successful mutation acknowledgement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Ack {
    VoteRecorded {
        proposal_id: ProposalId,
        option: String,
    },
    Closed {
        proposal_id: ProposalId,
    },
}

impl fmt::Display for Ack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::VoteRecorded {
                proposal_id,
                option,
            } => write!(
                f,
                "Vote cast successfully for '{}' on proposal {}",
                option, proposal_id
            ),
            Self::Closed { proposal_id } => write!(f, "Proposal {} closed", proposal_id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn proposal() -> Proposal {
        Proposal {
            id: ProposalId(4),
            title: "Budget".to_string(),
            description: "Q3 budget".to_string(),
            options: vec!["For".to_string(), "Against".to_string()],
            votes: vec![("For".to_string(), 2), ("Against".to_string(), 1)],
            voters: vec!["a".to_string(), "b".to_string(), "c".to_string()],
            created: 100,
            deadline: 200,
            status: ProposalStatus::Active,
            creator: "agent1".to_string(),
        }
    }

    #[test]
    fn test_proposal_id_next() {
        assert_eq!(ProposalId::FIRST.next(), Some(ProposalId(2)));
        assert_eq!(ProposalId(u64::MAX - 1).next(), Some(ProposalId(u64::MAX)));
        assert_eq!(ProposalId(u64::MAX).next(), None);
    }

    #[test]
    fn test_proposal_id_serializes_as_plain_integer() {
        let json = serde_json::to_string(&ProposalId(12)).unwrap();
        assert_eq!(json, "12");
    }

    #[test]
    fn test_total_votes_and_membership() {
        let p = proposal();
        assert_eq!(p.total_votes(), 3);
        assert!(p.has_voted("b"));
        assert!(!p.has_voted("d"));
    }

    #[test]
    fn test_deadline_is_inclusive() {
        let p = proposal();
        assert!(p.within_deadline(200));
        assert!(!p.within_deadline(201));
    }

    #[test]
    fn test_ack_display() {
        let ack = Ack::VoteRecorded {
            proposal_id: ProposalId(3),
            option: "For".to_string(),
        };
        assert_eq!(
            ack.to_string(),
            "Vote cast successfully for 'For' on proposal 3"
        );
        assert_eq!(
            Ack::Closed {
                proposal_id: ProposalId(3)
            }
            .to_string(),
            "Proposal 3 closed"
        );
    }

    #[test]
    fn test_vote_request_json_shape() {
        let request: VoteRequest = serde_json::from_str(
            r#"{"proposal_id": 1, "option": "For", "voter_id": "alice"}"#,
        )
        .unwrap();
        assert_eq!(request.proposal_id, ProposalId(1));
        assert_eq!(request.option, "For");
    }
}
