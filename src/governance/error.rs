//! Governance error taxonomy.
//!
//! Business errors (bad input for the current state) are returned to the
//! caller and never mutate a record. Storage failures are the only
//! fatal-class condition and are kept in their own variant so operators
//! can tell "bad input" from "storage failure".

use super::types::ProposalId;
use crate::storage::StorageError;

/// Result type for governance operations.
pub type GovernanceResult<T> = Result<T, GovernanceError>;

#[derive(Debug, thiserror::Error)]
pub enum GovernanceError {
    #[error("Proposal {0} not found")]
    NotFound(ProposalId),

    #[error("Proposal {0} is not active")]
    InactiveProposal(ProposalId),

    #[error("Voting period for proposal {0} has ended")]
    DeadlinePassed(ProposalId),

    #[error("You have already voted on this proposal")]
    DuplicateVoter,

    #[error("Invalid option")]
    InvalidOption,

    #[error("Proposal id space exhausted")]
    IdsExhausted,

    #[error("Storage failure: {0}")]
    Storage(#[from] StorageError),
}

impl GovernanceError {
    /// True for substrate failures, false for rejected input.
    pub fn is_storage_failure(&self) -> bool {
        matches!(self, Self::Storage(_))
    }

    /// Short machine-readable tag.
    pub fn tag(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "NotFound",
            Self::InactiveProposal(_) => "InactiveProposal",
            Self::DeadlinePassed(_) => "DeadlinePassed",
            Self::DuplicateVoter => "DuplicateVoter",
            Self::InvalidOption => "InvalidOption",
            Self::IdsExhausted => "IdsExhausted",
            Self::Storage(_) => "StorageFailure",
        }
    }
}
