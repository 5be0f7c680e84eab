//! Proposal and voting domain.
//!
//! - [`engine`]: pure state transitions over a single [`Proposal`]
//! - [`store`]: the id-keyed proposal collection over a storage backend
//! - [`checkpoint`]: snapshot files for process replacement
//! - [`service`]: text-tagged call surface for upstream collaborators

pub mod checkpoint;
pub mod clock;
pub mod display;
pub mod engine;
pub mod error;
pub mod service;
pub mod store;
pub mod types;

#[cfg(test)]
mod proptests;

pub use checkpoint::{Checkpointer, RestoreOutcome};
pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{GovernanceError, GovernanceResult};
pub use service::{GovernanceService, Request, Response, ResponseBody};
pub use store::{ProposalStore, StoreSnapshot, SNAPSHOT_SCHEMA_VERSION};
pub use types::{
    Ack, CreateProposalRequest, Proposal, ProposalId, ProposalStatus, Tally, VoteRequest,
};
