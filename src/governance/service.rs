//! Inbound call surface for the upstream collaborator.
//!
//! Every call returns `Result<_, String>`: success values are plain data or
//! confirmation text, failures are human-readable error text. Nothing here
//! panics or propagates a Rust error type across the boundary.
//!
//! [`Request`] / [`Response`] give the same calls a serde shape so a
//! transport (the CLI's JSON-lines loop, an RPC layer) can forward them
//! without knowing the engine's types.

use super::error::GovernanceError;
use super::store::ProposalStore;
use super::types::{CreateProposalRequest, Proposal, ProposalId, Tally, VoteRequest};
use crate::storage::StorageBackend;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::error;

/// Text-tagged facade over a [`ProposalStore`].
pub struct GovernanceService<B: StorageBackend> {
    store: Arc<ProposalStore<B>>,
}

impl<B: StorageBackend> Clone for GovernanceService<B> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
        }
    }
}

fn to_text(e: GovernanceError) -> String {
    if e.is_storage_failure() {
        error!(error = %e, "storage failure");
    }
    e.to_string()
}

impl<B: StorageBackend> GovernanceService<B> {
    pub fn new(store: Arc<ProposalStore<B>>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<ProposalStore<B>> {
        &self.store
    }

    pub async fn create_proposal(
        &self,
        request: CreateProposalRequest,
        creator_id: &str,
    ) -> Result<ProposalId, String> {
        self.store
            .create_proposal(request, creator_id)
            .await
            .map_err(to_text)
    }

    pub async fn cast_vote(&self, request: VoteRequest) -> Result<String, String> {
        self.store
            .cast_vote(request.proposal_id, &request.option, &request.voter_id)
            .await
            .map(|ack| ack.to_string())
            .map_err(to_text)
    }

    pub async fn get_proposal(&self, proposal_id: ProposalId) -> Result<Proposal, String> {
        self.store.get_proposal(proposal_id).await.map_err(to_text)
    }

    pub async fn get_active_proposals(&self) -> Vec<Proposal> {
        self.store.get_active_proposals().await
    }

    pub async fn get_proposal_results(&self, proposal_id: ProposalId) -> Result<Tally, String> {
        self.store
            .get_proposal_results(proposal_id)
            .await
            .map_err(to_text)
    }

    pub async fn close_proposal(&self, proposal_id: ProposalId) -> Result<String, String> {
        self.store
            .close_proposal(proposal_id)
            .await
            .map(|ack| ack.to_string())
            .map_err(to_text)
    }

    /// Route one serialized request.
    pub async fn dispatch(&self, request: Request) -> Response {
        match request {
            Request::CreateProposal { request, creator } => self
                .create_proposal(request, &creator)
                .await
                .map(ResponseBody::ProposalId)
                .into(),
            Request::CastVote { request } => self
                .cast_vote(request)
                .await
                .map(ResponseBody::Confirmation)
                .into(),
            Request::GetProposal { proposal_id } => self
                .get_proposal(proposal_id)
                .await
                .map(|p| ResponseBody::Proposal(Box::new(p)))
                .into(),
            Request::GetActiveProposals => {
                Response::Ok(ResponseBody::Proposals(self.get_active_proposals().await))
            }
            Request::GetProposalResults { proposal_id } => self
                .get_proposal_results(proposal_id)
                .await
                .map(ResponseBody::Results)
                .into(),
            Request::CloseProposal { proposal_id } => self
                .close_proposal(proposal_id)
                .await
                .map(ResponseBody::Confirmation)
                .into(),
        }
    }
}

/// A serialized inbound call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "method", rename_all = "camelCase")]
pub enum Request {
    CreateProposal {
        request: CreateProposalRequest,
        creator: String,
    },
    CastVote {
        request: VoteRequest,
    },
    #[serde(rename_all = "camelCase")]
    GetProposal {
        proposal_id: ProposalId,
    },
    GetActiveProposals,
    #[serde(rename_all = "camelCase")]
    GetProposalResults {
        proposal_id: ProposalId,
    },
    #[serde(rename_all = "camelCase")]
    CloseProposal {
        proposal_id: ProposalId,
    },
}

/// Serialized result of a call: `{"ok": ...}` or `{"err": "..."}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Response {
    Ok(ResponseBody),
    Err(String),
}

/// Success payloads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ResponseBody {
    ProposalId(ProposalId),
    Confirmation(String),
    Proposal(Box<Proposal>),
    Proposals(Vec<Proposal>),
    Results(Tally),
}

impl From<Result<ResponseBody, String>> for Response {
    fn from(result: Result<ResponseBody, String>) -> Self {
        match result {
            Ok(body) => Response::Ok(body),
            Err(e) => Response::Err(e),
        }
    }
}
