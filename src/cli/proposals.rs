//! One-shot proposal commands over the on-disk store.

use super::config::DegovConfig;
use degov::governance::display::{format_active_list, format_proposal, format_tally};
use degov::governance::{
    Checkpointer, CreateProposalRequest, ProposalId, ProposalStore, RestoreOutcome, SystemClock,
};
use degov::storage::FileBackend;
use std::sync::Arc;
use tracing::info;

/// Options offered when none are given
pub const DEFAULT_OPTIONS: [&str; 2] = ["For", "Against"];

/// Default voting window
pub const DEFAULT_DURATION_HOURS: u64 = 72;

pub type CommandResult = Result<(), Box<dyn std::error::Error>>;

/// Open the file-backed store described by `config`.
///
/// With `checkpoint.restore_on_start`, an empty data directory is seeded
/// from the snapshot file.
pub async fn open_store(
    config: &DegovConfig,
) -> Result<Arc<ProposalStore<FileBackend>>, Box<dyn std::error::Error>> {
    let backend = FileBackend::open(&config.storage.data_dir).await?;
    let store = Arc::new(ProposalStore::open(backend, Arc::new(SystemClock)).await?);

    if config.checkpoint.restore_on_start {
        let checkpointer = Checkpointer::new(store.clone(), config.storage.snapshot_path());
        if let RestoreOutcome::Restored(count) = checkpointer.restore().await? {
            info!(count, path = %checkpointer.path().display(), "seeded empty store from snapshot");
        }
    }

    Ok(store)
}

/// Create a proposal and print its id
pub async fn create(
    config: &DegovConfig,
    title: String,
    description: Option<String>,
    options: Vec<String>,
    duration_hours: u64,
    creator: String,
) -> CommandResult {
    let store = open_store(config).await?;

    let options = if options.is_empty() {
        DEFAULT_OPTIONS.iter().map(|o| o.to_string()).collect()
    } else {
        options
    };
    let request = CreateProposalRequest {
        description: description.unwrap_or_else(|| title.clone()),
        title: title.clone(),
        options,
        duration_hours,
    };

    let id = store.create_proposal(request, &creator).await?;

    println!("✅ Proposal #{} created successfully!", id);
    println!();
    println!("Title: {}", title);
    println!("Voting is now open for {} hours.", duration_hours);
    Ok(())
}

/// Cast a vote and print the updated tally
pub async fn vote(
    config: &DegovConfig,
    proposal_id: u64,
    option: String,
    voter: String,
) -> CommandResult {
    let store = open_store(config).await?;
    let id = ProposalId(proposal_id);

    let ack = store.cast_vote(id, &option, &voter).await?;
    let tally = store.get_proposal_results(id).await?;

    println!("✅ {}", ack);
    println!();
    println!("Proposal #{} current results:", id);
    println!("{}", format_tally(&tally));
    Ok(())
}

/// Print one proposal with its results
pub async fn show(config: &DegovConfig, proposal_id: u64) -> CommandResult {
    let store = open_store(config).await?;
    let proposal = store.get_proposal(ProposalId(proposal_id)).await?;

    println!("{}", format_proposal(&proposal));
    if !proposal.description.is_empty() && proposal.description != proposal.title {
        println!();
        println!("{}", proposal.description);
    }
    Ok(())
}

/// List active proposals
pub async fn list(config: &DegovConfig) -> CommandResult {
    let store = open_store(config).await?;
    let active = store.get_active_proposals().await;

    println!("{}", format_active_list(&active));
    Ok(())
}

/// Print the tally as JSON, for scripting
pub async fn results(config: &DegovConfig, proposal_id: u64) -> CommandResult {
    let store = open_store(config).await?;
    let tally = store.get_proposal_results(ProposalId(proposal_id)).await?;

    println!("{}", serde_json::to_string(&tally)?);
    Ok(())
}

/// Close a proposal
pub async fn close(config: &DegovConfig, proposal_id: u64) -> CommandResult {
    let store = open_store(config).await?;
    let ack = store.close_proposal(ProposalId(proposal_id)).await?;

    println!("🔴 {}", ack);
    Ok(())
}
