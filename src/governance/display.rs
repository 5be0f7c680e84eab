//! Human-readable rendering of proposals for operator output.

use super::types::{Proposal, ProposalStatus, Tally};

/// Multi-line status block for one proposal.
///
/// ```text
/// 🟢 Proposal #1: Fund marketing
///
/// Results (1 total votes):
///   For: 1 votes
///   Against: 0 votes
///
/// Status: Active
/// ```
pub fn format_proposal(proposal: &Proposal) -> String {
    let marker = match proposal.status {
        ProposalStatus::Active => "🟢",
        ProposalStatus::Closed => "🔴",
    };
    let results: Vec<String> = proposal
        .votes
        .iter()
        .map(|(option, count)| format!("  {}: {} votes", option, count))
        .collect();

    format!(
        "{} Proposal #{}: {}\n\nResults ({} total votes):\n{}\n\nStatus: {}",
        marker,
        proposal.id,
        proposal.title,
        proposal.total_votes(),
        results.join("\n"),
        proposal.status
    )
}

/// One line per proposal, for listings.
pub fn format_proposal_line(proposal: &Proposal) -> String {
    format!(
        "#{}: {} ({} votes)",
        proposal.id,
        proposal.title,
        proposal.total_votes()
    )
}

/// Compact one-line tally: `For: 1, Against: 0`.
pub fn format_tally(tally: &Tally) -> String {
    tally
        .iter()
        .map(|(option, count)| format!("{}: {}", option, count))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Listing of active proposals.
pub fn format_active_list(proposals: &[Proposal]) -> String {
    if proposals.is_empty() {
        return "📝 No active proposals.".to_string();
    }
    let lines: Vec<String> = proposals.iter().map(format_proposal_line).collect();
    format!("📋 Active Proposals:\n\n{}", lines.join("\n"))
}
