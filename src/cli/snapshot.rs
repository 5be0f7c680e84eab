//! Export and import of sealed store snapshots.
//!
//! `export` writes the same envelope format as periodic checkpoints, so an
//! exported file can also serve as `storage.snapshot_path` for a fresh
//! deployment.

use super::config::DegovConfig;
use super::proposals::{open_store, CommandResult};
use degov::governance::checkpoint::{read_snapshot, write_snapshot};
use std::path::PathBuf;

/// Write every proposal and the allocator to `output`
pub async fn export(config: &DegovConfig, output: PathBuf) -> CommandResult {
    let store = open_store(config).await?;
    let snapshot = store.export_snapshot().await;

    write_snapshot(&output, &snapshot).await?;

    println!(
        "📦 Exported {} proposals to {}",
        snapshot.entries.len(),
        output.display()
    );
    println!("   Next proposal id: {}", snapshot.next_proposal_id);
    Ok(())
}

/// Load a snapshot into the store. New ids are added, identical records are
/// skipped, and a record that differs from the stored one refuses the whole
/// import. The allocator only moves forward.
pub async fn import(config: &DegovConfig, input: PathBuf) -> CommandResult {
    let snapshot = read_snapshot(&input)
        .await?
        .ok_or_else(|| format!("Snapshot file '{}' not found", input.display()))?;

    let store = open_store(config).await?;
    let imported = store.import_snapshot(snapshot).await?;

    println!("📥 Imported {} proposals from {}", imported, input.display());
    println!("   Next proposal id: {}", store.next_proposal_id().await);
    Ok(())
}
