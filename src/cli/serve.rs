//! Long-running JSON-lines service.
//!
//! Reads one [`Request`] per line on stdin and writes one [`Response`] per
//! line on stdout, in order:
//!
//! ```text
//! > {"method":"createProposal","request":{...},"creator":"agent1"}
//! < {"ok":1}
//! > {"method":"getProposal","proposalId":9}
//! < {"err":"Proposal 9 not found"}
//! ```
//!
//! The store is checkpointed on the configured interval and once more on
//! shutdown (EOF on stdin or Ctrl-C).

use super::config::DegovConfig;
use super::proposals::{open_store, CommandResult};
use degov::governance::{Checkpointer, GovernanceService, Request, Response};
use degov::storage::StorageBackend;
use std::sync::Arc;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::watch;
use tracing::{debug, info, warn};

/// Handle one input line. `None` for blank lines.
pub async fn handle_line<B: StorageBackend>(
    service: &GovernanceService<B>,
    line: &str,
) -> Option<Response> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }

    let response = match serde_json::from_str::<Request>(line) {
        Ok(request) => {
            debug!(?request, "request");
            service.dispatch(request).await
        }
        Err(e) => {
            warn!(error = %e, "malformed request");
            Response::Err(format!("Invalid request: {}", e))
        }
    };
    Some(response)
}

/// Serve requests from `reader` until EOF. Returns the number of requests
/// answered.
pub async fn serve_lines<B, R, W>(
    service: &GovernanceService<B>,
    reader: R,
    writer: &mut W,
) -> std::io::Result<usize>
where
    B: StorageBackend,
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut lines = reader.lines();
    let mut answered = 0;

    while let Some(line) = lines.next_line().await? {
        let Some(response) = handle_line(service, &line).await else {
            continue;
        };
        let mut encoded = serde_json::to_string(&response)?;
        encoded.push('\n');
        writer.write_all(encoded.as_bytes()).await?;
        writer.flush().await?;
        answered += 1;
    }

    Ok(answered)
}

/// Run the service on stdin/stdout
pub async fn execute(config: &DegovConfig) -> CommandResult {
    let interval = config.checkpoint.interval()?;
    let store = open_store(config).await?;
    let service = GovernanceService::new(store.clone());
    let checkpointer = Arc::new(Checkpointer::new(store, config.storage.snapshot_path()));

    info!(
        data_dir = %config.storage.data_dir.display(),
        snapshot = %checkpointer.path().display(),
        interval = ?interval,
        "serving requests on stdin"
    );

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let periodic = interval.map(|every| checkpointer.clone().spawn_periodic(every, shutdown_rx));

    let mut stdout = tokio::io::stdout();
    let served = tokio::select! {
        result = serve_lines(&service, BufReader::new(tokio::io::stdin()), &mut stdout) => {
            Some(result?)
        }
        _ = tokio::signal::ctrl_c() => {
            info!("interrupt received");
            None
        }
    };

    // The periodic task writes the final checkpoint when it sees shutdown.
    let _ = shutdown_tx.send(true);
    match periodic {
        Some(handle) => handle.await?,
        None => {
            checkpointer.checkpoint().await?;
        }
    }

    info!(served = ?served, "service stopped");
    Ok(())
}
