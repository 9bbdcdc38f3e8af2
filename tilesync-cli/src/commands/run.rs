//! Run command - keep synchronizing until interrupted.

use std::sync::Arc;
use std::time::Duration;

use tilesync::coord::BoundingBox;
use tilesync::scheduler::SyncScheduler;
use tilesync::sync::SyncEngine;
use tokio::sync::Notify;
use tracing::{info, warn};

use super::common::Workspace;
use super::sync::print_report;
use crate::error::CliError;

/// How often the command checks for finished cycles to persist.
const POLL_INTERVAL: Duration = Duration::from_secs(2);

/// Start the scheduler and block until Ctrl+C.
///
/// The store is saved after every completed cycle and once more on shutdown.
pub fn run(boxes: Vec<BoundingBox>) -> Result<(), CliError> {
    let workspace = Workspace::open(boxes)?;
    let engine = Arc::new(SyncEngine::from_config(
        &workspace.config,
        workspace.store.clone(),
        workspace.tokens.clone(),
    )?);

    let shutdown = Arc::new(Notify::new());
    let shutdown_signal = shutdown.clone();
    ctrlc::set_handler(move || {
        println!();
        println!("Received shutdown signal, finishing current cycle...");
        shutdown_signal.notify_one();
    })
    .map_err(|e| CliError::Config(format!("Failed to set signal handler: {}", e)))?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;

    runtime.block_on(async move {
        let scheduler = SyncScheduler::start(engine, &workspace.config);
        println!(
            "Synchronizing every {} minutes. Press Ctrl+C to stop.",
            scheduler.interval().as_secs() / 60
        );

        let mut saved_cycles = 0;
        loop {
            tokio::select! {
                _ = shutdown.notified() => break,
                _ = tokio::time::sleep(POLL_INTERVAL) => {}
            }

            let completed = scheduler.cycles_completed();
            if completed == saved_cycles {
                continue;
            }
            saved_cycles = completed;
            if let Some(report) = scheduler.last_report() {
                print_report(&report);
            }
            if let Err(e) = workspace.save() {
                warn!(error = %e, "Failed to persist store");
            }
        }

        scheduler.stop_and_wait().await?;
        workspace.save()?;
        info!("Scheduler stopped");
        println!("Stopped.");
        Ok::<(), CliError>(())
    })
}
