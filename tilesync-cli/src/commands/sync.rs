//! Sync command - run a single synchronization cycle.

use tilesync::coord::BoundingBox;
use tilesync::sync::{CycleReport, SyncEngine};

use super::common::Workspace;
use crate::error::CliError;

/// Run one cycle, persist the store and print the outcome.
pub fn run(boxes: Vec<BoundingBox>) -> Result<(), CliError> {
    let workspace = Workspace::open(boxes)?;
    if workspace.config.boxes.is_empty() {
        return Err(CliError::Config(
            "No area of interest. Use --box or set area.boxes in config.ini.".to_string(),
        ));
    }

    let engine = SyncEngine::from_config(
        &workspace.config,
        workspace.store.clone(),
        workspace.tokens.clone(),
    )?;

    println!("Synchronizing {} tiles...", engine.area().tiles().len());
    let report = engine.run_cycle();
    workspace.save()?;

    print_report(&report);
    match report.aborted {
        Some(reason) => Err(CliError::CycleAborted(reason)),
        None => Ok(()),
    }
}

/// Print a cycle summary followed by one line per failure.
pub fn print_report(report: &CycleReport) {
    println!("{}", report);
    for failure in &report.failures {
        match failure.kind {
            Some(kind) => println!("  {} {}: {}", failure.tile, kind, failure.reason),
            None => println!("  {} export: {}", failure.tile, failure.reason),
        }
    }
}
