//! Recurring synchronization task.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::config::SyncConfig;
use crate::error::{SyncError, SyncResult};
use crate::sync::{CycleReport, SyncEngine};

/// State shared between the scheduler handle and its task.
#[derive(Default)]
struct SchedulerState {
    cycles: AtomicU64,
    last_report: Mutex<Option<CycleReport>>,
}

/// Runs [`SyncEngine::run_cycle`] on a fixed interval.
///
/// Each cycle runs on Tokio's blocking pool and the next wait only starts
/// once it has finished, so two cycles never overlap. The interval is
/// measured from the end of one cycle to the start of the next.
pub struct SyncScheduler {
    cancellation: CancellationToken,
    wake: Arc<Notify>,
    state: Arc<SchedulerState>,
    handle: Option<JoinHandle<()>>,
    interval: Duration,
}

impl SyncScheduler {
    /// Start the recurring task. The first cycle runs immediately.
    ///
    /// Must be called from within a Tokio runtime. The interval is
    /// `config.effective_interval()`.
    pub fn start(engine: Arc<SyncEngine>, config: &SyncConfig) -> Self {
        let interval = config.effective_interval();
        let cancellation = CancellationToken::new();
        let wake = Arc::new(Notify::new());
        let state = Arc::new(SchedulerState::default());

        let handle = tokio::spawn(run_loop(
            engine,
            interval,
            cancellation.clone(),
            wake.clone(),
            state.clone(),
        ));

        Self {
            cancellation,
            wake,
            state,
            handle: Some(handle),
            interval,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Run the next cycle now instead of waiting out the interval.
    ///
    /// A trigger during a running cycle starts another one right after it.
    pub fn trigger(&self) {
        self.wake.notify_one();
    }

    /// Prevent further cycles. A cycle already running is left to finish.
    pub fn stop(&self) {
        self.cancellation.cancel();
    }

    /// Stop and wait for a running cycle to finish.
    pub async fn stop_and_wait(mut self) -> SyncResult<()> {
        self.stop();
        match self.handle.take() {
            Some(handle) => handle.await.map_err(|e| SyncError::Task(e.to_string())),
            None => Ok(()),
        }
    }

    pub fn is_stopped(&self) -> bool {
        self.cancellation.is_cancelled()
    }

    /// Number of cycles completed so far.
    pub fn cycles_completed(&self) -> u64 {
        self.state.cycles.load(Ordering::Acquire)
    }

    /// Report of the most recent completed cycle.
    pub fn last_report(&self) -> Option<CycleReport> {
        self.state.last_report.lock().clone()
    }
}

impl Drop for SyncScheduler {
    fn drop(&mut self) {
        self.cancellation.cancel();
    }
}

async fn run_loop(
    engine: Arc<SyncEngine>,
    interval: Duration,
    cancellation: CancellationToken,
    wake: Arc<Notify>,
    state: Arc<SchedulerState>,
) {
    info!(interval_secs = interval.as_secs(), "Sync scheduler started");

    while !cancellation.is_cancelled() {
        let cycle_engine = engine.clone();
        match tokio::task::spawn_blocking(move || cycle_engine.run_cycle()).await {
            Ok(report) => {
                debug!(report = %report, "Cycle finished");
                *state.last_report.lock() = Some(report);
                state.cycles.fetch_add(1, Ordering::AcqRel);
            }
            Err(e) => error!(error = %e, "Sync cycle task failed"),
        }

        tokio::select! {
            biased;

            _ = cancellation.cancelled() => break,
            _ = wake.notified() => debug!("Sync triggered"),
            _ = tokio::time::sleep(interval) => {}
        }
    }

    info!("Sync scheduler stopped");
}
