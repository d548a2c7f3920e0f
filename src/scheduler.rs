use crate::error::FeederError;
use crate::mastodon::MastodonApi;
use crate::sync::cycle::log_report;
use crate::sync::{CycleReport, ReconciliationCycle};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{error, info, warn};

/// Result of asking the scheduler to start a cycle
pub enum TickOutcome {
    Started(JoinHandle<CycleReport>),
    /// The previous cycle was still running
    Skipped,
}

/// Runs the reconciliation cycle on a fixed period, one at a time
pub struct CycleScheduler<S, T> {
    cycle: Arc<Mutex<ReconciliationCycle<S, T>>>,
    period: Duration,
}

/// Handle to a running scheduler
pub struct SchedulerHandle {
    stop_tx: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl<S, T> CycleScheduler<S, T>
where
    S: MastodonApi + 'static,
    T: MastodonApi + 'static,
{
    pub fn new(cycle: ReconciliationCycle<S, T>, period: Duration) -> Self {
        Self {
            cycle: Arc::new(Mutex::new(cycle)),
            period,
        }
    }

    /// Start a cycle unless one is already in flight
    pub fn trigger(&self) -> TickOutcome {
        match Arc::clone(&self.cycle).try_lock_owned() {
            Ok(mut cycle) => TickOutcome::Started(tokio::spawn(async move {
                let report = cycle.run().await;
                log_report(&report);
                report
            })),
            Err(_) => {
                warn!("Previous reconciliation cycle still running, skipping this tick");
                TickOutcome::Skipped
            }
        }
    }

    /// Spawn the timer loop. The first cycle starts immediately.
    pub fn start(self) -> SchedulerHandle {
        let (stop_tx, mut stop_rx) = watch::channel(false);

        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(self.period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            info!(
                "Reconciliation scheduled every {} seconds",
                self.period.as_secs()
            );

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        // Overlapping ticks are skipped; a started cycle is watched in the background
                        if let TickOutcome::Started(handle) = self.trigger() {
                            tokio::spawn(await_cycle(handle));
                        }
                    }
                    changed = stop_rx.changed() => {
                        if changed.is_err() || *stop_rx.borrow() {
                            break;
                        }
                    }
                }
            }

            info!("Reconciliation scheduler stopped");
        });

        SchedulerHandle { stop_tx, task }
    }
}

/// Wait for a cycle task, logging it if it panicked or was cancelled
pub async fn await_cycle(handle: JoinHandle<CycleReport>) -> Option<CycleReport> {
    match handle.await {
        Ok(report) => Some(report),
        Err(e) => {
            error!("Reconciliation cycle task failed: {}", e);
            None
        }
    }
}

impl SchedulerHandle {
    /// Stop scheduling new cycles. A cycle already running is left to finish.
    pub async fn stop(self) -> Result<(), FeederError> {
        let _ = self.stop_tx.send(true);
        self.task.await?;
        Ok(())
    }
}
