//! Fixed-interval cycle scheduler
//!
//! Drives repeated execution of the [`Reconciler`]: one cycle immediately at
//! startup, then one cycle per configured interval, or exactly one cycle in
//! run-once mode. Execution is strictly sequential: a cycle always runs to
//! completion before the next sleep begins, so cycles can never overlap and
//! are never cancelled mid-flight.
//!
//! The interval is measured from the end of one cycle to the start of the
//! next, with no drift correction and no jitter. Every cycle outcome,
//! including a reported failure, is non-fatal here; the schedule itself is
//! the only retry mechanism.

use crate::config::SyncConfig;
use crate::error::Result;
use crate::reconcile::{CycleOutcome, Reconciler};
use std::time::Duration;
use tracing::{debug, info};

/// Fixed-interval scheduler around one reconciler
pub struct Scheduler {
    /// The reconciler driven by this scheduler
    reconciler: Reconciler,

    /// Sleep between the end of one cycle and the start of the next
    interval: Duration,

    /// Execute exactly one cycle, then return
    run_once: bool,
}

impl Scheduler {
    /// Create a new scheduler
    pub fn new(reconciler: Reconciler, config: &SyncConfig) -> Self {
        Self {
            reconciler,
            interval: config.interval(),
            run_once: config.run_once,
        }
    }

    /// Run the schedule
    ///
    /// In run-once mode this returns after a single cycle, successful or
    /// not. Otherwise it loops until SIGINT is received between cycles.
    pub async fn run(&self) -> Result<()> {
        self.run_internal(None).await
    }

    /// Internal run implementation that accepts an optional shutdown signal
    ///
    /// # Parameters
    ///
    /// - `shutdown_rx`: optional oneshot receiver to trigger shutdown (for
    ///   testing)
    async fn run_internal(
        &self,
        mut shutdown_rx: Option<tokio::sync::oneshot::Receiver<()>>,
    ) -> Result<()> {
        loop {
            let outcome = self.reconciler.run_cycle().await;
            match &outcome {
                CycleOutcome::Updated(changes) => {
                    debug!(changes = changes.len(), "cycle committed changes")
                }
                CycleOutcome::NoChange => debug!("cycle made no changes"),
                // Already reported at its point of origin; the next tick
                // retries from a fresh comparison.
                CycleOutcome::Failed(e) => debug!("cycle ended early: {}", e),
            }

            if self.run_once {
                info!("run-once mode, exiting after a single cycle");
                return Ok(());
            }

            if let Some(rx) = shutdown_rx.as_mut() {
                // Test mode: wait for provided shutdown signal
                tokio::select! {
                    _ = tokio::time::sleep(self.interval) => {}
                    _ = rx => {
                        info!("shutdown signal received");
                        return Ok(());
                    }
                }
            } else {
                // Production mode: wait for SIGINT
                tokio::select! {
                    _ = tokio::time::sleep(self.interval) => {}
                    _ = tokio::signal::ctrl_c() => {
                        info!("shutdown signal received");
                        return Ok(());
                    }
                }
            }
        }
    }

    /// Test-only helper to run the schedule with a controlled shutdown
    /// signal
    ///
    /// # Visibility
    ///
    /// This is `pub` for testing purposes only. Production code should use
    /// `run()`, which terminates on OS signals rather than programmatic
    /// channels.
    pub async fn run_with_shutdown(
        &self,
        shutdown_rx: Option<tokio::sync::oneshot::Receiver<()>>,
    ) -> Result<()> {
        self.run_internal(shutdown_rx).await
    }
}
