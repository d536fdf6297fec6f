//! Periodic scan scheduler for feedbell.
//!
//! This module provides the background task that runs a full scan at a
//! fixed interval until shutdown is signalled.

use std::sync::Arc;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval, Duration, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use super::coordinator::ScanCoordinator;
use crate::FeedbellError;

/// Default scan interval in seconds (30 minutes).
pub const DEFAULT_SCAN_INTERVAL_SECS: u64 = 1800;

/// Scan scheduler.
///
/// Runs one scan immediately, then one per interval. Ticks missed while a
/// scan was running are skipped rather than bunched up.
pub struct ScanScheduler {
    coordinator: Arc<ScanCoordinator>,
    scan_interval: Duration,
}

impl ScanScheduler {
    /// Create a new ScanScheduler with the default interval.
    pub fn new(coordinator: Arc<ScanCoordinator>) -> Self {
        Self {
            coordinator,
            scan_interval: Duration::from_secs(DEFAULT_SCAN_INTERVAL_SECS),
        }
    }

    /// Create a new ScanScheduler with a custom interval.
    pub fn with_interval(coordinator: Arc<ScanCoordinator>, interval_secs: u64) -> Self {
        Self {
            coordinator,
            scan_interval: Duration::from_secs(interval_secs),
        }
    }

    /// Run the scheduler loop until `shutdown` turns true.
    ///
    /// Shutdown is only observed between scans; a scan in flight runs to
    /// completion.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        info!(
            "Scan scheduler started (interval: {} seconds)",
            self.scan_interval.as_secs()
        );

        let mut timer = interval(self.scan_interval);
        timer.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            if *shutdown.borrow() {
                break;
            }

            tokio::select! {
                _ = timer.tick() => self.tick().await,
                changed = shutdown.changed() => {
                    // A dropped sender also means stop.
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }

        info!("Scan scheduler stopped");
    }

    async fn tick(&self) {
        debug!("Scheduled scan starting");

        match self.coordinator.run_scan().await {
            Ok(report) => {
                for (user_id, reason) in &report.user_failures {
                    warn!("User {} skipped: {}", user_id, reason);
                }
                if report.failed() > 0 {
                    warn!(
                        "{} of {} subscription(s) failed this scan",
                        report.failed(),
                        report.processed()
                    );
                }
            }
            Err(FeedbellError::ScanInProgress) => {
                warn!("Previous scan still running, skipping this tick");
            }
            Err(e) => {
                error!("Scan failed: {}", e);
            }
        }
    }
}

/// Start the scheduler as a background task.
pub fn spawn_scheduler(
    coordinator: Arc<ScanCoordinator>,
    interval_secs: u64,
    shutdown: watch::Receiver<bool>,
) -> JoinHandle<()> {
    let scheduler = ScanScheduler::with_interval(coordinator, interval_secs);
    tokio::spawn(async move {
        scheduler.run(shutdown).await;
    })
}
