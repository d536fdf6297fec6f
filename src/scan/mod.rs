//! Scan module for feedbell.
//!
//! This module finds entries published since the last scan and notifies
//! their subscribers:
//! - Watermark diffing ([`new_items_since`])
//! - Full-sweep scans ([`ScanCoordinator`])
//! - Periodic scheduling ([`ScanScheduler`])

pub mod coordinator;
pub mod diff;
pub mod report;
pub mod scheduler;

pub use coordinator::{ScanCoordinator, DEFAULT_FETCH_TIMEOUT_SECS};
pub use diff::new_items_since;
pub use report::{ScanReport, SubscriptionOutcome, SubscriptionResult};
pub use scheduler::{spawn_scheduler, ScanScheduler, DEFAULT_SCAN_INTERVAL_SECS};
