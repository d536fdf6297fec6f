//! Scan results.

use chrono::{DateTime, FixedOffset};

/// What happened to one subscription during a scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubscriptionOutcome {
    /// Fetched; nothing new.
    Unchanged,
    /// Fetched and a notification with `items` links was delivered.
    Notified {
        /// Number of new entries delivered.
        items: usize,
    },
    /// The feed could not be fetched or parsed.
    FetchFailed(String),
    /// New entries were found but delivery failed.
    DeliveryFailed(String),
}

impl SubscriptionOutcome {
    /// Whether this outcome counts as a failure.
    pub fn is_failure(&self) -> bool {
        matches!(
            self,
            SubscriptionOutcome::FetchFailed(_) | SubscriptionOutcome::DeliveryFailed(_)
        )
    }
}

/// Outcome for one subscription, with enough context to log it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscriptionResult {
    /// Owning user's chat identifier.
    pub user_id: String,
    /// Subscription sequence number.
    pub seq: i64,
    /// Feed URL.
    pub url: String,
    /// What happened.
    pub outcome: SubscriptionOutcome,
}

/// Summary of one full scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanReport {
    /// Watermark read at the start of the scan.
    pub watermark_from: DateTime<FixedOffset>,
    /// Watermark committed at the end of the scan.
    pub watermark_to: DateTime<FixedOffset>,
    /// Number of users visited.
    pub users: usize,
    /// Users whose subscriptions could not be listed.
    pub user_failures: Vec<(String, String)>,
    /// Per-subscription results in visiting order.
    pub results: Vec<SubscriptionResult>,
}

impl ScanReport {
    /// Number of subscriptions visited.
    pub fn processed(&self) -> usize {
        self.results.len()
    }

    /// Number of subscriptions that received a notification.
    pub fn notified(&self) -> usize {
        self.results
            .iter()
            .filter(|r| matches!(r.outcome, SubscriptionOutcome::Notified { .. }))
            .count()
    }

    /// Number of subscriptions that failed to fetch or deliver.
    pub fn failed(&self) -> usize {
        self.results.iter().filter(|r| r.outcome.is_failure()).count()
    }

    /// Number of subscriptions processed without failure.
    pub fn succeeded(&self) -> usize {
        self.processed() - self.failed()
    }

    /// Total links delivered.
    pub fn items_sent(&self) -> usize {
        self.results
            .iter()
            .map(|r| match r.outcome {
                SubscriptionOutcome::Notified { items } => items,
                _ => 0,
            })
            .sum()
    }
}
