//! Full-sweep scan over every subscription.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, FixedOffset};
use chrono_tz::Tz;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

use super::diff::new_items_since;
use super::report::{ScanReport, SubscriptionOutcome, SubscriptionResult};
use crate::datetime::now_in;
use crate::feed::FeedSource;
use crate::notify::{Notification, NotificationSink};
use crate::store::{Subscription, SubscriptionStore};
use crate::{FeedbellError, Result};

/// Default bound on a single feed fetch in seconds.
pub const DEFAULT_FETCH_TIMEOUT_SECS: u64 = 30;

/// Runs scans against the store, feed source and notification sink.
///
/// All subscriptions are diffed against the watermark read at the start of
/// the scan. The watermark is written once, after the sweep, and never
/// moves backward.
pub struct ScanCoordinator {
    store: Arc<dyn SubscriptionStore>,
    source: Arc<dyn FeedSource>,
    sink: Arc<dyn NotificationSink>,
    tz: Tz,
    fetch_timeout: Duration,
    running: Mutex<()>,
}

impl ScanCoordinator {
    /// Create a coordinator comparing timestamps in `tz`.
    pub fn new(
        store: Arc<dyn SubscriptionStore>,
        source: Arc<dyn FeedSource>,
        sink: Arc<dyn NotificationSink>,
        tz: Tz,
    ) -> Self {
        Self {
            store,
            source,
            sink,
            tz,
            fetch_timeout: Duration::from_secs(DEFAULT_FETCH_TIMEOUT_SECS),
            running: Mutex::new(()),
        }
    }

    /// Set the per-fetch timeout.
    pub fn with_fetch_timeout(mut self, timeout: Duration) -> Self {
        self.fetch_timeout = timeout;
        self
    }

    /// Run one full scan.
    ///
    /// Fails with [`FeedbellError::ScanInProgress`] if another scan holds
    /// the coordinator. Store failures while reading the watermark or the
    /// user list abort without touching the watermark.
    pub async fn run_scan(&self) -> Result<ScanReport> {
        let _running = self
            .running
            .try_lock()
            .map_err(|_| FeedbellError::ScanInProgress)?;

        let watermark_from = self.store.get_watermark().await?;
        let users = self.store.list_users().await?;
        let watermark = watermark_from.with_timezone(&self.tz);

        info!(
            "Scan started: {} user(s), watermark {}",
            users.len(),
            watermark_from.to_rfc3339()
        );

        let mut results = Vec::new();
        let mut user_failures = Vec::new();

        for user in &users {
            let subscriptions = match self.store.list_subscriptions(&user.id).await {
                Ok(subscriptions) => subscriptions,
                Err(e) => {
                    error!("Failed to list subscriptions for user {}: {}", user.id, e);
                    user_failures.push((user.id.clone(), e.to_string()));
                    continue;
                }
            };

            for sub in &subscriptions {
                let outcome = self.process_subscription(sub, &watermark).await;
                results.push(SubscriptionResult {
                    user_id: sub.user_id.clone(),
                    seq: sub.seq,
                    url: sub.url.clone(),
                    outcome,
                });
            }
        }

        let watermark_to = self.next_watermark(watermark_from);
        self.store.set_watermark(watermark_to).await?;

        let report = ScanReport {
            watermark_from,
            watermark_to,
            users: users.len(),
            user_failures,
            results,
        };

        info!(
            "Scan finished: {} processed, {} notified, {} failed, {} item(s) sent",
            report.processed(),
            report.notified(),
            report.failed(),
            report.items_sent()
        );

        Ok(report)
    }

    /// max(previous, now), so the watermark is monotonic even if the clock
    /// steps back.
    fn next_watermark(&self, previous: DateTime<FixedOffset>) -> DateTime<FixedOffset> {
        let now = now_in(&self.tz).fixed_offset();
        if now > previous {
            now
        } else {
            previous
        }
    }

    async fn process_subscription(
        &self,
        sub: &Subscription,
        watermark: &DateTime<Tz>,
    ) -> SubscriptionOutcome {
        debug!("Checking feed {} for user {}: {}", sub.seq, sub.user_id, sub.url);

        let feed = match tokio::time::timeout(self.fetch_timeout, self.source.fetch(&sub.url)).await
        {
            Ok(Ok(feed)) => feed,
            Ok(Err(e)) => {
                warn!("Failed to fetch {}: {}", sub.url, e);
                return SubscriptionOutcome::FetchFailed(e.to_string());
            }
            Err(_) => {
                warn!(
                    "Fetching {} timed out after {} seconds",
                    sub.url,
                    self.fetch_timeout.as_secs()
                );
                return SubscriptionOutcome::FetchFailed(format!(
                    "timed out after {} seconds",
                    self.fetch_timeout.as_secs()
                ));
            }
        };

        let new_items = new_items_since(&feed.entries, watermark, &self.tz);
        if new_items.is_empty() {
            return SubscriptionOutcome::Unchanged;
        }

        let notification = Notification::for_entries(&sub.title, new_items);
        let items = notification.links.len();

        match self.sink.send(&sub.user_id, &notification).await {
            Ok(()) => {
                info!(
                    "Sent {} new item(s) from {} to user {}",
                    items, sub.url, sub.user_id
                );
                SubscriptionOutcome::Notified { items }
            }
            Err(e) => {
                warn!("Failed to notify user {} about {}: {}", sub.user_id, sub.url, e);
                SubscriptionOutcome::DeliveryFailed(e.to_string())
            }
        }
    }
}
