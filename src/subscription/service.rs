//! Subscription service for feedbell.
//!
//! High-level subscription operations used by the chat bot: subscribing,
//! unsubscribing, listing and previewing the latest entries.

use std::sync::Arc;

use tracing::{info, warn};

use crate::feed::{validate_url, FeedSource};
use crate::notify::Notification;
use crate::store::{NewSubscription, Subscription, SubscriptionStore};
use crate::{FeedbellError, Result};

/// Default number of entries returned per feed by [`SubscriptionService::latest`].
pub const DEFAULT_LATEST_ITEMS: usize = 5;

/// Service for subscription operations.
pub struct SubscriptionService {
    store: Arc<dyn SubscriptionStore>,
    source: Arc<dyn FeedSource>,
    latest_items: usize,
}

impl SubscriptionService {
    /// Create a new SubscriptionService.
    pub fn new(store: Arc<dyn SubscriptionStore>, source: Arc<dyn FeedSource>) -> Self {
        Self {
            store,
            source,
            latest_items: DEFAULT_LATEST_ITEMS,
        }
    }

    /// Set how many entries [`latest`](Self::latest) returns per feed.
    pub fn with_latest_items(mut self, latest_items: usize) -> Self {
        self.latest_items = latest_items;
        self
    }

    /// Subscribe a user to a feed.
    ///
    /// Fetches the feed once to capture its title.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - URL is invalid or points at a private address
    /// - The URL is already subscribed (by anyone)
    /// - The feed cannot be fetched or parsed
    pub async fn subscribe(&self, user_id: &str, url: &str) -> Result<Subscription> {
        let url = url.trim();
        validate_url(url)?;

        self.store.ensure_user(user_id).await?;

        if self
            .store
            .list_subscriptions(user_id)
            .await?
            .iter()
            .any(|s| s.url == url)
        {
            return Err(FeedbellError::Conflict(format!(
                "{url} is already subscribed"
            )));
        }

        let parsed = self.source.fetch(url).await?;

        // Another user holding the URL is caught by the store's unique index.
        let subscription = self
            .store
            .add_subscription(&NewSubscription::new(user_id, parsed.title, url))
            .await?;

        info!(
            "User {} subscribed to {} as #{}",
            user_id, subscription.url, subscription.seq
        );
        Ok(subscription)
    }

    /// Remove a user's subscription by sequence number.
    pub async fn unsubscribe(&self, user_id: &str, seq: i64) -> Result<()> {
        if !self.store.remove_subscription(user_id, seq).await? {
            return Err(FeedbellError::NotFound(format!("subscription #{seq}")));
        }
        info!("User {} unsubscribed #{}", user_id, seq);
        Ok(())
    }

    /// List a user's subscriptions ordered by sequence number.
    pub async fn list(&self, user_id: &str) -> Result<Vec<Subscription>> {
        self.store.list_subscriptions(user_id).await
    }

    /// The first entries of every subscribed feed, one notification per feed.
    ///
    /// Feeds that fail to fetch or have no entries are skipped.
    pub async fn latest(&self, user_id: &str) -> Result<Vec<Notification>> {
        let subscriptions = self.store.list_subscriptions(user_id).await?;
        let mut notifications = Vec::with_capacity(subscriptions.len());

        for sub in &subscriptions {
            match self.source.fetch(&sub.url).await {
                Ok(feed) => {
                    let notification = Notification::for_entries(
                        &sub.title,
                        feed.entries.iter().take(self.latest_items),
                    );
                    if !notification.is_empty() {
                        notifications.push(notification);
                    }
                }
                Err(e) => {
                    warn!("Failed to fetch {} for user {}: {}", sub.url, user_id, e);
                }
            }
        }

        Ok(notifications)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;
    use crate::feed::{FeedEntry, ParsedFeed};
    use crate::store::SqliteStore;
    use async_trait::async_trait;
    use std::collections::HashMap;

    /// Serves canned feeds; unknown URLs fail to fetch.
    struct CannedSource(HashMap<String, ParsedFeed>);

    #[async_trait]
    impl FeedSource for CannedSource {
        async fn fetch(&self, url: &str) -> Result<ParsedFeed> {
            self.0
                .get(url)
                .cloned()
                .ok_or_else(|| FeedbellError::Fetch(format!("no feed at {url}")))
        }
    }

    fn feed(title: &str, entries: usize) -> ParsedFeed {
        ParsedFeed {
            title: title.to_string(),
            entries: (1..=entries)
                .map(|i| FeedEntry::new(format!("{title} {i}"), format!("https://example.com/{i}")))
                .collect(),
        }
    }

    async fn setup() -> (SubscriptionService, Arc<SqliteStore>) {
        let db = Database::open_in_memory().await.unwrap();
        let store = Arc::new(SqliteStore::new(db));
        let mut feeds = HashMap::new();
        feeds.insert("https://a.example.com/feed".to_string(), feed("Alpha", 8));
        feeds.insert("https://b.example.com/feed".to_string(), feed("Beta", 2));
        feeds.insert("https://c.example.com/feed".to_string(), feed("Gamma", 0));
        let service = SubscriptionService::new(store.clone(), Arc::new(CannedSource(feeds)));
        (service, store)
    }

    #[tokio::test]
    async fn test_subscribe_uses_feed_title() {
        let (service, _) = setup().await;

        let sub = service
            .subscribe("42", "https://a.example.com/feed")
            .await
            .unwrap();
        assert_eq!(sub.seq, 1);
        assert_eq!(sub.title, "Alpha");
        assert_eq!(sub.user_id, "42");

        let second = service
            .subscribe("42", " https://b.example.com/feed ")
            .await
            .unwrap();
        assert_eq!(second.seq, 2);
        assert_eq!(second.url, "https://b.example.com/feed");
    }

    #[tokio::test]
    async fn test_subscribe_duplicate_url_conflicts() {
        let (service, store) = setup().await;
        service
            .subscribe("42", "https://a.example.com/feed")
            .await
            .unwrap();

        let same_user = service.subscribe("42", "https://a.example.com/feed").await;
        assert!(matches!(same_user, Err(FeedbellError::Conflict(_))));

        let other_user = service.subscribe("7", "https://a.example.com/feed").await;
        assert!(matches!(other_user, Err(FeedbellError::Conflict(_))));

        assert_eq!(store.count_subscriptions().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_subscribe_rejects_bad_urls() {
        let (service, store) = setup().await;

        assert!(matches!(
            service.subscribe("42", "ftp://a.example.com/feed").await,
            Err(FeedbellError::Validation(_))
        ));
        assert!(matches!(
            service.subscribe("42", "http://127.0.0.1/feed").await,
            Err(FeedbellError::Validation(_))
        ));
        assert!(matches!(
            service.subscribe("42", "https://missing.example.com/feed").await,
            Err(FeedbellError::Fetch(_))
        ));

        assert_eq!(store.count_subscriptions().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_unsubscribe() {
        let (service, _) = setup().await;
        service
            .subscribe("42", "https://a.example.com/feed")
            .await
            .unwrap();

        assert!(matches!(
            service.unsubscribe("42", 9).await,
            Err(FeedbellError::NotFound(_))
        ));
        assert_eq!(service.list("42").await.unwrap().len(), 1);

        service.unsubscribe("42", 1).await.unwrap();
        assert!(service.list("42").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unsubscribe_only_own_subscription() {
        let (service, _) = setup().await;
        service
            .subscribe("42", "https://a.example.com/feed")
            .await
            .unwrap();

        assert!(service.unsubscribe("7", 1).await.is_err());
        assert_eq!(service.list("42").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_latest_limits_and_skips() {
        let (service, store) = setup().await;
        service
            .subscribe("42", "https://a.example.com/feed")
            .await
            .unwrap();
        service
            .subscribe("42", "https://b.example.com/feed")
            .await
            .unwrap();
        service
            .subscribe("42", "https://c.example.com/feed")
            .await
            .unwrap();
        // Stored directly so the fetch fails later.
        store
            .add_subscription(&NewSubscription::new(
                "42",
                "Gone",
                "https://gone.example.com/feed",
            ))
            .await
            .unwrap();

        let latest = service.latest("42").await.unwrap();
        assert_eq!(latest.len(), 2);
        assert_eq!(latest[0].header, "Alpha⚡️");
        assert_eq!(latest[0].links.len(), DEFAULT_LATEST_ITEMS);
        assert_eq!(latest[0].links[0].title, "Alpha 1");
        assert_eq!(latest[1].header, "Beta⚡️");
        assert_eq!(latest[1].links.len(), 2);
    }

    #[tokio::test]
    async fn test_with_latest_items() {
        let (service, _) = setup().await;
        let service = service.with_latest_items(1);
        service
            .subscribe("42", "https://a.example.com/feed")
            .await
            .unwrap();

        let latest = service.latest("42").await.unwrap();
        assert_eq!(latest[0].links.len(), 1);
    }
}
