//! Test helpers for scan integration tests.
//!
//! Provides in-process fakes for the feed source, the notification sink and
//! a store wrapper that can inject failures.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Duration, FixedOffset, TimeZone, Utc};
use chrono_tz::Asia::Taipei;
use chrono_tz::Tz;
use tokio::sync::Notify;

use feedbell::store::{NewSubscription, SqliteStore, Subscription, SubscriptionStore, User};
use feedbell::{
    Database, FeedEntry, FeedSource, FeedbellError, Notification, NotificationSink, ParsedFeed,
    Result,
};

/// Zone used by every test.
pub const TZ: Tz = Taipei;

/// A fixed watermark in the past.
pub fn watermark() -> DateTime<Tz> {
    TZ.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap()
}

/// An instant `minutes` away from [`watermark`].
pub fn at(minutes: i64) -> DateTime<Utc> {
    watermark().with_timezone(&Utc) + Duration::minutes(minutes)
}

/// A feed whose entries are published at the given offsets from [`watermark`].
pub fn feed(title: &str, offsets: &[i64]) -> ParsedFeed {
    ParsedFeed {
        title: title.to_string(),
        entries: offsets
            .iter()
            .map(|m| {
                FeedEntry::new(
                    format!("{title} {m}"),
                    format!("https://{}.example.com/{m}", title.to_lowercase()),
                )
                .with_published_at(at(*m))
            })
            .collect(),
    }
}

/// Open an in-memory store seeded with [`watermark`].
pub async fn setup_store() -> Arc<SqliteStore> {
    let db = Database::open_in_memory().await.unwrap();
    let store = Arc::new(SqliteStore::new(db));
    store.bootstrap(watermark().fixed_offset()).await.unwrap();
    store
}

/// Add a subscription, creating the user as needed.
pub async fn subscribe(store: &SqliteStore, user: &str, title: &str, url: &str) -> Subscription {
    store.ensure_user(user).await.unwrap();
    store
        .add_subscription(&NewSubscription::new(user, title, url))
        .await
        .unwrap()
}

/// Feed source backed by a map; unknown URLs fail.
#[derive(Default)]
pub struct FakeFeedSource {
    feeds: Mutex<HashMap<String, ParsedFeed>>,
    fetched: Mutex<Vec<String>>,
}

impl FakeFeedSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_feed(self, url: &str, feed: ParsedFeed) -> Self {
        self.feeds.lock().unwrap().insert(url.to_string(), feed);
        self
    }

    /// URLs fetched so far, in order.
    pub fn fetched(&self) -> Vec<String> {
        self.fetched.lock().unwrap().clone()
    }
}

#[async_trait]
impl FeedSource for FakeFeedSource {
    async fn fetch(&self, url: &str) -> Result<ParsedFeed> {
        self.fetched.lock().unwrap().push(url.to_string());
        self.feeds
            .lock()
            .unwrap()
            .get(url)
            .cloned()
            .ok_or_else(|| FeedbellError::Fetch(format!("connection refused: {url}")))
    }
}

/// Feed source that blocks every fetch until released.
#[derive(Default)]
pub struct GatedFeedSource {
    pub entered: Notify,
    pub release: Notify,
}

#[async_trait]
impl FeedSource for GatedFeedSource {
    async fn fetch(&self, _url: &str) -> Result<ParsedFeed> {
        self.entered.notify_one();
        self.release.notified().await;
        Ok(ParsedFeed {
            title: String::new(),
            entries: Vec::new(),
        })
    }
}

/// Sink that records every notification; listed chats refuse delivery.
#[derive(Default)]
pub struct RecordingSink {
    sent: Mutex<Vec<(String, Notification)>>,
    blocked: HashSet<String>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn blocking(chat_ids: &[&str]) -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            blocked: chat_ids.iter().map(|s| s.to_string()).collect(),
        }
    }

    pub fn sent(&self) -> Vec<(String, Notification)> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl NotificationSink for RecordingSink {
    async fn send(&self, chat_id: &str, notification: &Notification) -> Result<()> {
        if self.blocked.contains(chat_id) {
            return Err(FeedbellError::Delivery(
                "Forbidden: bot was blocked by the user".to_string(),
            ));
        }
        self.sent
            .lock()
            .unwrap()
            .push((chat_id.to_string(), notification.clone()));
        Ok(())
    }
}

/// Failure switches for [`FlakyStore`].
#[derive(Default)]
pub struct Faults {
    pub get_watermark: bool,
    pub list_users: bool,
    pub list_subscriptions_for: Option<String>,
    pub set_watermark: bool,
}

/// Store wrapper that counts watermark writes and injects failures.
pub struct FlakyStore {
    inner: Arc<SqliteStore>,
    faults: Faults,
    watermark_writes: AtomicUsize,
}

impl FlakyStore {
    pub fn new(inner: Arc<SqliteStore>, faults: Faults) -> Self {
        Self {
            inner,
            faults,
            watermark_writes: AtomicUsize::new(0),
        }
    }

    pub fn watermark_writes(&self) -> usize {
        self.watermark_writes.load(Ordering::SeqCst)
    }
}

fn injected() -> FeedbellError {
    FeedbellError::Database("injected failure".to_string())
}

#[async_trait]
impl SubscriptionStore for FlakyStore {
    async fn list_users(&self) -> Result<Vec<User>> {
        if self.faults.list_users {
            return Err(injected());
        }
        self.inner.list_users().await
    }

    async fn ensure_user(&self, user_id: &str) -> Result<()> {
        self.inner.ensure_user(user_id).await
    }

    async fn list_subscriptions(&self, user_id: &str) -> Result<Vec<Subscription>> {
        if self.faults.list_subscriptions_for.as_deref() == Some(user_id) {
            return Err(injected());
        }
        self.inner.list_subscriptions(user_id).await
    }

    async fn add_subscription(&self, new: &NewSubscription) -> Result<Subscription> {
        self.inner.add_subscription(new).await
    }

    async fn remove_subscription(&self, user_id: &str, seq: i64) -> Result<bool> {
        self.inner.remove_subscription(user_id, seq).await
    }

    async fn get_watermark(&self) -> Result<DateTime<FixedOffset>> {
        if self.faults.get_watermark {
            return Err(injected());
        }
        self.inner.get_watermark().await
    }

    async fn set_watermark(&self, at: DateTime<FixedOffset>) -> Result<()> {
        if self.faults.set_watermark {
            return Err(injected());
        }
        self.watermark_writes.fetch_add(1, Ordering::SeqCst);
        self.inner.set_watermark(at).await
    }
}
