//! feedbell - RSS/Atom notifications for chat
//!
//! Users subscribe to feeds through a Telegram bot. A periodic scan diffs
//! every subscribed feed against a global watermark and delivers the new
//! entries as link lists.

pub mod bot;
pub mod config;
pub mod datetime;
pub mod db;
pub mod error;
pub mod feed;
pub mod logging;
pub mod notify;
pub mod scan;
pub mod store;
pub mod subscription;

pub use bot::{Command, CommandHandler, Reply, UpdatePoller};
pub use config::Config;
pub use db::Database;
pub use error::{FeedbellError, Result};
pub use feed::{FeedEntry, FeedSource, HttpFeedSource, ParsedFeed};
pub use notify::{Notification, NotificationLink, NotificationSink, TelegramClient};
pub use scan::{new_items_since, ScanCoordinator, ScanReport, ScanScheduler, SubscriptionOutcome};
pub use store::{SqliteStore, Subscription, SubscriptionStore, User};
pub use subscription::SubscriptionService;
