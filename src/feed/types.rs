//! Feed types for feedbell.

use chrono::{DateTime, Utc};
use chrono_tz::Tz;

/// Maximum feed size in bytes (5MB).
pub const MAX_FEED_SIZE: u64 = 5 * 1024 * 1024;

/// Title used when a feed carries none.
pub const UNTITLED_FEED: &str = "Untitled Feed";

/// Title used when an entry carries none.
pub const UNTITLED_ENTRY: &str = "Untitled";

/// Parsed feed data from a feed source.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedFeed {
    /// Feed title.
    pub title: String,
    /// Entries in document order.
    pub entries: Vec<FeedEntry>,
}

/// A single feed entry. Never persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct FeedEntry {
    /// Entry title.
    pub title: String,
    /// Canonical link to the article.
    pub link: String,
    /// When the entry was published.
    pub published_at: Option<DateTime<Utc>>,
    /// When the entry was last updated.
    pub updated_at: Option<DateTime<Utc>>,
}

impl FeedEntry {
    /// Create an entry without timestamps.
    pub fn new(title: impl Into<String>, link: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            link: link.into(),
            published_at: None,
            updated_at: None,
        }
    }

    /// Set the published time.
    pub fn with_published_at(mut self, published_at: DateTime<Utc>) -> Self {
        self.published_at = Some(published_at);
        self
    }

    /// Set the last-updated time.
    pub fn with_updated_at(mut self, updated_at: DateTime<Utc>) -> Self {
        self.updated_at = Some(updated_at);
        self
    }

    /// The timestamp compared against the watermark, in `tz`.
    ///
    /// Published time wins unless it is missing or the zero sentinel, in
    /// which case the last-updated time is used. `None` when neither is
    /// usable.
    pub fn effective_timestamp(&self, tz: &Tz) -> Option<DateTime<Tz>> {
        self.published_at
            .filter(|t| !is_zero_instant(t))
            .or(self.updated_at.filter(|t| !is_zero_instant(t)))
            .map(|t| t.with_timezone(tz))
    }
}

/// Whether a timestamp is the "unset" placeholder some feeds emit.
///
/// Only the Unix epoch itself and the minimum representable instant count;
/// real dates before 1970 are kept.
pub fn is_zero_instant(t: &DateTime<Utc>) -> bool {
    t.timestamp() == 0 || *t == DateTime::<Utc>::MIN_UTC
}
