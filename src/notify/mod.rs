//! Notification delivery for feedbell.

pub mod telegram;

use async_trait::async_trait;

use crate::feed::FeedEntry;
use crate::Result;

pub use telegram::TelegramClient;

/// Marker appended to the feed title in notification headers.
pub const HEADER_SUFFIX: &str = "⚡️";

/// One link in a notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationLink {
    /// Link text.
    pub title: String,
    /// Target URL.
    pub url: String,
}

/// A titled list of links delivered as a single message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    /// Message header.
    pub header: String,
    /// Links in display order.
    pub links: Vec<NotificationLink>,
}

impl Notification {
    /// Build a notification for a feed's entries.
    ///
    /// The header is the feed title followed by [`HEADER_SUFFIX`].
    pub fn for_entries<'a>(
        feed_title: &str,
        entries: impl IntoIterator<Item = &'a FeedEntry>,
    ) -> Self {
        Self {
            header: format!("{feed_title}{HEADER_SUFFIX}"),
            links: entries
                .into_iter()
                .map(|e| NotificationLink {
                    title: e.title.clone(),
                    url: e.link.clone(),
                })
                .collect(),
        }
    }

    /// Whether the notification carries no links.
    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }
}

/// Capability that delivers a notification to a chat.
///
/// Refusals and transport errors come back as
/// [`FeedbellError::Delivery`](crate::FeedbellError::Delivery).
#[async_trait]
pub trait NotificationSink: Send + Sync {
    /// Deliver `notification` to `chat_id`.
    async fn send(&self, chat_id: &str, notification: &Notification) -> Result<()>;
}
