//! Feed module for feedbell.
//!
//! A [`FeedSource`] turns a URL into a [`ParsedFeed`]. The scan core only
//! depends on the trait; [`HttpFeedSource`] is the production source.

pub mod fetcher;
pub mod types;

use async_trait::async_trait;

use crate::Result;

pub use fetcher::{parse_feed, validate_url, HttpFeedSource};
pub use types::{is_zero_instant, FeedEntry, ParsedFeed, MAX_FEED_SIZE};

/// Capability that fetches and parses a feed.
///
/// Unreachable hosts, HTTP errors and malformed documents must come back as
/// [`FeedbellError::Fetch`](crate::FeedbellError::Fetch), never as a panic.
#[async_trait]
pub trait FeedSource: Send + Sync {
    /// Fetch the feed at `url`.
    async fn fetch(&self, url: &str) -> Result<ParsedFeed>;
}
