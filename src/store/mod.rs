//! Subscription store for feedbell.
//!
//! The scan core talks to persistence only through [`SubscriptionStore`].
//! [`SqliteStore`] is the sqlx-backed implementation.

pub mod repository;
pub mod types;

use async_trait::async_trait;
use chrono::{DateTime, FixedOffset};

use crate::Result;

pub use repository::SqliteStore;
pub use types::{NewSubscription, Subscription, User};

/// Capability store for users, subscriptions and the global watermark.
///
/// Each operation is a single statement and therefore atomic on its own.
#[async_trait]
pub trait SubscriptionStore: Send + Sync {
    /// List every user, in creation order.
    async fn list_users(&self) -> Result<Vec<User>>;

    /// Create the user if it does not exist yet.
    async fn ensure_user(&self, user_id: &str) -> Result<()>;

    /// List a user's subscriptions ordered by sequence number.
    async fn list_subscriptions(&self, user_id: &str) -> Result<Vec<Subscription>>;

    /// Store a subscription and assign it the user's next sequence number.
    ///
    /// A URL that is already stored (for any user) fails with
    /// [`FeedbellError::Conflict`](crate::FeedbellError::Conflict).
    async fn add_subscription(&self, new: &NewSubscription) -> Result<Subscription>;

    /// Delete a subscription by `(user_id, seq)`.
    ///
    /// Returns false when no such subscription exists.
    async fn remove_subscription(&self, user_id: &str, seq: i64) -> Result<bool>;

    /// Read the global watermark.
    async fn get_watermark(&self) -> Result<DateTime<FixedOffset>>;

    /// Overwrite the global watermark.
    async fn set_watermark(&self, at: DateTime<FixedOffset>) -> Result<()>;
}
