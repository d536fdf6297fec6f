//! Store types for feedbell.

use chrono::{DateTime, Utc};

/// A chat user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    /// Chat identifier; notifications are addressed to it.
    pub id: String,
    /// When the user first subscribed.
    pub created_at: DateTime<Utc>,
}

/// A feed subscription owned by one user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subscription {
    /// Row ID.
    pub id: i64,
    /// Owning user's chat identifier.
    pub user_id: String,
    /// Per-user handle shown in `/list` and used by `/del`.
    pub seq: i64,
    /// Feed title captured when the subscription was made.
    pub title: String,
    /// Feed URL, unique across the store.
    pub url: String,
    /// When the subscription was created.
    pub created_at: DateTime<Utc>,
}

/// New subscription for creation.
///
/// The store assigns the sequence number.
#[derive(Debug, Clone)]
pub struct NewSubscription {
    /// Owning user's chat identifier.
    pub user_id: String,
    /// Feed title.
    pub title: String,
    /// Feed URL.
    pub url: String,
}

impl NewSubscription {
    /// Create a new subscription request.
    pub fn new(
        user_id: impl Into<String>,
        title: impl Into<String>,
        url: impl Into<String>,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            title: title.into(),
            url: url.into(),
        }
    }
}
