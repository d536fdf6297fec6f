//! Subscription management for feedbell.

pub mod service;

pub use service::{SubscriptionService, DEFAULT_LATEST_ITEMS};
