//! Command execution.

use std::sync::Arc;

use tracing::{error, warn};

use super::command::Command;
use crate::notify::Notification;
use crate::subscription::SubscriptionService;

/// Reply to `/list` when the user has no subscriptions.
pub const MSG_EMPTY_LIST: &str = "Your subscription list is empty";
/// Reply to a successful `/sub`.
pub const MSG_SUBSCRIBED: &str = "Subscribed!";
/// Reply to a failed `/sub`.
pub const MSG_SUBSCRIBE_FAILED: &str =
    "Subscription failed: check the URL is an RSS/Atom feed and not already subscribed";
/// Reply to a successful `/del`.
pub const MSG_REMOVED: &str = "Removed!";
/// Reply to `/del` with an unknown number.
pub const MSG_REMOVE_FAILED: &str = "Error: removal failed";
/// Reply to `/del` with something that is not a number.
pub const MSG_INVALID_NUMBER: &str =
    "Error: please enter the number of the subscription to remove";
/// Reply when the store fails while answering.
pub const MSG_INTERNAL_ERROR: &str = "Error: something went wrong, please try again later";

/// A message to send back to the chat.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    /// Plain text.
    Text(String),
    /// A titled list of links.
    Links(Notification),
}

/// Executes commands on behalf of a chat.
pub struct CommandHandler {
    subscriptions: Arc<SubscriptionService>,
}

impl CommandHandler {
    /// Create a handler backed by the subscription service.
    pub fn new(subscriptions: Arc<SubscriptionService>) -> Self {
        Self { subscriptions }
    }

    /// Run `command` for `chat_id` and return the replies to send.
    pub async fn handle(
        &self,
        chat_id: &str,
        sender_name: Option<&str>,
        command: Command,
    ) -> Vec<Reply> {
        match command {
            Command::Start => vec![Reply::Text(match sender_name {
                Some(name) => format!("Hello {name}"),
                None => "Hello".to_string(),
            })],
            Command::List => match self.subscriptions.list(chat_id).await {
                Ok(subs) if subs.is_empty() => vec![Reply::Text(MSG_EMPTY_LIST.to_string())],
                Ok(subs) => {
                    let lines: Vec<String> = subs
                        .iter()
                        .map(|s| format!("{}.{}", s.seq, s.title))
                        .collect();
                    vec![Reply::Text(lines.join("\n"))]
                }
                Err(e) => {
                    error!("Failed to list subscriptions for {}: {}", chat_id, e);
                    vec![Reply::Text(MSG_INTERNAL_ERROR.to_string())]
                }
            },
            Command::Send => match self.subscriptions.latest(chat_id).await {
                Ok(notifications) => notifications.into_iter().map(Reply::Links).collect(),
                Err(e) => {
                    error!("Failed to collect latest entries for {}: {}", chat_id, e);
                    vec![Reply::Text(MSG_INTERNAL_ERROR.to_string())]
                }
            },
            Command::Subscribe(url) => match self.subscriptions.subscribe(chat_id, &url).await {
                Ok(_) => vec![Reply::Text(MSG_SUBSCRIBED.to_string())],
                Err(e) => {
                    warn!("Subscribe {} for {} failed: {}", url, chat_id, e);
                    vec![Reply::Text(MSG_SUBSCRIBE_FAILED.to_string())]
                }
            },
            Command::Unsubscribe(seq) => match self.subscriptions.unsubscribe(chat_id, seq).await {
                Ok(()) => vec![Reply::Text(MSG_REMOVED.to_string())],
                Err(e) => {
                    warn!("Unsubscribe #{} for {} failed: {}", seq, chat_id, e);
                    vec![Reply::Text(MSG_REMOVE_FAILED.to_string())]
                }
            },
            Command::InvalidNumber => vec![Reply::Text(MSG_INVALID_NUMBER.to_string())],
        }
    }
}
