//! Telegram Bot API client.
//!
//! Only the two methods feedbell needs are implemented: `sendMessage`
//! (with an inline keyboard of URL buttons) and `getUpdates`.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{Notification, NotificationSink};
use crate::config::BotConfig;
use crate::{FeedbellError, Result};

/// Timeout for regular API calls in seconds.
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Slack added on top of the long-poll timeout for `getUpdates`.
const POLL_SLACK_SECS: u64 = 10;

/// Envelope every Bot API response is wrapped in.
#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    ok: bool,
    result: Option<T>,
    description: Option<String>,
    error_code: Option<i64>,
}

impl<T> ApiResponse<T> {
    fn into_result(self, method: &str) -> std::result::Result<T, String> {
        match (self.ok, self.result) {
            (true, Some(result)) => Ok(result),
            _ => Err(format!(
                "{} failed ({}): {}",
                method,
                self.error_code.unwrap_or_default(),
                self.description
                    .unwrap_or_else(|| "no description".to_string())
            )),
        }
    }
}

/// An incoming update.
#[derive(Debug, Clone, Deserialize)]
pub struct Update {
    /// Monotonic update identifier.
    pub update_id: i64,
    /// New incoming message.
    pub message: Option<Message>,
    /// Edited message.
    pub edited_message: Option<Message>,
}

impl Update {
    /// The message carried by this update, new or edited.
    pub fn message(&self) -> Option<&Message> {
        self.message.as_ref().or(self.edited_message.as_ref())
    }
}

/// A chat message.
#[derive(Debug, Clone, Deserialize)]
pub struct Message {
    /// Message identifier.
    pub message_id: i64,
    /// Chat the message belongs to.
    pub chat: Chat,
    /// Sender.
    pub from: Option<Sender>,
    /// Text body.
    pub text: Option<String>,
}

/// A chat.
#[derive(Debug, Clone, Deserialize)]
pub struct Chat {
    /// Chat identifier.
    pub id: i64,
}

/// The sender of a message.
#[derive(Debug, Clone, Deserialize)]
pub struct Sender {
    /// First name.
    pub first_name: String,
    /// Last name.
    pub last_name: Option<String>,
}

impl Sender {
    /// Full display name.
    pub fn display_name(&self) -> String {
        match &self.last_name {
            Some(last) if !last.is_empty() => format!("{} {}", self.first_name, last),
            _ => self.first_name.clone(),
        }
    }
}

#[derive(Debug, Serialize)]
struct SendMessage<'a> {
    chat_id: &'a str,
    text: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    reply_markup: Option<InlineKeyboardMarkup<'a>>,
}

#[derive(Debug, Serialize)]
struct InlineKeyboardMarkup<'a> {
    inline_keyboard: Vec<Vec<InlineKeyboardButton<'a>>>,
}

#[derive(Debug, Serialize)]
struct InlineKeyboardButton<'a> {
    text: &'a str,
    url: &'a str,
}

#[derive(Debug, Serialize)]
struct GetUpdates {
    #[serde(skip_serializing_if = "Option::is_none")]
    offset: Option<i64>,
    timeout: u64,
    allowed_updates: [&'static str; 2],
}

/// One URL button per row, in notification order.
fn keyboard_for(notification: &Notification) -> InlineKeyboardMarkup<'_> {
    InlineKeyboardMarkup {
        inline_keyboard: notification
            .links
            .iter()
            .map(|link| {
                vec![InlineKeyboardButton {
                    text: &link.title,
                    url: &link.url,
                }]
            })
            .collect(),
    }
}

/// Client for the Telegram Bot API.
#[derive(Debug, Clone)]
pub struct TelegramClient {
    client: Client,
    base_url: String,
}

impl TelegramClient {
    /// Create a client from the bot configuration.
    pub fn new(config: &BotConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| FeedbellError::Bot(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: format!(
                "{}/bot{}",
                config.api_base.trim_end_matches('/'),
                config.token
            ),
        })
    }

    fn method_url(&self, method: &str) -> String {
        format!("{}/{}", self.base_url, method)
    }

    async fn call<P, R>(
        &self,
        method: &str,
        params: &P,
        timeout: Duration,
    ) -> std::result::Result<R, String>
    where
        P: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let response = self
            .client
            .post(self.method_url(method))
            .timeout(timeout)
            .json(params)
            .send()
            .await
            // The URL carries the bot token.
            .map_err(|e| format!("{} request failed: {}", method, e.without_url()))?;

        let envelope: ApiResponse<R> = response
            .json()
            .await
            .map_err(|e| format!("{} returned an unreadable response: {}", method, e))?;

        envelope.into_result(method)
    }

    /// Send a plain text message.
    pub async fn send_text(&self, chat_id: &str, text: &str) -> Result<()> {
        let payload = SendMessage {
            chat_id,
            text,
            reply_markup: None,
        };
        self.call::<_, serde_json::Value>(
            "sendMessage",
            &payload,
            Duration::from_secs(REQUEST_TIMEOUT_SECS),
        )
        .await
        .map(|_| ())
        .map_err(FeedbellError::Delivery)
    }

    /// Long-poll for updates newer than `offset`.
    pub async fn get_updates(&self, offset: Option<i64>, timeout_secs: u64) -> Result<Vec<Update>> {
        let params = GetUpdates {
            offset,
            timeout: timeout_secs,
            allowed_updates: ["message", "edited_message"],
        };
        self.call(
            "getUpdates",
            &params,
            Duration::from_secs(timeout_secs + POLL_SLACK_SECS),
        )
        .await
        .map_err(FeedbellError::Bot)
    }
}

#[async_trait]
impl NotificationSink for TelegramClient {
    async fn send(&self, chat_id: &str, notification: &Notification) -> Result<()> {
        let payload = SendMessage {
            chat_id,
            text: &notification.header,
            reply_markup: (!notification.is_empty()).then(|| keyboard_for(notification)),
        };
        debug!(
            "Sending {} link(s) to chat {}",
            notification.links.len(),
            chat_id
        );
        self.call::<_, serde_json::Value>(
            "sendMessage",
            &payload,
            Duration::from_secs(REQUEST_TIMEOUT_SECS),
        )
        .await
        .map(|_| ())
        .map_err(FeedbellError::Delivery)
    }
}
