//! Telegram long-polling loop.

use std::sync::Arc;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::Duration;
use tracing::{debug, error, info, warn};

use super::command::Command;
use super::handler::{CommandHandler, Reply};
use crate::notify::telegram::Update;
use crate::notify::{NotificationSink, TelegramClient};

/// Wait after a failed `getUpdates` call before retrying.
pub const ERROR_BACKOFF_SECS: u64 = 5;

/// Receives updates and answers commands until shutdown.
pub struct UpdatePoller {
    client: TelegramClient,
    handler: Arc<CommandHandler>,
    poll_timeout_secs: u64,
    offset: Option<i64>,
}

impl UpdatePoller {
    /// Create a poller using long polls of `poll_timeout_secs`.
    pub fn new(client: TelegramClient, handler: Arc<CommandHandler>, poll_timeout_secs: u64) -> Self {
        Self {
            client,
            handler,
            poll_timeout_secs,
            offset: None,
        }
    }

    /// Poll until `shutdown` turns true.
    ///
    /// An outstanding long poll is abandoned on shutdown; a command being
    /// answered is finished first.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) {
        info!(
            "Update poller started (long poll: {} seconds)",
            self.poll_timeout_secs
        );

        loop {
            if *shutdown.borrow() {
                break;
            }

            let polled = tokio::select! {
                result = self.client.get_updates(self.offset, self.poll_timeout_secs) => result,
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                    continue;
                }
            };

            match polled {
                Ok(updates) => {
                    for update in updates {
                        self.offset = Some(next_offset(self.offset, &update));
                        self.dispatch(&update).await;
                    }
                }
                Err(e) => {
                    warn!(
                        "getUpdates failed, retrying in {} seconds: {}",
                        ERROR_BACKOFF_SECS, e
                    );
                    tokio::select! {
                        _ = tokio::time::sleep(Duration::from_secs(ERROR_BACKOFF_SECS)) => {}
                        _ = shutdown.changed() => {}
                    }
                }
            }
        }

        info!("Update poller stopped");
    }

    async fn dispatch(&self, update: &Update) {
        let Some(message) = update.message() else {
            return;
        };
        let Some(command) = message.text.as_deref().and_then(Command::parse) else {
            return;
        };

        let chat_id = message.chat.id.to_string();
        debug!("Chat {} sent {:?}", chat_id, command);

        let sender = message.from.as_ref().map(|s| s.display_name());
        let replies = self
            .handler
            .handle(&chat_id, sender.as_deref(), command)
            .await;

        for reply in replies {
            let sent = match &reply {
                Reply::Text(text) => self.client.send_text(&chat_id, text).await,
                Reply::Links(notification) => self.client.send(&chat_id, notification).await,
            };
            if let Err(e) = sent {
                error!("Failed to reply to chat {}: {}", chat_id, e);
            }
        }
    }
}

/// Offset acknowledging `update` and everything before it.
fn next_offset(current: Option<i64>, update: &Update) -> i64 {
    let next = update.update_id + 1;
    current.map_or(next, |c| c.max(next))
}

/// Start the poller as a background task.
pub fn spawn_poller(poller: UpdatePoller, shutdown: watch::Receiver<bool>) -> JoinHandle<()> {
    tokio::spawn(poller.run(shutdown))
}
