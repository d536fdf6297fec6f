//! Chat bot front end for feedbell.
//!
//! Parses user commands, runs them through the subscription service and
//! answers via the Telegram client.

pub mod command;
pub mod handler;
pub mod poller;

pub use command::Command;
pub use handler::{CommandHandler, Reply};
pub use poller::{spawn_poller, UpdatePoller};
