//! Chat command parsing.

/// A command sent to the bot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// `/start` or `hello`.
    Start,
    /// `/list`: show the user's subscriptions.
    List,
    /// `/send`: show the latest entries of every subscribed feed.
    Send,
    /// `/sub <url>`.
    Subscribe(String),
    /// `/del <n>`.
    Unsubscribe(i64),
    /// `/del` followed by something that is not a number.
    InvalidNumber,
}

impl Command {
    /// Parse message text into a command.
    ///
    /// Returns `None` for anything the bot does not answer, including
    /// `/sub` and `/del` without an argument. A `@botname` suffix on the
    /// command word is ignored.
    pub fn parse(text: &str) -> Option<Self> {
        let mut words = text.split_whitespace();
        let word = words.next()?;
        let name = word.split_once('@').map_or(word, |(name, _)| name);
        let arg = words.next();

        match (name, arg) {
            ("/start" | "hello", _) => Some(Command::Start),
            ("/list", _) => Some(Command::List),
            ("/send", _) => Some(Command::Send),
            ("/sub", Some(url)) => Some(Command::Subscribe(url.to_string())),
            ("/del", Some(n)) => Some(
                n.parse::<i64>()
                    .map(Command::Unsubscribe)
                    .unwrap_or(Command::InvalidNumber),
            ),
            _ => None,
        }
    }
}
