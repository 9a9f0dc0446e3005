//! Operator command parsing

/// Commands the relay understands
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// `/store <text>`: buffer `text` verbatim (may be empty)
    Store(String),
    /// `/restore`: drop everything buffered
    Restore,
}

impl Command {
    /// Parse a message text as a command.
    ///
    /// Accepts the `/cmd@bot_name` form Telegram uses when several bots share a
    /// chat. Returns `None` for plain text and for commands the relay does not
    /// handle, which are buffered like any other text.
    pub fn parse(text: &str) -> Option<Self> {
        let text = text.trim_start();
        let rest = text.strip_prefix('/')?;

        let (head, args) = match rest.find(char::is_whitespace) {
            Some(idx) => (&rest[..idx], &rest[idx..]),
            None => (rest, ""),
        };
        let name = head.split('@').next().unwrap_or(head);

        match name {
            "store" => Some(Command::Store(args.to_string())),
            "restore" => Some(Command::Restore),
            _ => None,
        }
    }
}
