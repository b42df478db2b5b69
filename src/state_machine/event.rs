//! Events that can occur in a conversation

/// Events that trigger state transitions
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// Free-form text from the user
    Text { text: String },
    /// The user sent a photo; only its gateway handle is kept
    Photo { file_id: Option<String> },
    /// The `/start` command: begin a fresh request
    Restart,
}

impl Event {
    /// Classify incoming text, recognising the `/start` command
    ///
    /// Accepts the `/start@botname` form Telegram uses in group chats and a
    /// trailing payload, as sent by `t.me/<bot>?start=<payload>` deep links.
    pub fn from_text(text: impl Into<String>) -> Self {
        let text = text.into();
        let command = text.split_whitespace().next().unwrap_or_default();
        let is_start = command == "/start"
            || command
                .strip_prefix("/start@")
                .is_some_and(|bot| !bot.is_empty());

        if is_start {
            Event::Restart
        } else {
            Event::Text { text }
        }
    }

    /// Short name used in logs and error messages
    pub fn kind(&self) -> &'static str {
        match self {
            Event::Text { .. } => "text",
            Event::Photo { .. } => "photo",
            Event::Restart => "restart",
        }
    }
}
