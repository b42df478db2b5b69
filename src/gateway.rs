//! Messaging gateway boundary
//!
//! Inbound events and outbound messages as exchanged with a chat front end,
//! plus the adapters that carry them over the wire.

pub mod broadcast;
pub mod telegram;

pub use broadcast::BroadcastSink;
pub use telegram::TelegramClient;

use crate::state_machine::Event;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Telegram API error {method}: {description}")]
    Api { method: String, description: String },
    #[error("Not a Telegram chat id: {0}")]
    InvalidChatId(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InboundKind {
    Text,
    Photo,
}

/// An event received from the user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InboundEvent {
    pub conversation_id: String,
    pub kind: InboundKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_id: Option<String>,
}

impl InboundEvent {
    pub fn text(conversation_id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            conversation_id: conversation_id.into(),
            kind: InboundKind::Text,
            text: Some(text.into()),
            file_id: None,
        }
    }

    pub fn photo(conversation_id: impl Into<String>, file_id: Option<String>) -> Self {
        Self {
            conversation_id: conversation_id.into(),
            kind: InboundKind::Photo,
            text: None,
            file_id,
        }
    }

    /// Convert to a state machine event; text events without text are dropped
    pub fn into_event(self) -> Option<Event> {
        match self.kind {
            InboundKind::Text => self.text.map(Event::from_text),
            InboundKind::Photo => Some(Event::Photo {
                file_id: self.file_id,
            }),
        }
    }
}

/// A prompt or result to show the user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutboundMessage {
    pub conversation_id: String,
    pub text: String,
    /// Options rendered as a pick-list, present only when a selection is expected
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub choices: Option<Vec<String>>,
    /// Text uses Markdown emphasis
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub markdown: bool,
}

impl OutboundMessage {
    pub fn new(conversation_id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            conversation_id: conversation_id.into(),
            text: text.into(),
            choices: None,
            markdown: false,
        }
    }

    pub fn with_choices(mut self, choices: Vec<String>) -> Self {
        self.choices = Some(choices);
        self
    }

    pub fn with_markdown(mut self) -> Self {
        self.markdown = true;
        self
    }
}
