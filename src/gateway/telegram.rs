//! Telegram Bot API adapter
//!
//! Long-polls `getUpdates` for inbound messages and sends replies with
//! `sendMessage`. Choices are rendered as a one-time reply keyboard.

use super::{GatewayError, InboundEvent, OutboundMessage};
use crate::runtime::{MessageSink, RouteError, RuntimeManager};
use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

pub const DEFAULT_API_BASE: &str = "https://api.telegram.org";

const MAX_BACKOFF: Duration = Duration::from_secs(30);

// ============================================================================
// Wire types
// ============================================================================

#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    ok: bool,
    result: Option<T>,
    description: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Update {
    pub update_id: i64,
    pub message: Option<Message>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Message {
    pub chat: Chat,
    pub text: Option<String>,
    pub photo: Option<Vec<PhotoSize>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Chat {
    pub id: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PhotoSize {
    pub file_id: String,
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Serialize)]
struct GetUpdatesRequest {
    offset: i64,
    timeout: u64,
    allowed_updates: [&'static str; 1],
}

#[derive(Debug, Serialize)]
struct SendMessageRequest<'a> {
    chat_id: i64,
    text: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    parse_mode: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    reply_markup: Option<ReplyKeyboardMarkup>,
}

#[derive(Debug, Serialize)]
struct ReplyKeyboardMarkup {
    keyboard: Vec<Vec<KeyboardButton>>,
    resize_keyboard: bool,
    one_time_keyboard: bool,
}

#[derive(Debug, Serialize)]
struct KeyboardButton {
    text: String,
}

// ============================================================================
// Client
// ============================================================================

pub struct TelegramClient {
    client: Client,
    base_url: String,
    poll_timeout: Duration,
}

impl TelegramClient {
    pub fn new(api_base: &str, token: &str, poll_timeout: Duration) -> Result<Self, GatewayError> {
        // Must outlive the server-side long-poll window
        let client = Client::builder()
            .timeout(poll_timeout + Duration::from_secs(10))
            .build()?;

        Ok(Self {
            client,
            base_url: format!("{}/bot{token}", api_base.trim_end_matches('/')),
            poll_timeout,
        })
    }

    async fn call<B: Serialize + Sync, T: DeserializeOwned>(
        &self,
        method: &str,
        body: &B,
    ) -> Result<T, GatewayError> {
        let response: ApiResponse<T> = self
            .client
            .post(format!("{}/{method}", self.base_url))
            .json(body)
            .send()
            .await?
            .json()
            .await?;

        match response {
            ApiResponse {
                ok: true,
                result: Some(result),
                ..
            } => Ok(result),
            ApiResponse { description, .. } => Err(GatewayError::Api {
                method: method.to_string(),
                description: description.unwrap_or_else(|| "no description".to_string()),
            }),
        }
    }

    /// Drop any webhook so long polling receives updates
    pub async fn delete_webhook(&self) -> Result<(), GatewayError> {
        let _: bool = self
            .call("deleteWebhook", &serde_json::json!({ "drop_pending_updates": false }))
            .await?;
        Ok(())
    }

    pub async fn get_updates(&self, offset: i64) -> Result<Vec<Update>, GatewayError> {
        self.call(
            "getUpdates",
            &GetUpdatesRequest {
                offset,
                timeout: self.poll_timeout.as_secs(),
                allowed_updates: ["message"],
            },
        )
        .await
    }

    pub async fn send_message(&self, message: &OutboundMessage) -> Result<(), GatewayError> {
        let chat_id = parse_chat_id(&message.conversation_id)?;
        let _: serde_json::Value = self
            .call("sendMessage", &send_message_request(chat_id, message))
            .await?;
        Ok(())
    }
}

#[async_trait]
impl MessageSink for TelegramClient {
    async fn deliver(&self, message: &OutboundMessage) -> Result<(), GatewayError> {
        self.send_message(message).await
    }
}

fn parse_chat_id(conversation_id: &str) -> Result<i64, GatewayError> {
    conversation_id
        .parse()
        .map_err(|_| GatewayError::InvalidChatId(conversation_id.to_string()))
}

fn send_message_request(chat_id: i64, message: &OutboundMessage) -> SendMessageRequest<'_> {
    SendMessageRequest {
        chat_id,
        text: &message.text,
        parse_mode: message.markdown.then_some("Markdown"),
        reply_markup: message.choices.as_ref().map(|choices| ReplyKeyboardMarkup {
            // One button per row
            keyboard: choices
                .iter()
                .map(|choice| vec![KeyboardButton { text: choice.clone() }])
                .collect(),
            resize_keyboard: true,
            one_time_keyboard: true,
        }),
    }
}

/// Map a Telegram update to an inbound event; other update kinds are ignored
pub fn update_to_inbound(update: &Update) -> Option<InboundEvent> {
    let message = update.message.as_ref()?;
    let conversation_id = message.chat.id.to_string();

    if let Some(sizes) = &message.photo {
        let largest = sizes
            .iter()
            .max_by_key(|size| u64::from(size.width) * u64::from(size.height));
        return Some(InboundEvent::photo(
            conversation_id,
            largest.map(|size| size.file_id.clone()),
        ));
    }

    message
        .text
        .as_ref()
        .map(|text| InboundEvent::text(conversation_id, text.clone()))
}

// ============================================================================
// Polling loop
// ============================================================================

/// Hand one update to its conversation without waiting on a busy queue
pub async fn route_update(manager: &RuntimeManager, update: &Update) -> Result<(), RouteError> {
    let Some(inbound) = update_to_inbound(update) else {
        tracing::debug!(update_id = update.update_id, "Ignoring update");
        return Ok(());
    };
    let conv_id = inbound.conversation_id.clone();
    let Some(event) = inbound.into_event() else {
        return Ok(());
    };
    manager.try_send_event(&conv_id, event).await
}

/// Poll for updates and route them until cancelled
pub async fn run_polling(
    client: Arc<TelegramClient>,
    manager: Arc<RuntimeManager>,
    cancel: CancellationToken,
) {
    if let Err(e) = client.delete_webhook().await {
        tracing::warn!(error = %e, "Failed to delete webhook");
    }

    let mut offset = 0;
    let mut backoff = Duration::from_secs(1);
    tracing::info!("Polling Telegram for updates");

    loop {
        let updates = tokio::select! {
            () = cancel.cancelled() => break,
            result = client.get_updates(offset) => result,
        };

        let updates = match updates {
            Ok(updates) => {
                backoff = Duration::from_secs(1);
                updates
            }
            Err(e) => {
                tracing::error!(error = %e, retry_in = ?backoff, "getUpdates failed");
                tokio::select! {
                    () = cancel.cancelled() => break,
                    () = tokio::time::sleep(backoff) => {}
                }
                backoff = (backoff * 2).min(MAX_BACKOFF);
                continue;
            }
        };

        for update in updates {
            offset = offset.max(update.update_id + 1);
            match route_update(&manager, &update).await {
                Ok(()) => {}
                Err(RouteError::QueueFull(conv_id)) => {
                    tracing::warn!(
                        conv_id = %conv_id,
                        update_id = update.update_id,
                        "Conversation busy, dropping update"
                    );
                }
                Err(e) => {
                    tracing::warn!(update_id = update.update_id, error = %e, "Failed to route update");
                }
            }
        }
    }

    tracing::info!("Telegram polling stopped");
}
