//! In-process sink for the HTTP gateway
//!
//! Replies are fanned out to every subscriber; SSE streams filter by
//! conversation id.

use super::{GatewayError, OutboundMessage};
use crate::runtime::MessageSink;
use async_trait::async_trait;
use tokio::sync::broadcast;

#[derive(Clone)]
pub struct BroadcastSink {
    tx: broadcast::Sender<OutboundMessage>,
}

impl BroadcastSink {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<OutboundMessage> {
        self.tx.subscribe()
    }
}

impl Default for BroadcastSink {
    fn default() -> Self {
        Self::new(256)
    }
}

#[async_trait]
impl MessageSink for BroadcastSink {
    async fn deliver(&self, message: &OutboundMessage) -> Result<(), GatewayError> {
        // Nobody listening is not an error; the reply is simply not seen
        if self.tx.send(message.clone()).is_err() {
            tracing::debug!(conv_id = %message.conversation_id, "No subscribers for reply");
        }
        Ok(())
    }
}
