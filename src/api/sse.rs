//! Server-Sent Events support

use crate::gateway::OutboundMessage;
use axum::response::sse::{Event, KeepAlive, Sse};
use futures::stream::Stream;
use std::convert::Infallible;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt;

/// Stream the replies addressed to one conversation
pub fn sse_stream(
    conversation_id: String,
    broadcast_rx: broadcast::Receiver<OutboundMessage>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let stream = BroadcastStream::new(broadcast_rx).filter_map(move |result| match result {
        Ok(message) if message.conversation_id == conversation_id => {
            Some(Ok(message_to_event(&message)))
        }
        Ok(_) => None,
        Err(_) => None, // Skip lagged messages
    });

    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("ping"),
    )
}

fn message_to_event(message: &OutboundMessage) -> Event {
    Event::default()
        .event("message")
        .json_data(message)
        .unwrap_or_else(|_| Event::default().event("error").data("serialization failed"))
}
