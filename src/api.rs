//! HTTP gateway
//!
//! Lets a browser or script hold the same dialogue as the Telegram bot:
//! events are posted per conversation and replies arrive over SSE.

mod handlers;
mod sse;
mod types;

pub use handlers::create_router;

use crate::gateway::BroadcastSink;
use crate::runtime::RuntimeManager;
use std::sync::Arc;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub runtime: Arc<RuntimeManager>,
    /// The same sink the runtime delivers into; handlers subscribe to it
    pub replies: BroadcastSink,
}

impl AppState {
    pub fn new(runtime: Arc<RuntimeManager>, replies: BroadcastSink) -> Self {
        Self { runtime, replies }
    }
}
