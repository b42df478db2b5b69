//! Trait abstractions for runtime I/O
//!
//! These traits enable testing the executor with mock implementations.

use crate::gateway::{GatewayError, OutboundMessage};
use crate::state_machine::Session;
use crate::store::StoreError;
use async_trait::async_trait;

/// In-place change applied to a stored session
pub type SessionMutation = Box<dyn FnOnce(&mut Session) + Send>;

/// Storage for per-conversation sessions
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Get the session for a conversation, if one is in progress
    async fn get(&self, conv_id: &str) -> Option<Session>;

    /// Start a session at the first step, replacing any existing one
    async fn create(&self, conv_id: &str) -> Session;

    /// Apply a mutation to an existing session
    async fn update(&self, conv_id: &str, mutation: SessionMutation) -> Result<Session, StoreError>;

    /// Remove a session, returning whether one existed
    async fn delete(&self, conv_id: &str) -> bool;

    /// Number of sessions in progress
    async fn len(&self) -> usize;

    async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

/// Outbound side of the messaging gateway
#[async_trait]
pub trait MessageSink: Send + Sync {
    /// Deliver a message; callers do not retry on failure
    async fn deliver(&self, message: &OutboundMessage) -> Result<(), GatewayError>;
}
