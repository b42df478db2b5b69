//! Effects produced by state transitions

use crate::gateway::OutboundMessage;
use crate::valuation::Valuation;

/// Effects to be executed after state transition
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Start a new session at the first step, replacing any existing one
    CreateSession,

    /// Persist the new step
    PersistSession,

    /// Remove the session; the conversation starts over on next contact
    DeleteSession,

    /// Send a message back through the gateway
    Reply(OutboundMessage),

    /// A valuation was produced
    Completed { valuation: Valuation },
}

impl Effect {
    pub fn reply(message: OutboundMessage) -> Self {
        Effect::Reply(message)
    }
}
