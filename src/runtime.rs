//! Runtime for executing conversations
//!
//! Every conversation id gets its own actor task. Events for one id are
//! queued and processed in arrival order; different ids run independently.
//! A runtime left idle for the session TTL discards its session and stops.

mod executor;
pub mod traits;

#[cfg(test)]
pub mod testing;

pub use executor::ConversationRuntime;
pub use traits::*;

use crate::catalog::Catalog;
use crate::state_machine::{ConvContext, Event, Session};
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::mpsc::error::{SendError, TrySendError};
use tokio::sync::{mpsc, RwLock};
use tokio::task::JoinHandle;

/// Upper bound on how often finished conversations are swept
const MAX_REAP_INTERVAL: Duration = Duration::from_secs(60);

/// Events buffered per conversation before routing refuses more
pub const EVENT_QUEUE_CAPACITY: usize = 32;

/// Type alias for the runtime spawned by the manager
pub type ProductionRuntime = ConversationRuntime<dyn SessionStore, dyn MessageSink>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RouteError {
    #[error("Event queue full for conversation {0}")]
    QueueFull(String),
    #[error("Conversation runtime unavailable: {0}")]
    Closed(String),
}

/// Manager for all conversation runtimes
pub struct RuntimeManager {
    catalog: Arc<Catalog>,
    store: Arc<dyn SessionStore>,
    sink: Arc<dyn MessageSink>,
    runtimes: RwLock<HashMap<String, ConversationHandle>>,
    session_ttl: Duration,
}

/// Handle to interact with a running conversation
pub struct ConversationHandle {
    pub event_tx: mpsc::Sender<Event>,
    join: JoinHandle<()>,
}

impl RuntimeManager {
    pub fn new(
        catalog: Arc<Catalog>,
        store: Arc<dyn SessionStore>,
        sink: Arc<dyn MessageSink>,
        session_ttl: Duration,
    ) -> Self {
        Self {
            catalog,
            store,
            sink,
            runtimes: RwLock::new(HashMap::new()),
            session_ttl,
        }
    }

    pub fn catalog(&self) -> &Arc<Catalog> {
        &self.catalog
    }

    /// Get the event channel for a conversation, starting its runtime if needed
    ///
    /// A runtime whose queue has closed is replaced. The replacement waits for
    /// the old task to finish first, so at most one runtime ever processes
    /// events for an id.
    pub async fn get_or_create(&self, conversation_id: &str) -> mpsc::Sender<Event> {
        // Fast path: already running
        {
            let runtimes = self.runtimes.read().await;
            if let Some(handle) = runtimes.get(conversation_id) {
                if !handle.event_tx.is_closed() {
                    return handle.event_tx.clone();
                }
            }
        }

        let mut runtimes = self.runtimes.write().await;

        // Another caller may have started it while we waited for the lock
        let predecessor = match runtimes.remove(conversation_id) {
            Some(handle) if !handle.event_tx.is_closed() => {
                let event_tx = handle.event_tx.clone();
                runtimes.insert(conversation_id.to_string(), handle);
                return event_tx;
            }
            Some(handle) => {
                tracing::debug!(conv_id = %conversation_id, "Replacing closed conversation runtime");
                Some(handle.join)
            }
            None => None,
        };

        let (event_tx, event_rx) = mpsc::channel(EVENT_QUEUE_CAPACITY);
        let context = ConvContext::new(conversation_id, self.catalog.clone());
        let runtime: ProductionRuntime = ConversationRuntime::new(
            context,
            self.store.clone(),
            self.sink.clone(),
            event_rx,
            self.session_ttl,
        );

        let conv_id = conversation_id.to_string();
        let join = tokio::spawn(async move {
            if let Some(previous) = predecessor {
                if let Err(e) = previous.await {
                    tracing::warn!(conv_id = %conv_id, error = %e, "Previous runtime failed");
                }
            }
            runtime.run().await;
            tracing::debug!(conv_id = %conv_id, "Conversation runtime finished");
        });

        runtimes.insert(
            conversation_id.to_string(),
            ConversationHandle {
                event_tx: event_tx.clone(),
                join,
            },
        );

        event_tx
    }

    /// Queue an event for a conversation, waiting for room in its queue
    pub async fn send_event(&self, conversation_id: &str, event: Event) -> Result<(), RouteError> {
        let event_tx = self.get_or_create(conversation_id).await;
        // A runtime that expired between lookup and send hands the event back
        let Err(SendError(event)) = event_tx.send(event).await else {
            return Ok(());
        };
        self.get_or_create(conversation_id)
            .await
            .send(event)
            .await
            .map_err(|_| RouteError::Closed(conversation_id.to_string()))
    }

    /// Queue an event without waiting
    ///
    /// A full queue rejects the event instead of stalling the caller, so one
    /// busy conversation cannot hold up routing for the others.
    pub async fn try_send_event(
        &self,
        conversation_id: &str,
        event: Event,
    ) -> Result<(), RouteError> {
        let event_tx = self.get_or_create(conversation_id).await;
        let event = match event_tx.try_send(event) {
            Ok(()) => return Ok(()),
            Err(TrySendError::Full(_)) => {
                return Err(RouteError::QueueFull(conversation_id.to_string()))
            }
            Err(TrySendError::Closed(event)) => event,
        };
        self.get_or_create(conversation_id)
            .await
            .try_send(event)
            .map_err(|e| match e {
                TrySendError::Full(_) => RouteError::QueueFull(conversation_id.to_string()),
                TrySendError::Closed(_) => RouteError::Closed(conversation_id.to_string()),
            })
    }

    /// Current session for a conversation, if one is in progress
    pub async fn snapshot(&self, conversation_id: &str) -> Option<Session> {
        self.store.get(conversation_id).await
    }

    /// Number of conversations with a tracked runtime
    pub async fn active_conversations(&self) -> usize {
        self.runtimes.read().await.len()
    }

    /// Forget runtimes that have stopped
    ///
    /// Runtimes expire their own sessions. A session revived by events that
    /// raced the expiry outlives its runtime, so it is kept until it has been
    /// idle for the TTL. Holding the write lock keeps a replacement runtime
    /// from starting while the session is inspected.
    pub async fn prune_finished(&self) -> usize {
        let mut runtimes = self.runtimes.write().await;
        let finished: Vec<String> = runtimes
            .iter()
            .filter(|(_, handle)| handle.join.is_finished())
            .map(|(id, _)| id.clone())
            .collect();

        let mut pruned = 0;
        for id in finished {
            if let Some(session) = self.store.get(&id).await {
                let idle = (Utc::now() - session.last_active_at)
                    .to_std()
                    .unwrap_or_default();
                if idle < self.session_ttl {
                    continue;
                }
                self.store.delete(&id).await;
                tracing::info!(conv_id = %id, "Session expired");
            }
            runtimes.remove(&id);
            pruned += 1;
        }
        pruned
    }

    /// Start the background task that sweeps finished conversations
    pub fn start_reaper(self: &Arc<Self>) -> JoinHandle<()> {
        let manager = Arc::clone(self);
        let period = self.session_ttl.min(MAX_REAP_INTERVAL);

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                let pruned = manager.prune_finished().await;
                if pruned > 0 {
                    let active = manager.active_conversations().await;
                    tracing::debug!(pruned, active, "Pruned finished conversations");
                }
            }
        })
    }
}
