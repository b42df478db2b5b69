//! Conversation runtime executor

use super::traits::{MessageSink, SessionStore};
use crate::state_machine::{transition, ConvContext, Effect, Event, Session, Step};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

/// Actor owning all processing for one conversation
///
/// Events arrive over a single channel and are handled one at a time, so two
/// near-simultaneous messages can never race on the same session. The actor
/// also owns the session's expiry: once no event has arrived for `idle_ttl`
/// after the queue drained, it deletes the session and stops.
pub struct ConversationRuntime<S, M>
where
    S: SessionStore + ?Sized + 'static,
    M: MessageSink + ?Sized + 'static,
{
    context: ConvContext,
    store: Arc<S>,
    sink: Arc<M>,
    event_rx: mpsc::Receiver<Event>,
    idle_ttl: Duration,
}

impl<S, M> ConversationRuntime<S, M>
where
    S: SessionStore + ?Sized + 'static,
    M: MessageSink + ?Sized + 'static,
{
    pub fn new(
        context: ConvContext,
        store: Arc<S>,
        sink: Arc<M>,
        event_rx: mpsc::Receiver<Event>,
        idle_ttl: Duration,
    ) -> Self {
        Self {
            context,
            store,
            sink,
            event_rx,
            idle_ttl,
        }
    }

    pub async fn run(mut self) {
        tracing::debug!(conv_id = %self.context.conversation_id, "Starting conversation runtime");

        loop {
            match tokio::time::timeout(self.idle_ttl, self.event_rx.recv()).await {
                Ok(Some(event)) => self.process_event(event).await,
                Ok(None) => break,
                Err(_) => {
                    self.expire().await;
                    break;
                }
            }
        }

        tracing::debug!(conv_id = %self.context.conversation_id, "Conversation runtime stopped");
    }

    /// Drop the idle session and refuse further events
    ///
    /// Events that slipped into the queue before it closed are still handled,
    /// in order, against the now empty session.
    async fn expire(&mut self) {
        let conv_id = self.context.conversation_id.clone();
        self.event_rx.close();

        if self.store.delete(&conv_id).await {
            tracing::info!(conv_id = %conv_id, "Session expired");
        }

        while let Some(event) = self.event_rx.recv().await {
            self.process_event(event).await;
        }
    }

    async fn process_event(&mut self, event: Event) {
        let conv_id = self.context.conversation_id.clone();
        let session = self.store.get(&conv_id).await;
        let from = session.as_ref().map_or("none", |s| s.step.name());
        let event_kind = event.kind();

        // Pure state transition
        let result = transition(session.as_ref(), &self.context, event);

        if let Some(rejection) = &result.rejection {
            tracing::debug!(
                conv_id = %conv_id,
                step = from,
                event = event_kind,
                error = %rejection,
                "Input rejected"
            );
        }

        let new_step = result.new_step.clone();
        for effect in result.effects {
            self.execute_effect(effect, new_step.as_ref()).await;
        }

        tracing::debug!(
            conv_id = %conv_id,
            from,
            to = new_step.as_ref().map_or("none", Step::name),
            event = event_kind,
            "Transition"
        );
    }

    async fn execute_effect(&self, effect: Effect, new_step: Option<&Step>) {
        let conv_id = &self.context.conversation_id;

        match effect {
            Effect::CreateSession => {
                self.store.create(conv_id).await;
                tracing::info!(conv_id = %conv_id, "Session started");
            }

            Effect::PersistSession => {
                let Some(step) = new_step.cloned() else {
                    tracing::error!(conv_id = %conv_id, "Persist requested without a step");
                    return;
                };
                let mutation = Box::new(move |session: &mut Session| session.step = step);
                if let Err(e) = self.store.update(conv_id, mutation).await {
                    tracing::warn!(conv_id = %conv_id, error = %e, "Failed to persist session");
                }
            }

            Effect::DeleteSession => {
                self.store.delete(conv_id).await;
            }

            Effect::Reply(message) => {
                // Fire-and-forget: delivery failures belong to the gateway
                if let Err(e) = self.sink.deliver(&message).await {
                    tracing::warn!(conv_id = %conv_id, error = %e, "Failed to deliver message");
                }
            }

            Effect::Completed { valuation } => {
                tracing::info!(
                    conv_id = %conv_id,
                    make = %valuation.make,
                    model = %valuation.model,
                    year = valuation.year,
                    mileage = valuation.mileage,
                    price = valuation.price,
                    "Valuation completed"
                );
                tracing::debug!(conv_id = %conv_id, ?valuation, "Valuation breakdown");
            }
        }
    }
}
