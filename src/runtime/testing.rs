//! Mock implementations for testing
//!
//! These mocks enable integration testing of the runtime without a real
//! messaging gateway.

use super::traits::*;
use super::RuntimeManager;
use crate::catalog::Catalog;
use crate::gateway::{GatewayError, OutboundMessage};
use crate::state_machine::Event;
use crate::store::InMemorySessionStore;
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;

// ============================================================================
// Mock sinks
// ============================================================================

/// Sink that records every delivered message and forwards it to a channel
pub struct RecordingSink {
    delivered: Mutex<Vec<OutboundMessage>>,
    tx: mpsc::UnboundedSender<OutboundMessage>,
}

impl RecordingSink {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<OutboundMessage>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            Self {
                delivered: Mutex::new(Vec::new()),
                tx,
            },
            rx,
        )
    }

    pub fn delivered(&self) -> Vec<OutboundMessage> {
        self.delivered.lock().unwrap().clone()
    }
}

#[async_trait]
impl MessageSink for RecordingSink {
    async fn deliver(&self, message: &OutboundMessage) -> Result<(), GatewayError> {
        self.delivered.lock().unwrap().push(message.clone());
        let _ = self.tx.send(message.clone());
        Ok(())
    }
}

/// Sink whose deliveries always fail
#[derive(Default)]
pub struct FailingSink {
    pub attempts: AtomicUsize,
}

#[async_trait]
impl MessageSink for FailingSink {
    async fn deliver(&self, message: &OutboundMessage) -> Result<(), GatewayError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        Err(GatewayError::InvalidChatId(message.conversation_id.clone()))
    }
}

/// Sink that never completes deliveries for one conversation
pub struct StallingSink {
    stalled_id: String,
    inner: RecordingSink,
}

impl StallingSink {
    pub fn new(stalled_id: &str, inner: RecordingSink) -> Self {
        Self {
            stalled_id: stalled_id.to_string(),
            inner,
        }
    }
}

#[async_trait]
impl MessageSink for StallingSink {
    async fn deliver(&self, message: &OutboundMessage) -> Result<(), GatewayError> {
        if message.conversation_id == self.stalled_id {
            std::future::pending::<()>().await;
        }
        self.inner.deliver(message).await
    }
}

/// Sink that takes a while per delivery and tracks overlapping deliveries
pub struct SlowSink {
    delay: Duration,
    in_flight: AtomicUsize,
    pub max_in_flight: AtomicUsize,
    inner: RecordingSink,
}

impl SlowSink {
    pub fn new(delay: Duration) -> (Self, mpsc::UnboundedReceiver<OutboundMessage>) {
        let (inner, rx) = RecordingSink::new();
        (
            Self {
                delay,
                in_flight: AtomicUsize::new(0),
                max_in_flight: AtomicUsize::new(0),
                inner,
            },
            rx,
        )
    }
}

#[async_trait]
impl MessageSink for SlowSink {
    async fn deliver(&self, message: &OutboundMessage) -> Result<(), GatewayError> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        tokio::time::sleep(self.delay).await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        self.inner.deliver(message).await
    }
}

// ============================================================================
// Test runtime
// ============================================================================

/// Runtime manager wired to in-memory mocks
pub struct TestRuntime {
    pub manager: Arc<RuntimeManager>,
    pub store: Arc<InMemorySessionStore>,
    pub sink: Arc<RecordingSink>,
    replies: mpsc::UnboundedReceiver<OutboundMessage>,
}

pub struct TestRuntimeBuilder {
    catalog: Catalog,
    session_ttl: Duration,
}

impl TestRuntime {
    pub fn builder() -> TestRuntimeBuilder {
        TestRuntimeBuilder::new()
    }

    pub fn new() -> Self {
        TestRuntimeBuilder::new().build()
    }

    pub async fn send_text(&self, conv_id: &str, text: &str) {
        self.manager
            .send_event(conv_id, Event::from_text(text))
            .await
            .expect("Failed to send text");
    }

    pub async fn send_photo(&self, conv_id: &str) {
        self.manager
            .send_event(
                conv_id,
                Event::Photo {
                    file_id: Some("photo-1".to_string()),
                },
            )
            .await
            .expect("Failed to send photo");
    }

    /// Wait for the next delivered message
    pub async fn next_reply(&mut self) -> OutboundMessage {
        tokio::time::timeout(Duration::from_secs(2), self.replies.recv())
            .await
            .expect("Timed out waiting for reply")
            .expect("Reply channel closed")
    }

    /// Send text and wait for the reply to it
    pub async fn say(&mut self, conv_id: &str, text: &str) -> OutboundMessage {
        self.send_text(conv_id, text).await;
        self.next_reply().await
    }

    /// Prune finished runtimes until `expected` of them have been dropped
    pub async fn wait_for_pruned(&self, expected: usize) -> bool {
        let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
        let mut pruned = 0;
        while tokio::time::Instant::now() < deadline {
            pruned += self.manager.prune_finished().await;
            if pruned >= expected {
                return pruned == expected;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        false
    }

    /// Poll until no session exists for the conversation
    pub async fn wait_for_no_session(&self, conv_id: &str) -> bool {
        let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
        while tokio::time::Instant::now() < deadline {
            if self.store.get(conv_id).await.is_none() {
                return true;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        false
    }
}

impl Default for TestRuntime {
    fn default() -> Self {
        Self::new()
    }
}

impl TestRuntimeBuilder {
    pub fn new() -> Self {
        Self {
            catalog: Catalog::builtin(),
            session_ttl: Duration::from_secs(3600),
        }
    }

    pub fn catalog(mut self, catalog: Catalog) -> Self {
        self.catalog = catalog;
        self
    }

    pub fn session_ttl(mut self, ttl: Duration) -> Self {
        self.session_ttl = ttl;
        self
    }

    pub fn build(self) -> TestRuntime {
        let store = Arc::new(InMemorySessionStore::new());
        let (sink, replies) = RecordingSink::new();
        let sink = Arc::new(sink);
        let manager = Arc::new(RuntimeManager::new(
            Arc::new(self.catalog),
            store.clone(),
            sink.clone(),
            self.session_ttl,
        ));

        TestRuntime {
            manager,
            store,
            sink,
            replies,
        }
    }
}

impl Default for TestRuntimeBuilder {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::{RouteError, EVENT_QUEUE_CAPACITY};
    use crate::state_machine::Step;

    /// Integration test: full dialogue ending in a valuation
    #[tokio::test]
    async fn test_full_dialogue() {
        let mut rt = TestRuntime::new();

        let greeting = rt.say("42", "hello").await;
        assert!(greeting.text.contains("Choose the car make"));
        assert!(greeting
            .choices
            .as_ref()
            .is_some_and(|c| c.contains(&"Chevrolet".to_string())));

        let models = rt.say("42", "chevrolet").await;
        assert!(models.text.contains("You chose Chevrolet"));
        assert!(models
            .choices
            .as_ref()
            .is_some_and(|c| c.contains(&"Cobalt".to_string())));

        let year = rt.say("42", "Cobalt").await;
        assert!(year.text.contains("model year"));
        assert!(year.choices.is_none());

        let mileage = rt.say("42", "2022").await;
        assert!(mileage.text.contains("mileage"));

        let photo = rt.say("42", "100000").await;
        assert!(photo.text.contains("photo"));
        assert_eq!(
            rt.store.get("42").await.unwrap().step,
            Step::AwaitingPhoto {
                make: "Chevrolet".to_string(),
                model: "Cobalt".to_string(),
                year: 2022,
                mileage: 100_000,
            }
        );

        rt.send_photo("42").await;
        let result = rt.next_reply().await;
        assert!(result.markdown);
        assert!(result.text.contains("$8,575 USD"));
        assert!(result.text.contains("Mileage: 100,000 km"));

        assert!(rt.wait_for_no_session("42").await);
    }

    /// Integration test: invalid inputs re-prompt without advancing
    #[tokio::test]
    async fn test_invalid_inputs_reprompt() {
        let mut rt = TestRuntime::new();

        rt.say("7", "hi").await;
        let reply = rt.say("7", "Lada").await;
        assert!(reply.text.contains("Make not found"));
        assert!(reply.choices.is_some());
        assert_eq!(rt.store.get("7").await.unwrap().step, Step::AwaitingMake);

        rt.say("7", "Kia").await;
        rt.say("7", "Sportage").await;

        let reply = rt.say("7", "20x0").await;
        assert!(reply.text.contains("must be a number"));
        let reply = rt.say("7", "1999").await;
        assert!(reply.text.contains("between"));
        let reply = rt.say("7", " 2020").await;
        assert!(reply.text.contains("must be a number"));

        rt.say("7", "2020").await;
        let reply = rt.say("7", "200 000").await;
        assert!(reply.text.contains("must be a number"));
        rt.say("7", "200000").await;

        let reply = rt.say("7", "here is the photo").await;
        assert!(reply.text.contains("send a photo"));
        assert_eq!(rt.store.get("7").await.unwrap().step.mileage(), Some(200_000));

        rt.send_photo("7").await;
        assert!(rt.next_reply().await.text.contains("$12,750 USD"));
    }

    /// Integration test: a burst on one id is processed in order
    #[tokio::test]
    async fn test_burst_is_serialized() {
        let mut rt = TestRuntime::new();

        for text in ["start", "Honda", "Accord", "2025", "10000"] {
            rt.send_text("9", text).await;
        }
        rt.send_photo("9").await;

        let mut last = None;
        for _ in 0..6 {
            last = Some(rt.next_reply().await);
        }
        assert!(last.unwrap().text.contains("$12,300 USD"));
        assert!(rt.wait_for_no_session("9").await);
    }

    /// Integration test: conversations do not share state
    #[tokio::test]
    async fn test_conversations_are_isolated() {
        let mut rt = TestRuntime::new();

        rt.say("a", "hi").await;
        rt.say("a", "Toyota").await;
        rt.say("b", "hi").await;

        assert_eq!(rt.store.get("a").await.unwrap().step.make(), Some("Toyota"));
        assert_eq!(rt.store.get("b").await.unwrap().step, Step::AwaitingMake);
        assert_eq!(rt.manager.active_conversations().await, 2);
    }

    /// Integration test: restart discards progress
    #[tokio::test]
    async fn test_restart_command() {
        let mut rt = TestRuntime::new();

        rt.say("5", "hi").await;
        rt.say("5", "Hyundai").await;
        rt.say("5", "Creta").await;

        let reply = rt.say("5", "/start").await;
        assert!(reply.text.contains("Choose the car make"));
        assert_eq!(rt.store.get("5").await.unwrap().step, Step::AwaitingMake);
    }

    /// Integration test: a photo with no session starts a new one
    #[tokio::test]
    async fn test_photo_without_session() {
        let mut rt = TestRuntime::new();

        rt.send_photo("3").await;
        let reply = rt.next_reply().await;
        assert!(reply.text.contains("Choose the car make"));
        assert_eq!(rt.store.get("3").await.unwrap().step, Step::AwaitingMake);
    }

    /// Integration test: delivery failures do not stop the dialogue
    #[tokio::test]
    async fn test_failing_sink_keeps_state() {
        let store = Arc::new(InMemorySessionStore::new());
        let sink = Arc::new(FailingSink::default());
        let manager = RuntimeManager::new(
            Arc::new(Catalog::builtin()),
            store.clone(),
            sink.clone(),
            Duration::from_secs(60),
        );

        manager.send_event("1", Event::from_text("hi")).await.unwrap();
        manager
            .send_event("1", Event::from_text("Toyota"))
            .await
            .unwrap();

        let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
        while sink.attempts.load(Ordering::SeqCst) < 2 && tokio::time::Instant::now() < deadline {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert_eq!(sink.attempts.load(Ordering::SeqCst), 2);
        assert_eq!(store.get("1").await.unwrap().step.make(), Some("Toyota"));
    }

    /// Integration test: idle conversations expire after the TTL
    #[tokio::test]
    async fn test_idle_sessions_expire() {
        let mut rt = TestRuntime::builder()
            .session_ttl(Duration::from_millis(200))
            .build();

        rt.say("old", "hi").await;
        rt.say("old", "Kia").await;
        assert!(rt.wait_for_no_session("old").await);

        rt.say("fresh", "hi").await;
        assert!(rt.wait_for_pruned(1).await);
        assert!(rt.store.get("fresh").await.is_some());
        assert_eq!(rt.manager.active_conversations().await, 1);

        // An expired conversation starts over on its next message
        let reply = rt.say("old", "Rio").await;
        assert!(reply.text.contains("Choose the car make"));
        assert_eq!(rt.store.get("old").await.unwrap().step, Step::AwaitingMake);
    }

    /// Integration test: a huge mileage is accepted rather than rejected
    #[tokio::test]
    async fn test_huge_mileage_reaches_photo_step() {
        let mut rt = TestRuntime::new();

        for text in ["hi", "Kia", "Rio", "2020"] {
            rt.say("8", text).await;
        }
        let reply = rt.say("8", "99999999999").await;
        assert!(reply.text.contains("photo"));
        assert_eq!(
            rt.store.get("8").await.unwrap().step.mileage(),
            Some(99_999_999_999)
        );

        rt.send_photo("8").await;
        assert!(rt.next_reply().await.text.contains("$6,000 USD"));
    }

    /// Integration test: slow processing never outlives the TTL into a second runtime
    #[tokio::test]
    async fn test_slow_delivery_keeps_one_runtime_per_id() {
        let (sink, mut replies) = SlowSink::new(Duration::from_millis(150));
        let sink = Arc::new(sink);
        let store = Arc::new(InMemorySessionStore::new());
        let manager = RuntimeManager::new(
            Arc::new(Catalog::builtin()),
            store.clone(),
            sink.clone(),
            Duration::from_millis(50),
        );

        manager.send_event("s", Event::from_text("hi")).await.unwrap();
        manager
            .send_event("s", Event::from_text("Toyota"))
            .await
            .unwrap();

        // Past the TTL while the first delivery is still in progress
        tokio::time::sleep(Duration::from_millis(80)).await;
        assert_eq!(manager.prune_finished().await, 0);
        manager
            .send_event("s", Event::from_text("Corolla"))
            .await
            .unwrap();

        let mut texts = Vec::new();
        for _ in 0..3 {
            let reply = tokio::time::timeout(Duration::from_secs(2), replies.recv())
                .await
                .unwrap()
                .unwrap();
            texts.push(reply.text);
        }
        assert_eq!(sink.max_in_flight.load(Ordering::SeqCst), 1);
        assert!(texts[0].contains("Choose the car make"));
        assert!(texts[1].contains("You chose Toyota"));
        assert!(texts[2].contains("model year"));

        // Once idle, the runtime expires its own session
        let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
        while store.get("s").await.is_some() && tokio::time::Instant::now() < deadline {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert!(store.get("s").await.is_none());
    }

    /// Integration test: a full queue rejects instead of waiting
    #[tokio::test]
    async fn test_try_send_rejects_when_queue_full() {
        let (recording, _replies) = RecordingSink::new();
        let manager = RuntimeManager::new(
            Arc::new(Catalog::builtin()),
            Arc::new(InMemorySessionStore::new()),
            Arc::new(StallingSink::new("busy", recording)),
            Duration::from_secs(60),
        );

        let mut results = Vec::new();
        for _ in 0..=EVENT_QUEUE_CAPACITY + 1 {
            results.push(manager.try_send_event("busy", Event::from_text("hi")).await);
        }
        assert!(results[0].is_ok());
        assert_eq!(
            results.last(),
            Some(&Err(RouteError::QueueFull("busy".to_string())))
        );
    }

    /// Integration test: the background reaper runs on its own
    #[tokio::test]
    async fn test_reaper_task() {
        let mut rt = TestRuntime::builder()
            .session_ttl(Duration::from_millis(30))
            .build();
        let reaper = rt.manager.start_reaper();

        rt.say("1", "hi").await;
        assert!(rt.wait_for_no_session("1").await);

        let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
        while rt.manager.active_conversations().await > 0 && tokio::time::Instant::now() < deadline
        {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert_eq!(rt.manager.active_conversations().await, 0);

        reaper.abort();
    }

    #[tokio::test]
    async fn test_recording_sink() {
        let (sink, mut rx) = RecordingSink::new();
        let message = OutboundMessage::new("1", "hello");
        sink.deliver(&message).await.unwrap();

        assert_eq!(sink.delivered(), vec![message.clone()]);
        assert_eq!(rx.recv().await, Some(message));
    }
}
