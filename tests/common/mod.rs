//! Shared test utilities

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use roam_chat::config::SessionConfig;
use roam_chat::voice::{RecognitionSink, SpeechRecognizer, SpeechSynthesizer};
use roam_chat::{
    ConversationClient, Devices, Error, EventSink, Itinerary, Message, ReplyEnvelope, Result,
    Session, SessionEvent, SessionHandle, SessionRunner,
};

/// One scripted backend reply
struct Scripted {
    delay: Duration,
    outcome: Result<ReplyEnvelope>,
}

/// A chat turn as the backend saw it
#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub message: String,
    pub history: Vec<Message>,
}

/// Conversation client that replays queued outcomes in order
///
/// Falls back to a plain "ok" reply once the queue is empty.
#[derive(Default)]
pub struct ScriptedClient {
    script: Mutex<VecDeque<Scripted>>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl ScriptedClient {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn reply(&self, text: &str) {
        self.push(Duration::ZERO, Ok(ReplyEnvelope::reply(text)));
    }

    pub fn reply_after(&self, delay: Duration, text: &str) {
        self.push(delay, Ok(ReplyEnvelope::reply(text)));
    }

    pub fn plan(&self, text: &str, plan: serde_json::Value) {
        self.push(
            Duration::ZERO,
            Ok(ReplyEnvelope::plan_ready(text, Itinerary::new(plan))),
        );
    }

    pub fn fail(&self, error: Error) {
        self.push(Duration::ZERO, Err(error));
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }

    fn push(&self, delay: Duration, outcome: Result<ReplyEnvelope>) {
        self.script
            .lock()
            .unwrap()
            .push_back(Scripted { delay, outcome });
    }
}

#[async_trait]
impl ConversationClient for ScriptedClient {
    async fn send(&self, message: &str, history: &[Message]) -> Result<ReplyEnvelope> {
        self.calls.lock().unwrap().push(RecordedCall {
            message: message.to_string(),
            history: history.to_vec(),
        });

        let next = self.script.lock().unwrap().pop_front();
        match next {
            Some(Scripted { delay, outcome }) => {
                tokio::time::sleep(delay).await;
                outcome
            }
            None => Ok(ReplyEnvelope::reply("ok")),
        }
    }
}

/// What a fake recognizer has been asked to do
#[derive(Default)]
pub struct RecognizerLog {
    pub sinks: Vec<RecognitionSink>,
    pub stops: usize,
    pub aborts: usize,
}

/// Recognizer that hands its sinks to the test
#[derive(Clone, Default)]
pub struct FakeRecognizer(pub Arc<Mutex<RecognizerLog>>);

impl FakeRecognizer {
    /// Sink of the most recent recognition session
    pub fn last_sink(&self) -> RecognitionSink {
        self.0
            .lock()
            .unwrap()
            .sinks
            .last()
            .cloned()
            .expect("recognizer never started")
    }

    pub fn starts(&self) -> usize {
        self.0.lock().unwrap().sinks.len()
    }
}

impl SpeechRecognizer for FakeRecognizer {
    fn start(&mut self, sink: RecognitionSink) -> Result<()> {
        self.0.lock().unwrap().sinks.push(sink);
        Ok(())
    }

    fn stop(&mut self) {
        self.0.lock().unwrap().stops += 1;
    }

    fn abort(&mut self) {
        self.0.lock().unwrap().aborts += 1;
    }
}

/// Synthesizer call, in order
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpeechCall {
    Speak(String),
    Cancel,
}

/// Synthesizer that records every call
#[derive(Clone, Default)]
pub struct FakeSynthesizer(pub Arc<Mutex<Vec<SpeechCall>>>);

impl FakeSynthesizer {
    pub fn calls(&self) -> Vec<SpeechCall> {
        self.0.lock().unwrap().clone()
    }

    pub fn spoken(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                SpeechCall::Speak(text) => Some(text),
                SpeechCall::Cancel => None,
            })
            .collect()
    }
}

impl SpeechSynthesizer for FakeSynthesizer {
    fn speak(&mut self, text: &str) -> Result<()> {
        self.0.lock().unwrap().push(SpeechCall::Speak(text.to_string()));
        Ok(())
    }

    fn cancel(&mut self) {
        self.0.lock().unwrap().push(SpeechCall::Cancel);
    }
}

/// Test session configuration with a short, known greeting
pub fn session_config() -> SessionConfig {
    SessionConfig {
        greeting: "Where would you like to go?".to_string(),
        fallback_reply: "Sorry, I'm offline right now.".to_string(),
        handoff_delay: Duration::from_millis(1500),
        start_muted: false,
    }
}

/// A running session wired to test doubles
pub struct Harness {
    pub handle: SessionHandle,
    pub task: JoinHandle<()>,
    pub events: mpsc::UnboundedReceiver<SessionEvent>,
    pub plans: Arc<Mutex<Vec<serde_json::Value>>>,
}

impl Harness {
    /// Start a session; must be called from within a Tokio runtime
    pub fn start(
        client: Arc<ScriptedClient>,
        devices: Devices,
        config: &SessionConfig,
        request_timeout: Duration,
    ) -> Self {
        let plans = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&plans);
        let (events, events_rx) = EventSink::channel();

        let (session, recognition) = Session::new(
            config,
            devices,
            Box::new(move |plan: Itinerary| sink.lock().unwrap().push(plan.into_value())),
            events,
        );
        let (handle, task) = SessionRunner::new(
            session,
            recognition,
            client,
            request_timeout,
            config.handoff_delay,
        )
        .spawn();

        Self {
            handle,
            task,
            events: events_rx,
            plans,
        }
    }

    /// Start a session without speech devices
    pub fn text_only(client: Arc<ScriptedClient>) -> Self {
        Self::start(
            client,
            Devices::default(),
            &session_config(),
            Duration::from_secs(30),
        )
    }

    /// Wait for the first event matching `pred`, skipping others
    pub async fn wait_for(&mut self, mut pred: impl FnMut(&SessionEvent) -> bool) -> SessionEvent {
        loop {
            let event = tokio::time::timeout(Duration::from_secs(600), self.events.recv())
                .await
                .expect("timed out waiting for session event")
                .expect("session event channel closed");
            if pred(&event) {
                return event;
            }
        }
    }

    /// Wait until the in-flight request has settled
    pub async fn settled(&mut self) {
        self.wait_for(|e| *e == SessionEvent::PendingChanged(false))
            .await;
    }

    /// Events already emitted and not yet consumed
    pub fn drain(&mut self) -> Vec<SessionEvent> {
        let mut drained = Vec::new();
        while let Ok(event) = self.events.try_recv() {
            drained.push(event);
        }
        drained
    }

    pub fn plans(&self) -> Vec<serde_json::Value> {
        self.plans.lock().unwrap().clone()
    }
}
