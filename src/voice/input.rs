//! Voice input: one recognition device, one live recognition session

use tokio::sync::mpsc;

use crate::Result;
use crate::session::{Capability, EventSink, Notice, SessionEvent, SessionState};

/// What a recognition device reports
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecognitionEvent {
    /// A completed utterance
    Transcript(String),
    /// Device-level failure; the device has stopped
    Error(String),
    /// Device ended the session on its own
    End,
}

/// Recognition event tagged with the session that produced it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecognitionUpdate {
    pub generation: u64,
    pub event: RecognitionEvent,
}

/// Where a device delivers events for one recognition session
#[derive(Debug, Clone)]
pub struct RecognitionSink {
    generation: u64,
    tx: mpsc::UnboundedSender<RecognitionUpdate>,
}

impl RecognitionSink {
    #[must_use]
    pub const fn new(generation: u64, tx: mpsc::UnboundedSender<RecognitionUpdate>) -> Self {
        Self { generation, tx }
    }

    /// Deliver a completed utterance; returns false once the session loop is gone
    pub fn transcript(&self, text: impl Into<String>) -> bool {
        self.send(RecognitionEvent::Transcript(text.into()))
    }

    pub fn error(&self, message: impl Into<String>) -> bool {
        self.send(RecognitionEvent::Error(message.into()))
    }

    pub fn end(&self) -> bool {
        self.send(RecognitionEvent::End)
    }

    fn send(&self, event: RecognitionEvent) -> bool {
        self.tx
            .send(RecognitionUpdate {
                generation: self.generation,
                event,
            })
            .is_ok()
    }
}

/// A speech recognition device
pub trait SpeechRecognizer: Send {
    /// Begin a recognition session reporting into `sink`
    ///
    /// # Errors
    ///
    /// Returns error if the device cannot start
    fn start(&mut self, sink: RecognitionSink) -> Result<()>;

    /// End the session, letting the device wind down
    fn stop(&mut self);

    /// End the session immediately, dropping any partial result
    fn abort(&mut self) {
        self.stop();
    }
}

/// Owns the recognition device and keeps at most one session live
pub struct VoiceInputController {
    device: Option<Box<dyn SpeechRecognizer>>,
    updates: mpsc::UnboundedSender<RecognitionUpdate>,
    generation: u64,
    active: Option<u64>,
    warned: bool,
    events: EventSink,
}

impl VoiceInputController {
    /// Create a controller; `updates` is where devices send their events
    #[must_use]
    pub fn new(
        device: Option<Box<dyn SpeechRecognizer>>,
        updates: mpsc::UnboundedSender<RecognitionUpdate>,
        events: EventSink,
    ) -> Self {
        Self {
            device,
            updates,
            generation: 0,
            active: None,
            warned: false,
            events,
        }
    }

    /// Start listening if a device is present and no session is live
    pub fn start(&mut self, state: &mut SessionState) {
        let Some(device) = self.device.as_mut() else {
            if !self.warned {
                self.warned = true;
                tracing::warn!("speech recognition unavailable");
                self.events.emit(SessionEvent::Notice(Notice::CapabilityUnavailable(
                    Capability::Recognition,
                )));
            }
            return;
        };

        if self.active.is_some() {
            return;
        }

        self.generation += 1;
        let sink = RecognitionSink::new(self.generation, self.updates.clone());
        match device.start(sink) {
            Ok(()) => {
                self.active = Some(self.generation);
                state.listening = true;
                tracing::debug!(generation = self.generation, "listening");
            }
            Err(e) => {
                tracing::warn!(error = %e, "failed to start recognition");
                state.listening = false;
            }
        }
    }

    /// Stop listening; results still in flight from this session are dropped
    pub fn stop(&mut self, state: &mut SessionState) {
        if self.active.take().is_some() {
            if let Some(device) = self.device.as_mut() {
                device.stop();
            }
            tracing::debug!(generation = self.generation, "stopped listening");
        }
        state.listening = false;
    }

    pub fn toggle(&mut self, state: &mut SessionState) {
        if self.active.is_some() {
            self.stop(state);
        } else {
            self.start(state);
        }
    }

    /// Apply a device event; returns the utterance to submit, if any
    pub fn handle(
        &mut self,
        update: RecognitionUpdate,
        state: &mut SessionState,
    ) -> Option<String> {
        if self.active != Some(update.generation) {
            tracing::debug!(
                generation = update.generation,
                "ignoring event from superseded recognition session"
            );
            return None;
        }

        self.active = None;
        state.listening = false;

        match update.event {
            RecognitionEvent::Transcript(text) => {
                if let Some(device) = self.device.as_mut() {
                    device.stop();
                }
                tracing::debug!(transcript = %text, "utterance recognized");
                Some(text)
            }
            RecognitionEvent::Error(message) => {
                tracing::warn!(error = %message, "recognition error");
                None
            }
            RecognitionEvent::End => None,
        }
    }
}

impl Drop for VoiceInputController {
    fn drop(&mut self) {
        if self.active.take().is_some() {
            if let Some(device) = self.device.as_mut() {
                device.abort();
            }
        }
    }
}
