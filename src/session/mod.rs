//! Conversational session: transcript, turn-taking and plan hand-off
//!
//! The [`Session`] is a synchronous state machine. It never performs I/O
//! itself: `submit` hands back an [`OutboundRequest`] for the caller to send,
//! `settle` consumes the outcome, and a plan-ready settlement hands back a
//! [`PendingHandoff`] to be delivered after the presentation delay. The
//! [`runner`] module drives it from a single cooperative event loop.

pub mod runner;
mod state;

pub use runner::{SessionHandle, SessionRunner};
pub use state::{Capability, EventSink, Notice, SessionEvent, SessionState};

use tokio::sync::mpsc;

use crate::config::SessionConfig;
use crate::conversation::{Itinerary, Message, ReplyEnvelope};
use crate::voice::{
    RecognitionUpdate, SpeechRecognizer, SpeechSynthesizer, VoiceInputController,
    VoiceOutputController,
};
use crate::{Error, Result};

/// Receives a finished itinerary, once per plan-ready reply
pub trait PlanHandoff: Send {
    fn on_plan_ready(&mut self, plan: Itinerary);
}

impl<F> PlanHandoff for F
where
    F: FnMut(Itinerary) + Send,
{
    fn on_plan_ready(&mut self, plan: Itinerary) {
        self(plan);
    }
}

/// Optional speech devices available to a session
#[derive(Default)]
pub struct Devices {
    pub recognizer: Option<Box<dyn SpeechRecognizer>>,
    pub synthesizer: Option<Box<dyn SpeechSynthesizer>>,
}

/// A chat turn ready to go to the backend
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundRequest {
    /// Cycle this request belongs to
    pub cycle: u64,
    /// The user's message
    pub message: String,
    /// Transcript before the user's message
    pub history: Vec<Message>,
}

/// A plan waiting out its presentation delay
///
/// Not `Clone`: delivering it consumes it.
#[derive(Debug)]
pub struct PendingHandoff {
    cycle: u64,
    plan: Itinerary,
}

impl PendingHandoff {
    #[must_use]
    pub const fn cycle(&self) -> u64 {
        self.cycle
    }
}

/// One conversation with the itinerary assistant
pub struct Session {
    state: SessionState,
    input: VoiceInputController,
    output: VoiceOutputController,
    handoff: Box<dyn PlanHandoff>,
    events: EventSink,
    greeting: String,
    fallback_reply: String,
    cycle: u64,
    in_flight: Option<u64>,
}

impl Session {
    /// Create a session
    ///
    /// Returns the session and the receiver recognition devices report into.
    #[must_use]
    pub fn new(
        config: &SessionConfig,
        devices: Devices,
        handoff: Box<dyn PlanHandoff>,
        events: EventSink,
    ) -> (Self, mpsc::UnboundedReceiver<RecognitionUpdate>) {
        let (updates_tx, updates_rx) = mpsc::unbounded_channel();

        let session = Self {
            state: SessionState::new(&config.greeting, config.start_muted),
            input: VoiceInputController::new(devices.recognizer, updates_tx, events.clone()),
            output: VoiceOutputController::new(devices.synthesizer, events.clone()),
            handoff,
            events,
            greeting: config.greeting.clone(),
            fallback_reply: config.fallback_reply.clone(),
            cycle: 0,
            in_flight: None,
        };

        (session, updates_rx)
    }

    #[must_use]
    pub const fn state(&self) -> &SessionState {
        &self.state
    }

    /// Submit user text
    ///
    /// Returns `None` without touching the transcript when a request is
    /// already in flight or the text is blank.
    pub fn submit(&mut self, text: &str) -> Option<OutboundRequest> {
        if self.state.pending {
            tracing::debug!("request in flight, dropping submission");
            return None;
        }

        let text = text.trim();
        if text.is_empty() {
            return None;
        }

        let history = self.state.transcript.messages().to_vec();
        self.append(Message::user(text));

        self.cycle += 1;
        self.in_flight = Some(self.cycle);
        self.set_pending(true);

        tracing::info!(cycle = self.cycle, "submitted");
        Some(OutboundRequest {
            cycle: self.cycle,
            message: text.to_string(),
            history,
        })
    }

    /// Apply the outcome of the request for `cycle`
    ///
    /// Returns a hand-off to deliver later when the reply carries a plan.
    pub fn settle(&mut self, cycle: u64, outcome: Result<ReplyEnvelope>) -> Option<PendingHandoff> {
        if self.in_flight != Some(cycle) {
            tracing::debug!(cycle, "discarding settlement for stale cycle");
            return None;
        }
        self.in_flight = None;

        let (text, plan) = match outcome {
            Ok(envelope) => envelope.into_parts(),
            Err(e) => {
                tracing::warn!(cycle, error = %e, "chat turn failed");
                (self.fallback_reply.clone(), None)
            }
        };

        self.append(Message::assistant(text.as_str()));
        self.set_pending(false);
        self.output.speak(&text, &self.state);

        tracing::info!(cycle, plan_ready = plan.is_some(), "settled");
        plan.map(|plan| PendingHandoff { cycle, plan })
    }

    /// Pass a plan to the hand-off callback
    pub fn deliver_handoff(&mut self, handoff: PendingHandoff) {
        tracing::info!(cycle = handoff.cycle, "handing off itinerary");
        self.handoff.on_plan_ready(handoff.plan);
        self.events.emit(SessionEvent::PlanHandedOff);
    }

    /// Replace the transcript with a fresh greeting
    ///
    /// # Errors
    ///
    /// Returns `Error::ResetWhilePending` if a request is in flight
    pub fn reset(&mut self) -> Result<()> {
        if self.state.pending {
            tracing::debug!("reset rejected, request in flight");
            return Err(Error::ResetWhilePending);
        }

        self.state.transcript = crate::conversation::Transcript::with_greeting(&self.greeting);
        self.events
            .emit(SessionEvent::TranscriptReset(Message::assistant(&self.greeting)));
        tracing::info!("transcript reset");
        Ok(())
    }

    /// Flip the mute flag; returns the new value
    pub fn toggle_mute(&mut self) -> bool {
        let muted = !self.state.muted;
        self.set_muted(muted);
        muted
    }

    pub fn set_muted(&mut self, muted: bool) {
        if self.state.muted != muted {
            self.state.muted = muted;
            self.events.emit(SessionEvent::MuteChanged(muted));
        }
    }

    pub fn toggle_listening(&mut self) {
        let before = self.state.listening;
        self.input.toggle(&mut self.state);
        self.emit_listening(before);
    }

    /// Apply a recognition event; a recognized utterance is auto-submitted
    pub fn on_recognition(&mut self, update: RecognitionUpdate) -> Option<OutboundRequest> {
        let before = self.state.listening;
        let utterance = self.input.handle(update, &mut self.state);
        self.emit_listening(before);

        utterance.and_then(|text| self.submit(&text))
    }

    fn append(&mut self, message: Message) {
        self.state.transcript.push(message.clone());
        self.events.emit(SessionEvent::MessageAppended(message));
    }

    fn set_pending(&mut self, pending: bool) {
        self.state.pending = pending;
        self.events.emit(SessionEvent::PendingChanged(pending));
    }

    fn emit_listening(&self, before: bool) {
        if self.state.listening != before {
            self.events
                .emit(SessionEvent::ListeningChanged(self.state.listening));
        }
    }
}
