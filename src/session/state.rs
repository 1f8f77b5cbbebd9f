//! Session state and the events that describe its changes

use tokio::sync::mpsc;

use crate::conversation::{Message, Transcript};

/// The one owned state value of a conversation
///
/// Controllers borrow it for the duration of a call and never hold a copy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionState {
    pub(crate) transcript: Transcript,
    pub(crate) pending: bool,
    pub(crate) listening: bool,
    pub(crate) muted: bool,
}

impl SessionState {
    pub(crate) fn new(greeting: &str, muted: bool) -> Self {
        Self {
            transcript: Transcript::with_greeting(greeting),
            pending: false,
            listening: false,
            muted,
        }
    }

    #[must_use]
    pub const fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    /// A request is in flight
    #[must_use]
    pub const fn is_pending(&self) -> bool {
        self.pending
    }

    /// A recognition session is live
    #[must_use]
    pub const fn is_listening(&self) -> bool {
        self.listening
    }

    #[must_use]
    pub const fn is_muted(&self) -> bool {
        self.muted
    }
}

/// Optional runtime capability
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    Recognition,
    Synthesis,
}

impl std::fmt::Display for Capability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Recognition => f.write_str("voice input"),
            Self::Synthesis => f.write_str("voice output"),
        }
    }
}

/// User-visible advisory that does not belong in the transcript
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    CapabilityUnavailable(Capability),
}

/// State changes pushed to the UI layer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// A message was appended to the transcript
    MessageAppended(Message),
    /// The transcript was replaced by a fresh greeting
    TranscriptReset(Message),
    PendingChanged(bool),
    ListeningChanged(bool),
    MuteChanged(bool),
    Notice(Notice),
    /// An itinerary was passed to the hand-off callback
    PlanHandedOff,
}

/// Fan-out point for session events; silently drops when nobody listens
#[derive(Debug, Clone, Default)]
pub struct EventSink(Option<mpsc::UnboundedSender<SessionEvent>>);

impl EventSink {
    /// Sink that discards every event
    #[must_use]
    pub const fn none() -> Self {
        Self(None)
    }

    /// Sink paired with a receiver for the UI
    #[must_use]
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<SessionEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self(Some(tx)), rx)
    }

    pub(crate) fn emit(&self, event: SessionEvent) {
        if let Some(tx) = &self.0 {
            // UI may have gone away
            let _ = tx.send(event);
        }
    }
}
