//! Voice output: one synthesis device, at most one audible utterance

use crate::Result;
use crate::session::{Capability, EventSink, Notice, SessionEvent, SessionState};

/// A speech synthesis device
pub trait SpeechSynthesizer: Send {
    /// Begin speaking `text`
    ///
    /// # Errors
    ///
    /// Returns error if the utterance cannot be started
    fn speak(&mut self, text: &str) -> Result<()>;

    /// Silence the current utterance, if any
    fn cancel(&mut self);
}

/// Owns the synthesis device and enforces cancel-before-start
pub struct VoiceOutputController {
    device: Option<Box<dyn SpeechSynthesizer>>,
    warned: bool,
    events: EventSink,
}

impl VoiceOutputController {
    #[must_use]
    pub fn new(device: Option<Box<dyn SpeechSynthesizer>>, events: EventSink) -> Self {
        Self {
            device,
            warned: false,
            events,
        }
    }

    /// Speak `text` unless the session is muted
    ///
    /// Muting only gates new utterances; one already playing keeps going.
    pub fn speak(&mut self, text: &str, state: &SessionState) {
        if state.muted {
            tracing::trace!("muted, not speaking");
            return;
        }

        let Some(device) = self.device.as_mut() else {
            if !self.warned {
                self.warned = true;
                tracing::warn!("speech synthesis unavailable");
                self.events.emit(SessionEvent::Notice(Notice::CapabilityUnavailable(
                    Capability::Synthesis,
                )));
            }
            return;
        };

        device.cancel();
        if let Err(e) = device.speak(text) {
            tracing::warn!(error = %e, "failed to speak reply");
        }
    }

    pub fn cancel(&mut self) {
        if let Some(device) = self.device.as_mut() {
            device.cancel();
        }
    }
}

impl Drop for VoiceOutputController {
    fn drop(&mut self) {
        self.cancel();
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use super::*;

    #[derive(Debug, PartialEq, Eq)]
    enum Call {
        Speak(String),
        Cancel,
    }

    struct Recorder(Arc<Mutex<Vec<Call>>>);

    impl SpeechSynthesizer for Recorder {
        fn speak(&mut self, text: &str) -> Result<()> {
            self.0.lock().unwrap().push(Call::Speak(text.to_string()));
            Ok(())
        }

        fn cancel(&mut self) {
            self.0.lock().unwrap().push(Call::Cancel);
        }
    }

    fn controller() -> (VoiceOutputController, Arc<Mutex<Vec<Call>>>) {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let output =
            VoiceOutputController::new(Some(Box::new(Recorder(Arc::clone(&calls)))), EventSink::none());
        (output, calls)
    }

    #[test]
    fn speak_cancels_previous_utterance_first() {
        let (mut output, calls) = controller();
        let state = SessionState::new("hi", false);

        output.speak("one", &state);
        output.speak("two", &state);

        assert_eq!(
            *calls.lock().unwrap(),
            [
                Call::Cancel,
                Call::Speak("one".to_string()),
                Call::Cancel,
                Call::Speak("two".to_string()),
            ]
        );
    }

    #[test]
    fn muted_speak_does_nothing() {
        let (mut output, calls) = controller();
        let state = SessionState::new("hi", true);

        output.speak("quiet", &state);
        assert!(calls.lock().unwrap().is_empty());
    }

    #[test]
    fn missing_device_warns_once() {
        let (events, mut rx) = EventSink::channel();
        let mut output = VoiceOutputController::new(None, events);
        let state = SessionState::new("hi", false);

        output.speak("one", &state);
        output.speak("two", &state);

        assert_eq!(
            rx.try_recv().unwrap(),
            SessionEvent::Notice(Notice::CapabilityUnavailable(Capability::Synthesis))
        );
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn drop_cancels_playback() {
        let (output, calls) = controller();
        drop(output);
        assert_eq!(*calls.lock().unwrap(), [Call::Cancel]);
    }
}
