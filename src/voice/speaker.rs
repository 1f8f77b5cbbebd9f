//! Speaker-backed speech synthesizer

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::runtime::Handle;
use tokio::task::JoinHandle;

use super::output::SpeechSynthesizer;
use super::{AudioPlayback, TextToSpeech, decode_mp3};
use crate::Result;

/// The utterance currently being synthesized or played
struct Utterance {
    cancel: Arc<AtomicBool>,
    task: JoinHandle<()>,
}

/// Speech synthesizer using a cloud TTS API and the local speakers
pub struct SpeakerSynthesizer {
    tts: Arc<TextToSpeech>,
    playback: AudioPlayback,
    runtime: Handle,
    current: Option<Utterance>,
}

impl SpeakerSynthesizer {
    /// Create a synthesizer; must be called from within a Tokio runtime
    #[must_use]
    pub fn new(tts: TextToSpeech, playback: AudioPlayback) -> Self {
        Self {
            tts: Arc::new(tts),
            playback,
            runtime: Handle::current(),
            current: None,
        }
    }
}

impl SpeechSynthesizer for SpeakerSynthesizer {
    fn speak(&mut self, text: &str) -> Result<()> {
        self.cancel();

        let cancel = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&cancel);
        let tts = Arc::clone(&self.tts);
        let playback = self.playback.clone();
        let text = text.to_string();

        let task = self.runtime.spawn(async move {
            let audio = match tts.synthesize(&text).await {
                Ok(audio) => audio,
                Err(e) => {
                    tracing::warn!(error = %e, "speech synthesis failed");
                    return;
                }
            };

            let samples = match decode_mp3(&audio) {
                Ok(samples) => samples,
                Err(e) => {
                    tracing::warn!(error = %e, "failed to decode speech audio");
                    return;
                }
            };

            if flag.load(Ordering::Relaxed) {
                return;
            }

            let played =
                tokio::task::spawn_blocking(move || playback.play_blocking(samples, &flag)).await;
            match played {
                Ok(Ok(())) => {}
                Ok(Err(e)) => tracing::warn!(error = %e, "speech playback failed"),
                Err(e) => tracing::warn!(error = %e, "speech playback task failed"),
            }
        });

        self.current = Some(Utterance { cancel, task });
        Ok(())
    }

    fn cancel(&mut self) {
        if let Some(utterance) = self.current.take() {
            utterance.cancel.store(true, Ordering::Relaxed);
            utterance.task.abort();
        }
    }
}

impl Drop for SpeakerSynthesizer {
    fn drop(&mut self) {
        self.cancel();
    }
}
