//! Microphone-backed speech recognizer
//!
//! Captures from the default input device on a dedicated thread, cuts one
//! utterance with [`UtteranceDetector`], and transcribes it through the STT
//! API. Each recognition session yields at most one transcript.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio::runtime::Handle;

use super::endpoint::{Endpoint, EndpointSettings, UtteranceDetector};
use super::input::{RecognitionSink, SpeechRecognizer};
use super::{AudioCapture, SAMPLE_RATE, SpeechToText, samples_to_wav};
use crate::{Error, Result};

/// How often captured audio is fed to the detector
const CHUNK_INTERVAL: Duration = Duration::from_millis(100);

/// Flags shared with the capture thread of one recognition session
#[derive(Default)]
struct SessionFlags {
    stop: AtomicBool,
    abort: AtomicBool,
}

/// Speech recognizer using the local microphone and a cloud STT API
pub struct MicrophoneRecognizer {
    stt: Arc<SpeechToText>,
    settings: EndpointSettings,
    runtime: Handle,
    live: Option<Arc<SessionFlags>>,
}

impl MicrophoneRecognizer {
    /// Create a recognizer; must be called from within a Tokio runtime
    #[must_use]
    pub fn new(stt: SpeechToText, settings: EndpointSettings) -> Self {
        Self {
            stt: Arc::new(stt),
            settings,
            runtime: Handle::current(),
            live: None,
        }
    }
}

impl SpeechRecognizer for MicrophoneRecognizer {
    fn start(&mut self, sink: RecognitionSink) -> Result<()> {
        self.abort();

        let flags = Arc::new(SessionFlags::default());
        let thread_flags = Arc::clone(&flags);
        let stt = Arc::clone(&self.stt);
        let settings = self.settings;
        let runtime = self.runtime.clone();

        std::thread::Builder::new()
            .name("roam-mic".to_string())
            .spawn(move || capture_utterance(&stt, settings, &runtime, &sink, &thread_flags))
            .map_err(|e| Error::Recognition(e.to_string()))?;

        self.live = Some(flags);
        Ok(())
    }

    fn stop(&mut self) {
        if let Some(flags) = self.live.take() {
            flags.stop.store(true, Ordering::Relaxed);
        }
    }

    fn abort(&mut self) {
        if let Some(flags) = self.live.take() {
            flags.abort.store(true, Ordering::Relaxed);
        }
    }
}

impl Drop for MicrophoneRecognizer {
    fn drop(&mut self) {
        self.abort();
    }
}

/// Body of the capture thread for one recognition session
fn capture_utterance(
    stt: &Arc<SpeechToText>,
    settings: EndpointSettings,
    runtime: &Handle,
    sink: &RecognitionSink,
    flags: &Arc<SessionFlags>,
) {
    let mut capture = match AudioCapture::new().and_then(|mut c| c.start().map(|()| c)) {
        Ok(capture) => capture,
        Err(e) => {
            sink.error(e.to_string());
            return;
        }
    };

    let mut detector = UtteranceDetector::new(settings);

    let samples = loop {
        if flags.abort.load(Ordering::Relaxed) {
            return;
        }
        if flags.stop.load(Ordering::Relaxed) {
            sink.end();
            return;
        }

        std::thread::sleep(CHUNK_INTERVAL);

        let chunk = capture.take_buffer();
        if chunk.is_empty() {
            continue;
        }

        match detector.process(&chunk) {
            Endpoint::Pending => {}
            Endpoint::NoSpeech => {
                sink.end();
                return;
            }
            Endpoint::Utterance(samples) => break samples,
        }
    };

    capture.stop();

    let wav = match samples_to_wav(&samples, SAMPLE_RATE) {
        Ok(wav) => wav,
        Err(e) => {
            sink.error(e.to_string());
            return;
        }
    };

    let stt = Arc::clone(stt);
    let sink = sink.clone();
    let flags = Arc::clone(flags);
    runtime.spawn(async move {
        let result = stt.transcribe(wav).await;
        if flags.abort.load(Ordering::Relaxed) {
            return;
        }

        match result {
            Ok(text) if !text.is_empty() => {
                sink.transcript(text);
            }
            Ok(_) => {
                sink.end();
            }
            Err(e) => {
                sink.error(e.to_string());
            }
        }
    });
}
