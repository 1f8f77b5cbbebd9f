//! Utterance endpointing
//!
//! Splits a microphone stream into utterances using local energy detection:
//! speech starts when RMS energy crosses a threshold and ends after a run of
//! trailing silence.

use super::SAMPLE_RATE;

/// Tuning for utterance endpointing, in samples at [`SAMPLE_RATE`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EndpointSettings {
    /// RMS energy above which a chunk counts as speech
    pub energy_threshold: f32,
    /// Shortest buffer accepted as an utterance
    pub min_speech_samples: usize,
    /// Silence that ends an utterance
    pub trailing_silence_samples: usize,
    /// Silence before any speech after which listening gives up
    pub no_speech_samples: usize,
    /// Utterances are cut off at this length
    pub max_utterance_samples: usize,
}

impl Default for EndpointSettings {
    fn default() -> Self {
        let rate = SAMPLE_RATE as usize;
        Self {
            energy_threshold: 0.03,
            min_speech_samples: rate * 3 / 10,
            trailing_silence_samples: rate / 2,
            no_speech_samples: rate * 8,
            max_utterance_samples: rate * 30,
        }
    }
}

/// State of the detector
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetectorState {
    /// Waiting for speech
    Waiting,
    /// Speech detected, accumulating
    Speaking,
}

/// Result of feeding a chunk to the detector
#[derive(Debug, Clone, PartialEq)]
pub enum Endpoint {
    /// Keep feeding audio
    Pending,
    /// A complete utterance
    Utterance(Vec<f32>),
    /// Nothing was said before the no-speech timeout
    NoSpeech,
}

/// Detects utterance boundaries in audio
pub struct UtteranceDetector {
    settings: EndpointSettings,
    state: DetectorState,
    speech_buffer: Vec<f32>,
    silence_counter: usize,
    waited: usize,
}

impl UtteranceDetector {
    #[must_use]
    pub fn new(settings: EndpointSettings) -> Self {
        tracing::debug!(?settings, "utterance detector initialized");

        Self {
            settings,
            state: DetectorState::Waiting,
            speech_buffer: Vec::new(),
            silence_counter: 0,
            waited: 0,
        }
    }

    /// Feed the next chunk of samples
    pub fn process(&mut self, samples: &[f32]) -> Endpoint {
        let energy = calculate_energy(samples);
        let is_speech = energy > self.settings.energy_threshold;

        match self.state {
            DetectorState::Waiting => {
                if is_speech {
                    self.state = DetectorState::Speaking;
                    self.speech_buffer.clear();
                    self.speech_buffer.extend_from_slice(samples);
                    self.silence_counter = 0;
                    tracing::trace!(energy, "speech detected");
                } else {
                    self.waited += samples.len();
                    if self.waited > self.settings.no_speech_samples {
                        tracing::debug!("no speech before timeout");
                        self.reset();
                        return Endpoint::NoSpeech;
                    }
                }
            }
            DetectorState::Speaking => {
                self.speech_buffer.extend_from_slice(samples);

                if is_speech {
                    self.silence_counter = 0;
                } else {
                    self.silence_counter += samples.len();
                }

                tracing::trace!(
                    buffer_len = self.speech_buffer.len(),
                    silence = self.silence_counter,
                    is_speech,
                    energy,
                    "speaking state"
                );

                let long_enough = self.speech_buffer.len() > self.settings.min_speech_samples;
                if (self.silence_counter > self.settings.trailing_silence_samples && long_enough)
                    || self.speech_buffer.len() >= self.settings.max_utterance_samples
                {
                    tracing::debug!(samples = self.speech_buffer.len(), "utterance complete");
                    let utterance = self.take_speech_buffer();
                    self.reset();
                    return Endpoint::Utterance(utterance);
                }

                // A blip too short to be speech, go back to waiting
                if self.silence_counter > self.settings.trailing_silence_samples * 2 {
                    tracing::trace!("discarding short blip");
                    self.state = DetectorState::Waiting;
                    self.speech_buffer.clear();
                    self.silence_counter = 0;
                }
            }
        }

        Endpoint::Pending
    }

    /// Get the accumulated speech buffer
    #[must_use]
    pub fn speech_buffer(&self) -> &[f32] {
        &self.speech_buffer
    }

    /// Take the speech buffer, clearing it
    pub fn take_speech_buffer(&mut self) -> Vec<f32> {
        std::mem::take(&mut self.speech_buffer)
    }

    /// Reset detector to the waiting state
    pub fn reset(&mut self) {
        self.state = DetectorState::Waiting;
        self.speech_buffer.clear();
        self.silence_counter = 0;
        self.waited = 0;
    }

    #[must_use]
    pub const fn state(&self) -> DetectorState {
        self.state
    }
}

/// Calculate RMS energy of audio samples
#[allow(clippy::cast_precision_loss)]
#[must_use]
pub fn calculate_energy(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }

    let sum_squares: f32 = samples.iter().map(|s| s * s).sum();
    (sum_squares / samples.len() as f32).sqrt()
}
