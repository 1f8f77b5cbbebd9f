//! Voice input and output
//!
//! The controllers in [`input`] and [`output`] wrap optional recognition and
//! synthesis devices behind the [`SpeechRecognizer`] and [`SpeechSynthesizer`]
//! traits. [`MicrophoneRecognizer`] and [`SpeakerSynthesizer`] are the real
//! devices: local audio plus cloud STT/TTS.

mod capture;
pub mod endpoint;
pub mod input;
mod microphone;
pub mod output;
mod playback;
mod speaker;
mod stt;
mod tts;

pub use capture::{AudioCapture, SAMPLE_RATE, samples_to_wav};
pub use endpoint::{DetectorState, Endpoint, EndpointSettings, UtteranceDetector};
pub use input::{
    RecognitionEvent, RecognitionSink, RecognitionUpdate, SpeechRecognizer, VoiceInputController,
};
pub use microphone::MicrophoneRecognizer;
pub use output::{SpeechSynthesizer, VoiceOutputController};
pub use playback::{AudioPlayback, PLAYBACK_SAMPLE_RATE, decode_mp3};
pub use speaker::SpeakerSynthesizer;
pub use stt::SpeechToText;
pub use tts::TextToSpeech;
