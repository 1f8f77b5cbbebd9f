//! Voice pipeline integration tests
//!
//! Tests voice components without requiring audio hardware

use std::io::Cursor;

use roam_chat::voice::{
    DetectorState, Endpoint, EndpointSettings, SAMPLE_RATE, UtteranceDetector, samples_to_wav,
};

/// Generate sine wave audio samples
fn generate_sine_samples(frequency: f32, duration_secs: f32, amplitude: f32) -> Vec<f32> {
    let num_samples = (SAMPLE_RATE as f32 * duration_secs) as usize;
    (0..num_samples)
        .map(|i| {
            let t = i as f32 / SAMPLE_RATE as f32;
            amplitude * (2.0 * std::f32::consts::PI * frequency * t).sin()
        })
        .collect()
}

/// Generate silence
fn generate_silence(duration_secs: f32) -> Vec<f32> {
    let num_samples = (SAMPLE_RATE as f32 * duration_secs) as usize;
    vec![0.0; num_samples]
}

fn detector() -> UtteranceDetector {
    UtteranceDetector::new(EndpointSettings::default())
}

#[test]
fn test_detector_starts_waiting() {
    let detector = detector();
    assert_eq!(detector.state(), DetectorState::Waiting);
    assert!(detector.speech_buffer().is_empty());
}

#[test]
fn test_silence_keeps_waiting() {
    let mut detector = detector();

    let silence = generate_silence(0.1);
    assert_eq!(detector.process(&silence), Endpoint::Pending);
    assert_eq!(detector.state(), DetectorState::Waiting);
    assert!(detector.speech_buffer().is_empty());
}

#[test]
fn test_utterance_ends_after_trailing_silence() {
    let mut detector = detector();

    // Loud samples - should start speaking
    let speech = generate_sine_samples(440.0, 0.5, 0.3);
    assert_eq!(detector.process(&speech), Endpoint::Pending);
    assert_eq!(detector.state(), DetectorState::Speaking);

    let more_speech = generate_sine_samples(440.0, 0.3, 0.3);
    assert_eq!(detector.process(&more_speech), Endpoint::Pending);

    // Trailing silence completes the utterance, silence included
    let silence = generate_silence(0.6);
    match detector.process(&silence) {
        Endpoint::Utterance(samples) => {
            assert_eq!(samples.len(), speech.len() + more_speech.len() + silence.len());
        }
        other => panic!("expected utterance, got {other:?}"),
    }

    assert_eq!(detector.state(), DetectorState::Waiting);
    assert!(detector.speech_buffer().is_empty());
}

#[test]
fn test_short_pause_does_not_end_utterance() {
    let mut detector = detector();

    detector.process(&generate_sine_samples(440.0, 0.5, 0.3));
    assert_eq!(detector.process(&generate_silence(0.2)), Endpoint::Pending);
    assert_eq!(
        detector.process(&generate_sine_samples(440.0, 0.3, 0.3)),
        Endpoint::Pending
    );
    assert_eq!(detector.state(), DetectorState::Speaking);
}

#[test]
fn test_gives_up_without_speech() {
    let mut detector = detector();
    let second = generate_silence(1.0);

    for _ in 0..8 {
        assert_eq!(detector.process(&second), Endpoint::Pending);
    }
    assert_eq!(detector.process(&second), Endpoint::NoSpeech);
    assert_eq!(detector.state(), DetectorState::Waiting);

    // Timeout starts over after giving up
    assert_eq!(detector.process(&second), Endpoint::Pending);
}

#[test]
fn test_speech_buffer_accumulation() {
    let mut detector = detector();

    let chunk1 = generate_sine_samples(440.0, 0.1, 0.3);
    detector.process(&chunk1);

    let chunk2 = generate_sine_samples(440.0, 0.1, 0.3);
    detector.process(&chunk2);

    // Buffer should contain both chunks
    let buffer = detector.speech_buffer();
    assert_eq!(buffer.len(), chunk1.len() + chunk2.len());
}

#[test]
fn test_take_speech_buffer() {
    let mut detector = detector();

    let speech = generate_sine_samples(440.0, 0.1, 0.3);
    detector.process(&speech);

    let taken = detector.take_speech_buffer();
    assert_eq!(taken.len(), speech.len());

    // Buffer should be empty after take
    assert!(detector.speech_buffer().is_empty());
}

#[test]
fn test_detector_reset() {
    let mut detector = detector();

    detector.process(&generate_sine_samples(440.0, 0.2, 0.3));
    assert_eq!(detector.state(), DetectorState::Speaking);

    detector.reset();
    assert_eq!(detector.state(), DetectorState::Waiting);
    assert!(detector.speech_buffer().is_empty());
}

#[test]
fn test_samples_to_wav() {
    let samples = generate_sine_samples(440.0, 0.1, 0.5);
    let wav_data = samples_to_wav(&samples, SAMPLE_RATE).unwrap();

    // Check WAV header magic
    assert_eq!(&wav_data[0..4], b"RIFF");
    assert_eq!(&wav_data[8..12], b"WAVE");

    // WAV should have reasonable size
    assert!(wav_data.len() > 44); // WAV header is 44 bytes
}

#[test]
fn test_wav_roundtrip() {
    let original_samples: Vec<f32> = vec![0.0, 0.5, -0.5, 1.0, -1.0, 0.25];
    let wav_data = samples_to_wav(&original_samples, SAMPLE_RATE).unwrap();

    // Read WAV back
    let cursor = Cursor::new(wav_data);
    let mut reader = hound::WavReader::new(cursor).unwrap();

    let spec = reader.spec();
    assert_eq!(spec.sample_rate, SAMPLE_RATE);
    assert_eq!(spec.channels, 1);
    assert_eq!(spec.bits_per_sample, 16);

    // Read samples back
    let read_samples: Vec<i16> = reader.samples::<i16>().map(|s| s.unwrap()).collect();
    assert_eq!(read_samples.len(), original_samples.len());
    assert_eq!(read_samples[0], 0);
    assert_eq!(read_samples[3], 32767);
}
