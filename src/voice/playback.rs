//! Audio playback to speakers

use std::io::Cursor;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{SampleRate, StreamConfig};

use crate::{Error, Result};

/// Sample rate for playback (matches common TTS output)
pub const PLAYBACK_SAMPLE_RATE: u32 = 24000;

/// How often blocking playback checks for completion or cancellation
const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Plays mono audio to the default output device
///
/// Only the stream configuration is kept, so the value is `Send` and a
/// fresh stream is built on whichever thread calls [`Self::play_blocking`].
#[derive(Debug, Clone)]
pub struct AudioPlayback {
    config: StreamConfig,
}

impl AudioPlayback {
    /// Probe the default output device
    ///
    /// # Errors
    ///
    /// Returns error if no output device supports the playback rate
    pub fn new() -> Result<Self> {
        let device = cpal::default_host()
            .default_output_device()
            .ok_or_else(|| Error::Audio("no output device available".to_string()))?;

        let supported_config = device
            .supported_output_configs()
            .map_err(|e| Error::Audio(e.to_string()))?
            .filter(|c| {
                c.channels() <= 2
                    && c.min_sample_rate() <= SampleRate(PLAYBACK_SAMPLE_RATE)
                    && c.max_sample_rate() >= SampleRate(PLAYBACK_SAMPLE_RATE)
            })
            .min_by_key(cpal::SupportedStreamConfigRange::channels)
            .ok_or_else(|| Error::Audio("no suitable output config found".to_string()))?;

        let config = supported_config
            .with_sample_rate(SampleRate(PLAYBACK_SAMPLE_RATE))
            .config();

        tracing::debug!(
            device = device.name().unwrap_or_default(),
            sample_rate = PLAYBACK_SAMPLE_RATE,
            channels = config.channels,
            "audio playback initialized"
        );

        Ok(Self { config })
    }

    /// Play samples, returning when they finish or `cancel` is set
    ///
    /// Blocks the calling thread; run it under `spawn_blocking`.
    ///
    /// # Errors
    ///
    /// Returns error if the output stream cannot be built or started
    pub fn play_blocking(&self, samples: Vec<f32>, cancel: &AtomicBool) -> Result<()> {
        if samples.is_empty() {
            return Ok(());
        }

        let device = cpal::default_host()
            .default_output_device()
            .ok_or_else(|| Error::Audio("no output device".to_string()))?;

        let channels = usize::from(self.config.channels).max(1);
        let sample_count = samples.len();
        let samples = Arc::new(samples);
        let position = Arc::new(AtomicUsize::new(0));

        let stream_samples = Arc::clone(&samples);
        let stream_position = Arc::clone(&position);

        let stream = device
            .build_output_stream(
                &self.config,
                move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                    let mut pos = stream_position.load(Ordering::Relaxed);
                    for frame in data.chunks_mut(channels) {
                        let sample = stream_samples.get(pos).copied().unwrap_or(0.0);
                        frame.fill(sample);
                        if pos < stream_samples.len() {
                            pos += 1;
                        }
                    }
                    stream_position.store(pos, Ordering::Relaxed);
                },
                |err| {
                    tracing::error!(error = %err, "audio playback error");
                },
                None,
            )
            .map_err(|e| Error::Audio(e.to_string()))?;

        stream.play().map_err(|e| Error::Audio(e.to_string()))?;

        let duration_ms = (sample_count as u64 * 1000) / u64::from(PLAYBACK_SAMPLE_RATE);
        let deadline = Instant::now() + Duration::from_millis(duration_ms + 500);

        while position.load(Ordering::Relaxed) < sample_count {
            if cancel.load(Ordering::Relaxed) {
                tracing::debug!("playback cancelled");
                break;
            }
            if Instant::now() > deadline {
                break;
            }
            std::thread::sleep(POLL_INTERVAL);
        }

        drop(stream);
        tracing::debug!(samples = sample_count, "playback finished");

        Ok(())
    }
}

/// Decode MP3 bytes to mono f32 samples
///
/// # Errors
///
/// Returns error if the data is not valid MP3
pub fn decode_mp3(mp3_data: &[u8]) -> Result<Vec<f32>> {
    let mut decoder = minimp3::Decoder::new(Cursor::new(mp3_data));
    let mut samples = Vec::new();

    loop {
        match decoder.next_frame() {
            Ok(frame) => {
                if frame.channels == 2 {
                    samples.extend(frame.data.chunks(2).map(|chunk| {
                        let left = f32::from(chunk[0]) / 32768.0;
                        let right = f32::from(chunk.get(1).copied().unwrap_or(chunk[0])) / 32768.0;
                        f32::midpoint(left, right)
                    }));
                } else {
                    samples.extend(frame.data.iter().map(|&s| f32::from(s) / 32768.0));
                }
            }
            Err(minimp3::Error::Eof) => break,
            Err(e) => return Err(Error::Audio(format!("MP3 decode error: {e}"))),
        }
    }

    Ok(samples)
}

