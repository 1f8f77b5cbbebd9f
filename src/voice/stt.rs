//! Speech-to-text via a Whisper-compatible transcription API

use secrecy::{ExposeSecret, SecretString};

use crate::{Error, Result};

/// Response from the transcription API
#[derive(serde::Deserialize)]
struct TranscriptionResponse {
    text: String,
}

/// Transcribes WAV audio to text
pub struct SpeechToText {
    client: reqwest::Client,
    base_url: String,
    api_key: SecretString,
    model: String,
}

impl SpeechToText {
    /// Create a new STT client
    ///
    /// `base_url` is the API root, e.g. `https://api.openai.com/v1`.
    ///
    /// # Errors
    ///
    /// Returns error if the API key is empty
    pub fn new(base_url: &str, api_key: SecretString, model: String) -> Result<Self> {
        if api_key.expose_secret().is_empty() {
            return Err(Error::Config(
                "API key required for speech recognition".to_string(),
            ));
        }

        Ok(Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            model,
        })
    }

    /// Transcribe WAV bytes to text
    ///
    /// # Errors
    ///
    /// Returns error if the request fails or the API rejects it
    pub async fn transcribe(&self, wav: Vec<u8>) -> Result<String> {
        tracing::debug!(audio_bytes = wav.len(), "starting transcription");

        let form = reqwest::multipart::Form::new()
            .part(
                "file",
                reqwest::multipart::Part::bytes(wav)
                    .file_name("audio.wav")
                    .mime_str("audio/wav")
                    .map_err(|e| Error::Stt(e.to_string()))?,
            )
            .text("model", self.model.clone());

        let response = self
            .client
            .post(format!("{}/audio/transcriptions", self.base_url))
            .bearer_auth(self.api_key.expose_secret())
            .multipart(form)
            .send()
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "transcription request failed");
                e
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!(status = %status, body = %body, "transcription API error");
            return Err(Error::Stt(format!("transcription API error {status}: {body}")));
        }

        let result: TranscriptionResponse = response.json().await?;
        let text = result.text.trim().to_string();

        tracing::info!(transcript = %text, "transcription complete");
        Ok(text)
    }
}
