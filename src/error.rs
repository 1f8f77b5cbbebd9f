//! Error types for Roam chat

use std::time::Duration;

use thiserror::Error;

/// Result type alias for Roam operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in the chat front-end
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// Conversation backend rejected or failed the request
    #[error("transport error: {0}")]
    Transport(String),

    /// Backend reply did not match the expected envelope
    #[error("malformed reply: {0}")]
    MalformedReply(String),

    /// Backend did not answer in time
    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    /// Audio device error
    #[error("audio error: {0}")]
    Audio(String),

    /// Speech-to-text error
    #[error("STT error: {0}")]
    Stt(String),

    /// Text-to-speech error
    #[error("TTS error: {0}")]
    Tts(String),

    /// Speech recognition device error
    #[error("recognition error: {0}")]
    Recognition(String),

    /// Reset attempted while a request is in flight
    #[error("cannot reset while a request is in flight")]
    ResetWhilePending,

    /// Session event loop has shut down
    #[error("session closed")]
    SessionClosed,

    /// HTTP error
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// URL parsing error
    #[error("invalid url: {0}")]
    Url(#[from] url::ParseError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bad_url_converts() {
        let parse = || -> Result<url::Url> { Ok(url::Url::parse("not a url")?) };
        assert!(matches!(parse(), Err(Error::Url(_))));
    }

    #[test]
    fn timeout_display_names_bound() {
        let err = Error::Timeout(Duration::from_secs(30));
        assert_eq!(err.to_string(), "request timed out after 30s");
    }
}
