//! Conversation backend client
//!
//! Sends the new user message together with the prior transcript and turns
//! whatever comes back into a [`ReplyEnvelope`] or a single error.

use std::sync::Arc;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use url::Url;

use crate::config::ApiConfig;
use crate::conversation::{Message, ReplyEnvelope};
use crate::{Error, Result};

/// Path of the conversational endpoint relative to the API base URL
const CHAT_PATH: &str = "api/chat";

/// Path of the liveness endpoint relative to the API base URL
const HEALTH_PATH: &str = "health";

/// Something that can exchange one chat turn with the backend
#[async_trait]
pub trait ConversationClient: Send + Sync {
    /// Send `message` with `history` (everything before it) as context
    ///
    /// # Errors
    ///
    /// Returns error on transport failure, non-success status or a reply
    /// that does not parse into an envelope
    async fn send(&self, message: &str, history: &[Message]) -> Result<ReplyEnvelope>;
}

/// Source of the bearer credential for backend requests
pub trait Credentials: Send + Sync {
    /// Current bearer token, if the user is signed in
    fn bearer_token(&self) -> Option<SecretString>;
}

/// Fixed token, typically from config or the environment
#[derive(Debug, Clone, Default)]
pub struct StaticToken(Option<SecretString>);

impl StaticToken {
    #[must_use]
    pub const fn new(token: Option<SecretString>) -> Self {
        Self(token)
    }
}

impl Credentials for StaticToken {
    fn bearer_token(&self) -> Option<SecretString> {
        self.0.clone()
    }
}

#[derive(serde::Serialize)]
struct ChatRequest<'a> {
    message: &'a str,
    history: &'a [Message],
}

/// HTTP client for the itinerary planner backend
pub struct HttpConversationClient {
    client: reqwest::Client,
    chat_url: Url,
    health_url: Url,
    credentials: Arc<dyn Credentials>,
}

impl HttpConversationClient {
    /// Create a client for the backend at `base_url`
    ///
    /// # Errors
    ///
    /// Returns error if `base_url` is not a valid absolute URL
    pub fn new(base_url: &str, credentials: Arc<dyn Credentials>) -> Result<Self> {
        let mut base = Url::parse(base_url)?;
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }

        Ok(Self {
            client: reqwest::Client::new(),
            chat_url: base.join(CHAT_PATH)?,
            health_url: base.join(HEALTH_PATH)?,
            credentials,
        })
    }

    /// Create a client from API configuration
    ///
    /// # Errors
    ///
    /// Returns error if the configured base URL is invalid
    pub fn from_config(config: &ApiConfig) -> Result<Self> {
        Self::new(
            &config.base_url,
            Arc::new(StaticToken::new(config.token.clone())),
        )
    }

    /// URL chat turns are posted to
    #[must_use]
    pub const fn chat_url(&self) -> &Url {
        &self.chat_url
    }

    /// Check that the backend is reachable
    ///
    /// # Errors
    ///
    /// Returns error if the request fails or the status is not a success
    pub async fn health(&self) -> Result<()> {
        let response = self.client.get(self.health_url.clone()).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(Error::Transport(format!("health check returned {status}")));
        }

        tracing::debug!(url = %self.health_url, "backend healthy");
        Ok(())
    }
}

#[async_trait]
impl ConversationClient for HttpConversationClient {
    async fn send(&self, message: &str, history: &[Message]) -> Result<ReplyEnvelope> {
        tracing::debug!(
            url = %self.chat_url,
            history_len = history.len(),
            "sending chat turn"
        );

        let mut request = self
            .client
            .post(self.chat_url.clone())
            .json(&ChatRequest { message, history });

        if let Some(token) = self.credentials.bearer_token() {
            request = request.bearer_auth(token.expose_secret());
        }

        let response = request.send().await.map_err(|e| {
            tracing::warn!(error = %e, "chat request failed");
            Error::Transport(e.to_string())
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::warn!(status = %status, body = %body, "chat backend error");
            return Err(Error::Transport(format!("backend returned {status}")));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| Error::Transport(e.to_string()))?;

        let envelope = ReplyEnvelope::from_slice(&body).map_err(|e| {
            tracing::warn!(error = %e, "unparsable chat reply");
            e
        })?;

        tracing::debug!(action = ?envelope.action(), "chat reply received");
        Ok(envelope)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn joins_paths_onto_bare_host() {
        let client =
            HttpConversationClient::new("http://localhost:8000", Arc::new(StaticToken::default()))
                .unwrap();
        assert_eq!(client.chat_url().as_str(), "http://localhost:8000/api/chat");
    }

    #[test]
    fn keeps_base_path_prefix() {
        let client = HttpConversationClient::new(
            "https://example.com/planner",
            Arc::new(StaticToken::default()),
        )
        .unwrap();
        assert_eq!(
            client.chat_url().as_str(),
            "https://example.com/planner/api/chat"
        );
    }

    #[test]
    fn rejects_relative_base_url() {
        let result = HttpConversationClient::new("localhost", Arc::new(StaticToken::default()));
        assert!(matches!(result, Err(Error::Url(_))));
    }

    #[test]
    fn static_token_hands_out_token() {
        let token = StaticToken::new(Some(SecretString::from("abc".to_string())));
        assert_eq!(token.bearer_token().unwrap().expose_secret(), "abc");
        assert!(StaticToken::default().bearer_token().is_none());
    }
}
