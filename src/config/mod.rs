//! Configuration management for Roam chat
//!
//! Every value resolves env > TOML file > default.

pub mod file;

use std::path::Path;
use std::time::Duration;

use secrecy::SecretString;

use file::RoamConfigFile;

/// Default planner backend URL
pub const DEFAULT_API_URL: &str = "http://localhost:8000";

/// Default opening assistant message
pub const DEFAULT_GREETING: &str =
    "Hi! I'm your AI travel planner. Where would you like to go, and for how many days?";

/// Default assistant message when the backend can't be reached
pub const DEFAULT_FALLBACK_REPLY: &str =
    "Sorry, I'm currently offline. Please try again in a moment.";

/// Default bound on a single chat request
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Default pause between the closing remark and the plan hand-off
pub const DEFAULT_HANDOFF_DELAY: Duration = Duration::from_millis(1500);

/// Roam chat configuration
#[derive(Debug, Clone, Default)]
pub struct Config {
    /// Planner backend connection
    pub api: ApiConfig,

    /// Conversation behaviour
    pub session: SessionConfig,

    /// Voice input/output
    pub voice: VoiceConfig,
}

/// Planner backend configuration
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Backend base URL
    pub base_url: String,

    /// Bearer token (from `ROAM_API_TOKEN`)
    pub token: Option<SecretString>,

    /// Bound on a single chat request; expiry counts as a transport failure
    pub request_timeout: Duration,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_API_URL.to_string(),
            token: None,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }
}

/// Conversation configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    /// Opening assistant message
    pub greeting: String,

    /// Assistant message appended when a chat turn fails
    pub fallback_reply: String,

    /// Pause between the closing remark and the plan hand-off
    pub handoff_delay: Duration,

    /// Start with voice output muted
    pub start_muted: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            greeting: DEFAULT_GREETING.to_string(),
            fallback_reply: DEFAULT_FALLBACK_REPLY.to_string(),
            handoff_delay: DEFAULT_HANDOFF_DELAY,
            start_muted: false,
        }
    }
}

/// Voice processing configuration
#[derive(Debug, Clone)]
pub struct VoiceConfig {
    /// Enable voice input/output
    pub enabled: bool,

    /// OpenAI-compatible API root for STT/TTS
    pub api_url: String,

    /// API key for STT/TTS (`OPENAI_API_KEY`)
    pub api_key: Option<SecretString>,

    /// STT model (e.g. "whisper-1")
    pub stt_model: String,

    /// TTS model (e.g. "tts-1")
    pub tts_model: String,

    /// TTS voice identifier
    pub tts_voice: String,

    /// TTS speed multiplier (0.25 to 4.0)
    pub tts_speed: f32,
}

impl Default for VoiceConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            api_url: "https://api.openai.com/v1".to_string(),
            api_key: None,
            stt_model: "whisper-1".to_string(),
            tts_model: "tts-1".to_string(),
            tts_voice: "alloy".to_string(),
            tts_speed: 1.0,
        }
    }
}

impl Config {
    /// Load configuration from the environment and the standard config file
    #[must_use]
    pub fn load() -> Self {
        Self::load_with_options(None, false)
    }

    /// Load configuration with an explicit config file and voice switch
    #[must_use]
    pub fn load_with_options(config_path: Option<&Path>, disable_voice: bool) -> Self {
        let fc = config_path.map_or_else(file::load_config_file, file::load_config_file_from);
        Self::from_sources(|key| std::env::var(key).ok(), fc, disable_voice)
    }

    /// Resolve configuration from an env lookup and a parsed config file
    #[must_use]
    pub fn from_sources(
        env: impl Fn(&str) -> Option<String>,
        fc: RoamConfigFile,
        disable_voice: bool,
    ) -> Self {
        let defaults = Self::default();

        // Backend (env > toml > default)
        let api = ApiConfig {
            base_url: env("ROAM_API_URL")
                .or(fc.api.url)
                .unwrap_or(defaults.api.base_url),
            token: non_empty(env("ROAM_API_TOKEN"))
                .or_else(|| non_empty(fc.api.token))
                .map(SecretString::from),
            request_timeout: env("ROAM_REQUEST_TIMEOUT_SECS")
                .and_then(|s| s.parse().ok())
                .or(fc.api.request_timeout_secs)
                .and_then(|secs: u64| {
                    if secs == 0 {
                        tracing::warn!("request timeout of 0s ignored, using default");
                        None
                    } else {
                        Some(Duration::from_secs(secs))
                    }
                })
                .unwrap_or(defaults.api.request_timeout),
        };

        // Conversation (env > toml > default)
        let session = SessionConfig {
            greeting: env("ROAM_GREETING")
                .or(fc.session.greeting)
                .unwrap_or(defaults.session.greeting),
            fallback_reply: fc
                .session
                .fallback_reply
                .unwrap_or(defaults.session.fallback_reply),
            handoff_delay: env("ROAM_HANDOFF_DELAY_MS")
                .and_then(|s| s.parse().ok())
                .or(fc.session.handoff_delay_ms)
                .map_or(defaults.session.handoff_delay, Duration::from_millis),
            start_muted: fc.session.muted.unwrap_or(defaults.session.start_muted),
        };

        // Voice (flag > env > toml > default)
        let env_disabled = env("ROAM_DISABLE_VOICE")
            .is_some_and(|v| v == "1" || v.eq_ignore_ascii_case("true"));
        let voice_enabled = if disable_voice || env_disabled {
            tracing::info!("voice explicitly disabled");
            false
        } else {
            fc.voice.enabled.unwrap_or(defaults.voice.enabled)
        };
        let voice = VoiceConfig {
            enabled: voice_enabled,
            api_url: env("ROAM_VOICE_API_URL")
                .or(fc.voice.api_url)
                .unwrap_or(defaults.voice.api_url),
            api_key: non_empty(env("OPENAI_API_KEY"))
                .or_else(|| non_empty(fc.voice.api_key))
                .map(SecretString::from),
            stt_model: env("ROAM_STT_MODEL")
                .or(fc.voice.stt_model)
                .unwrap_or(defaults.voice.stt_model),
            tts_model: env("ROAM_TTS_MODEL")
                .or(fc.voice.tts_model)
                .unwrap_or(defaults.voice.tts_model),
            tts_voice: env("ROAM_TTS_VOICE")
                .or(fc.voice.tts_voice)
                .unwrap_or(defaults.voice.tts_voice),
            tts_speed: fc
                .voice
                .tts_speed
                .unwrap_or(defaults.voice.tts_speed)
                .clamp(0.25, 4.0),
        };

        Self {
            api,
            session,
            voice,
        }
    }
}

/// Treat an empty credential as unset
fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}
