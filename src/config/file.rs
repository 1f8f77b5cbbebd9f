//! TOML configuration file loading
//!
//! Supports `~/.config/roam/config.toml` as a persistent config source.
//! All fields are optional; the file is a partial overlay on top of defaults.

use std::path::{Path, PathBuf};

use serde::Deserialize;

/// Top-level TOML configuration file schema
#[derive(Debug, Default, Deserialize)]
pub struct RoamConfigFile {
    /// Planner backend connection
    #[serde(default)]
    pub api: ApiFileConfig,

    /// Conversation behaviour
    #[serde(default)]
    pub session: SessionFileConfig,

    /// Voice input/output
    #[serde(default)]
    pub voice: VoiceFileConfig,
}

/// Planner backend configuration
#[derive(Debug, Default, Deserialize)]
pub struct ApiFileConfig {
    /// Backend base URL (e.g. "http://localhost:8000")
    pub url: Option<String>,

    /// Bearer token for the backend
    pub token: Option<String>,

    /// Seconds to wait for a chat reply
    pub request_timeout_secs: Option<u64>,
}

/// Conversation configuration
#[derive(Debug, Default, Deserialize)]
pub struct SessionFileConfig {
    /// Opening assistant message
    pub greeting: Option<String>,

    /// Assistant message shown when the backend is unreachable
    pub fallback_reply: Option<String>,

    /// Milliseconds between the closing remark and the plan hand-off
    pub handoff_delay_ms: Option<u64>,

    /// Start with voice output muted
    pub muted: Option<bool>,
}

/// Voice configuration
#[derive(Debug, Default, Deserialize)]
pub struct VoiceFileConfig {
    /// Enable voice input/output
    pub enabled: Option<bool>,

    /// OpenAI-compatible API root for STT/TTS
    pub api_url: Option<String>,

    /// API key for STT/TTS
    pub api_key: Option<String>,

    /// STT model (e.g. "whisper-1")
    pub stt_model: Option<String>,

    /// TTS model (e.g. "tts-1")
    pub tts_model: Option<String>,

    /// TTS voice identifier (e.g. "alloy")
    pub tts_voice: Option<String>,

    /// TTS speed multiplier
    pub tts_speed: Option<f32>,
}

/// Load the TOML config file from the standard path
///
/// Returns `RoamConfigFile::default()` if the file doesn't exist or can't be parsed.
pub fn load_config_file() -> RoamConfigFile {
    config_file_path().map_or_else(RoamConfigFile::default, |path| load_config_file_from(&path))
}

/// Load the TOML config file at `path`, falling back to defaults
pub fn load_config_file_from(path: &Path) -> RoamConfigFile {
    if !path.exists() {
        return RoamConfigFile::default();
    }

    match std::fs::read_to_string(path) {
        Ok(content) => match toml::from_str(&content) {
            Ok(config) => {
                tracing::info!(path = %path.display(), "loaded config file");
                config
            }
            Err(e) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %e,
                    "failed to parse config file, using defaults"
                );
                RoamConfigFile::default()
            }
        },
        Err(e) => {
            tracing::warn!(
                path = %path.display(),
                error = %e,
                "failed to read config file"
            );
            RoamConfigFile::default()
        }
    }
}

/// Return the config file path: `~/.config/roam/config.toml`
pub fn config_file_path() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|d| d.config_dir().join("roam").join("config.toml"))
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn missing_file_gives_defaults() {
        let config = load_config_file_from(Path::new("/nonexistent/roam/config.toml"));
        assert!(config.api.url.is_none());
        assert!(config.voice.enabled.is_none());
    }

    #[test]
    fn partial_file_overlays() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "[api]\nurl = \"https://planner.example\"\n\n[session]\nhandoff_delay_ms = 500"
        )
        .unwrap();

        let config = load_config_file_from(file.path());
        assert_eq!(config.api.url.as_deref(), Some("https://planner.example"));
        assert_eq!(config.session.handoff_delay_ms, Some(500));
        assert!(config.session.greeting.is_none());
    }

    #[test]
    fn invalid_file_gives_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[api\nurl = ").unwrap();

        let config = load_config_file_from(file.path());
        assert!(config.api.url.is_none());
    }
}
