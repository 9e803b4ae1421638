//! ElevenLabs text-to-speech client.
//!
//! Converts a short line of character speech into an audio clip and saves
//! it under the assets directory with a `<name>_<timestamp>` filename.

use std::path::PathBuf;
use std::time::Duration;

use serde_json::json;

use crate::utilities::config;
use crate::utilities::errors::GenerationError;
use crate::utilities::paths;

const BACKEND: &str = "elevenlabs";
const API_BASE: &str = "https://api.elevenlabs.io/v1";

/// ElevenLabs TTS client.
#[derive(Debug, Clone)]
pub struct ElevenLabsTts {
    api_key: Option<String>,
    /// Voice used for synthesis.
    pub voice_id: String,
    /// Synthesis model (e.g. `eleven_multilingual_v2`).
    pub model_id: String,
    /// Audio container/bitrate (e.g. `mp3_44100_128`).
    pub output_format: String,
    /// Request timeout.
    pub timeout: Duration,
}

impl ElevenLabsTts {
    /// Create a client from the environment: `VOICE_API_KEY`,
    /// `VOICE_MODEL_NAME`, `VOICE_ID`, `ELEVENLABS_OUTPUT_FORMAT`.
    pub fn new() -> Self {
        Self {
            api_key: config::env_var("VOICE_API_KEY"),
            voice_id: config::env_var("VOICE_ID")
                .unwrap_or_else(|| "21m00Tcm4TlvDq8ikWAM".to_string()),
            model_id: config::env_var("VOICE_MODEL_NAME")
                .unwrap_or_else(|| "eleven_multilingual_v2".to_string()),
            output_format: config::env_var("ELEVENLABS_OUTPUT_FORMAT")
                .unwrap_or_else(|| "mp3_44100_128".to_string()),
            timeout: Duration::from_secs(60),
        }
    }

    /// Override the voice dynamically.
    pub fn set_voice_id(&mut self, voice_id: impl Into<String>) {
        self.voice_id = voice_id.into();
    }

    /// Synthesize `text` and save the audio clip.
    ///
    /// Returns the path of the saved file: `output_path` when given,
    /// otherwise `<assets>/audios/<character>_<timestamp>.mp3`.
    ///
    /// # Errors
    /// Fails on missing credentials, transport errors, a non-success
    /// status from the API, or local IO failures while saving.
    pub async fn synthesize(
        &self,
        text: &str,
        character_name: &str,
        output_path: Option<PathBuf>,
    ) -> Result<PathBuf, GenerationError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or(GenerationError::MissingApiKey { var: "VOICE_API_KEY" })?;

        log::info!(
            "{BACKEND}: synthesizing {:?}...",
            text.chars().take(30).collect::<String>()
        );

        let client = reqwest::Client::builder().timeout(self.timeout).build()?;
        let response = client
            .post(format!("{API_BASE}/text-to-speech/{}", self.voice_id))
            .header("xi-api-key", api_key)
            .query(&[("output_format", self.output_format.as_str())])
            .json(&json!({
                "text": text,
                "model_id": self.model_id,
            }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(GenerationError::Backend {
                backend: BACKEND,
                message: format!("HTTP {status}: {message}"),
            });
        }

        let audio: bytes::Bytes = response.bytes().await?;
        let path = output_path.unwrap_or_else(|| {
            paths::audios_dir().join(paths::media_filename(character_name, "mp3"))
        });
        tokio::fs::write(&path, &audio).await?;

        log::info!("{BACKEND}: audio saved to {}", path.display());
        Ok(path)
    }
}

impl Default for ElevenLabsTts {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_api_key_is_reported_before_any_request() {
        let mut tts = ElevenLabsTts::new();
        tts.api_key = None;
        let err = tts.synthesize("Hello.", "airi", None).await.unwrap_err();
        assert!(matches!(err, GenerationError::MissingApiKey { var: "VOICE_API_KEY" }));
    }
}
