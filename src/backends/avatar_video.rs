//! VisionStory talking-avatar video client.
//!
//! Uploads a portrait as a named avatar, then drives that avatar with
//! either a text script (the service synthesizes the voice) or an inline
//! audio clip. Video creation is asynchronous on the service side; the
//! client polls the video endpoint until the clip is ready.

use std::path::Path;
use std::time::Duration;

use base64::Engine;
use serde_json::{json, Value};

use crate::utilities::config;
use crate::utilities::errors::GenerationError;

const BACKEND: &str = "visionstory";
const VIDEO_URL: &str = "https://openapi.visionstory.ai/api/v1/video";
const AVATAR_URL: &str = "https://openapi.visionstory.ai/api/v1/avatar";

/// Rendering options for a video request.
#[derive(Debug, Clone)]
pub struct VideoOptions {
    pub aspect_ratio: String,
    pub resolution: String,
    pub voice_id: String,
    pub model_id: String,
}

impl Default for VideoOptions {
    fn default() -> Self {
        Self {
            aspect_ratio: "9:16".to_string(),
            resolution: "720p".to_string(),
            voice_id: "Alice".to_string(),
            model_id: "vs_talk_v1".to_string(),
        }
    }
}

/// A finished video as reported by the status endpoint.
#[derive(Debug, Clone)]
pub struct VideoResult {
    pub video_id: String,
    pub video_url: String,
}

/// VisionStory API client.
#[derive(Debug, Clone)]
pub struct VisionStory {
    api_key: Option<String>,
    /// Maximum status polling attempts (one every `poll_delay`).
    pub poll_attempts: u32,
    /// Delay between status polls.
    pub poll_delay: Duration,
    /// Per-request timeout.
    pub timeout: Duration,
}

impl VisionStory {
    /// Create a client from the environment (`VISIONSTORY_API_KEY`, with
    /// `VS_API_KEY` as the legacy fallback).
    pub fn new() -> Self {
        Self {
            api_key: config::env_var("VISIONSTORY_API_KEY").or_else(|| config::env_var("VS_API_KEY")),
            poll_attempts: 24,
            poll_delay: Duration::from_secs(5),
            timeout: Duration::from_secs(60),
        }
    }

    fn api_key(&self) -> Result<&str, GenerationError> {
        self.api_key
            .as_deref()
            .ok_or(GenerationError::MissingApiKey { var: "VISIONSTORY_API_KEY" })
    }

    fn http_client(&self) -> Result<reqwest::Client, GenerationError> {
        Ok(reqwest::Client::builder().timeout(self.timeout).build()?)
    }

    /// Base64-encode media from a local path or an http(s) URL.
    pub async fn encode_base64(&self, source: &str) -> Result<String, GenerationError> {
        let bytes = if source.starts_with("http://") || source.starts_with("https://") {
            self.http_client()?
                .get(source)
                .send()
                .await?
                .bytes()
                .await?
                .to_vec()
        } else {
            tokio::fs::read(source).await?
        };
        Ok(base64::engine::general_purpose::STANDARD.encode(bytes))
    }

    /// MIME type inferred from a file extension; used for inline uploads.
    pub fn mime_type(source: &str) -> &'static str {
        let lower = source.to_lowercase();
        if lower.ends_with(".jpg") || lower.ends_with(".jpeg") {
            "image/jpeg"
        } else if lower.ends_with(".png") {
            "image/png"
        } else {
            "application/octet-stream"
        }
    }

    async fn post_json(&self, url: &str, payload: &Value) -> Result<Value, GenerationError> {
        let response = self
            .http_client()?
            .post(url)
            .header("X-API-Key", self.api_key()?)
            .json(payload)
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
        Ok(response.json().await?)
    }

    /// Upload an avatar image (local path or URL) and return its id.
    pub async fn upload_avatar(
        &self,
        image_source: &str,
        name: &str,
    ) -> Result<String, GenerationError> {
        log::info!("{BACKEND}: uploading avatar {name:?} from {image_source}");

        let payload = json!({
            "inline_data": {
                "mime_type": Self::mime_type(image_source),
                "data": self.encode_base64(image_source).await?,
            },
            "name": name,
        });

        let reply = self.post_json(AVATAR_URL, &payload).await?;
        data_field_str(&reply, "avatar_id")
    }

    /// Request a text-driven video; the service synthesizes the voice.
    /// Returns the video id for polling.
    pub async fn generate_video_with_text(
        &self,
        text: &str,
        avatar_id: &str,
        options: &VideoOptions,
    ) -> Result<String, GenerationError> {
        let payload = json!({
            "model_id": options.model_id,
            "avatar_id": avatar_id,
            "text_script": {
                "text": text,
                "voice_id": options.voice_id,
            },
            "aspect_ratio": options.aspect_ratio,
            "resolution": options.resolution,
        });

        let reply = self.post_json(VIDEO_URL, &payload).await?;
        data_field_str(&reply, "video_id")
    }

    /// Request an audio-driven video from a local audio clip. Returns the
    /// video id for polling.
    pub async fn generate_video_with_audio(
        &self,
        audio_path: &Path,
        avatar_id: &str,
        options: &VideoOptions,
    ) -> Result<String, GenerationError> {
        let audio = self
            .encode_base64(&audio_path.to_string_lossy())
            .await?;
        let payload = json!({
            "model_id": options.model_id,
            "avatar_id": avatar_id,
            "audio_script": {
                "inline_data": {
                    "mime_type": "audio/mp3",
                    "data": audio,
                },
                "voice_change": true,
                "voice_id": options.voice_id,
                "denoise": true,
            },
            "aspect_ratio": options.aspect_ratio,
            "resolution": options.resolution,
        });

        let reply = self.post_json(VIDEO_URL, &payload).await?;
        data_field_str(&reply, "video_id")
    }

    /// Poll until the video reaches `created` status and carries a URL.
    ///
    /// # Errors
    /// Fails with [`GenerationError::PollExhausted`] when the video is not
    /// ready within the configured attempts. Individual poll errors are
    /// logged and retried.
    pub async fn poll_video_status(&self, video_id: &str) -> Result<VideoResult, GenerationError> {
        for attempt in 1..=self.poll_attempts {
            tokio::time::sleep(self.poll_delay).await;

            let reply = match self
                .http_client()?
                .get(VIDEO_URL)
                .header("X-API-Key", self.api_key()?)
                .query(&[("video_id", video_id)])
                .send()
                .await
            {
                Ok(response) => match response.json::<Value>().await {
                    Ok(value) => value,
                    Err(e) => {
                        log::warn!("{BACKEND}: poll attempt {attempt} parse error: {e}");
                        continue;
                    }
                },
                Err(e) => {
                    log::warn!("{BACKEND}: poll attempt {attempt} error: {e}");
                    continue;
                }
            };

            let data = reply.get("data").cloned().unwrap_or(Value::Null);
            let status = data.get("status").and_then(Value::as_str).unwrap_or("");
            if status == "created" {
                let video_url = data
                    .get("video_url")
                    .and_then(Value::as_str)
                    .ok_or(GenerationError::MalformedResponse {
                        backend: BACKEND,
                        field: "data.video_url",
                    })?
                    .to_string();
                return Ok(VideoResult {
                    video_id: video_id.to_string(),
                    video_url,
                });
            }
            log::debug!("{BACKEND}: waiting for video {video_id}, status={status}");
        }

        Err(GenerationError::PollExhausted {
            backend: BACKEND,
            attempts: self.poll_attempts,
        })
    }
}

impl Default for VisionStory {
    fn default() -> Self {
        Self::new()
    }
}

fn data_field_str(reply: &Value, field: &'static str) -> Result<String, GenerationError> {
    reply
        .get("data")
        .and_then(|d| d.get(field))
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or(GenerationError::MalformedResponse {
            backend: BACKEND,
            field,
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mime_type_is_inferred_from_the_extension() {
        assert_eq!(VisionStory::mime_type("portrait.JPG"), "image/jpeg");
        assert_eq!(VisionStory::mime_type("portrait.png"), "image/png");
        assert_eq!(VisionStory::mime_type("portrait.webp"), "application/octet-stream");
    }

    #[test]
    fn data_field_reads_the_nested_value() {
        let reply = json!({"data": {"avatar_id": "av_123"}});
        assert_eq!(data_field_str(&reply, "avatar_id").unwrap(), "av_123");
        assert!(data_field_str(&json!({}), "avatar_id").is_err());
    }

    #[tokio::test]
    async fn missing_api_key_is_reported_before_any_request() {
        let mut vs = VisionStory::new();
        vs.api_key = None;
        let err = vs
            .generate_video_with_text("hi", "av_1", &VideoOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            GenerationError::MissingApiKey { var: "VISIONSTORY_API_KEY" }
        ));
    }
}
