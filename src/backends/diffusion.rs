//! Modelslab Stable Diffusion client.
//!
//! Covers both text-to-image and image-guided generation against the v6
//! API. Requests either succeed immediately or come back `processing` with
//! a `fetch_result` URL; the client polls that URL with a bounded loop.
//! Finished images are returned as remote URLs and also downloaded into
//! the local assets directory on a best-effort basis.

use std::path::PathBuf;
use std::time::Duration;

use serde_json::{json, Value};

use crate::utilities::config;
use crate::utilities::errors::GenerationError;
use crate::utilities::paths;

const BACKEND: &str = "stable-diffusion";

/// Generation mode: prompt-only or guided by an init image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiffusionMode {
    Text2Img,
    Img2Img,
}

impl DiffusionMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Text2Img => "text2img",
            Self::Img2Img => "img2img",
        }
    }

    fn endpoint(&self) -> &'static str {
        match self {
            Self::Text2Img => "https://modelslab.com/api/v6/images/text2img",
            Self::Img2Img => "https://modelslab.com/api/v6/images/img2img",
        }
    }
}

/// Stable Diffusion API client.
#[derive(Debug, Clone)]
pub struct StableDiffusion {
    api_key: Option<String>,
    model_id: String,
    mode: DiffusionMode,
    /// Seconds before a single HTTP request is abandoned.
    pub request_timeout: Duration,
    /// Extra POST attempts after a read timeout.
    pub post_retries: u32,
    /// Maximum `fetch_result` polling attempts.
    pub max_fetch_attempts: u32,
    /// Delay between polling attempts.
    pub fetch_delay: Duration,
}

impl StableDiffusion {
    /// Create a client in the given mode.
    ///
    /// Credentials come from `SD_API_KEY`, the model from `SD_MODEL_NAME`.
    pub fn new(mode: DiffusionMode) -> Self {
        Self {
            api_key: config::env_var("SD_API_KEY"),
            model_id: config::env_var("SD_MODEL_NAME")
                .unwrap_or_else(|| "revAnimated_v122".to_string()),
            mode,
            request_timeout: Duration::from_secs(60),
            post_retries: 1,
            max_fetch_attempts: 30,
            fetch_delay: Duration::from_secs(6),
        }
    }

    pub fn mode(&self) -> DiffusionMode {
        self.mode
    }

    /// Build the generation payload.
    ///
    /// # Errors
    /// Fails when the mode is img2img and no init image URL is supplied.
    pub fn build_payload(
        &self,
        prompt: &str,
        init_image_url: Option<&str>,
    ) -> Result<Value, GenerationError> {
        let mut payload = json!({
            "key": self.api_key.as_deref().unwrap_or_default(),
            "model_id": self.model_id,
            "prompt": prompt,
            "negative_prompt": "ugly, blurry, distorted, bad anatomy, extra limbs, deformed",
            "width": "576",
            "height": "768",
            "samples": "1",
            "num_inference_steps": "30",
            "safety_checker": "no",
            "enhance_prompt": "yes",
            "seed": null,
            "guidance_scale": 7.5,
            "multi_lingual": "no",
            "panorama": "no",
            "self_attention": "no",
            "upscale": "no",
            "lora_model": null,
            "tomesd": "yes",
            "use_karras_sigmas": "yes",
            "vae": null,
            "lora_strength": null,
            "scheduler": "UniPCMultistepScheduler",
            "webhook": null,
            "track_id": null
        });

        if self.mode == DiffusionMode::Img2Img {
            let url = init_image_url.ok_or(GenerationError::Backend {
                backend: BACKEND,
                message: "init_image_url is required for img2img mode".to_string(),
            })?;
            payload["init_image"] = json!(url);
            payload["strength"] = json!(0.7);
        }

        Ok(payload)
    }

    fn http_client(&self) -> Result<reqwest::Client, GenerationError> {
        Ok(reqwest::Client::builder()
            .timeout(self.request_timeout)
            .user_agent("Mozilla/5.0")
            .build()?)
    }

    /// Generate an image and return its remote URL.
    ///
    /// A local copy is saved under the assets directory (or `output_path`
    /// when given); download failures are logged but do not fail the
    /// generation, since the remote URL is the artifact of record.
    ///
    /// # Errors
    /// Fails on missing credentials, transport errors after retries, a
    /// failure status from the API, or an exhausted polling loop.
    pub async fn generate(
        &self,
        prompt: &str,
        character_name: &str,
        init_image_url: Option<&str>,
        output_path: Option<PathBuf>,
    ) -> Result<String, GenerationError> {
        if self.api_key.is_none() {
            return Err(GenerationError::MissingApiKey { var: "SD_API_KEY" });
        }

        log::info!(
            "{BACKEND}: generating {} for {character_name}",
            self.mode.as_str()
        );

        let payload = self.build_payload(prompt, init_image_url)?;
        let client = self.http_client()?;

        // First request, with a bounded retry on read timeouts only.
        let mut result: Option<Value> = None;
        for attempt in 0..=self.post_retries {
            match client
                .post(self.mode.endpoint())
                .json(&payload)
                .send()
                .await
            {
                Ok(response) => {
                    result = Some(response.json().await?);
                    break;
                }
                Err(e) if e.is_timeout() && attempt < self.post_retries => {
                    log::warn!("{BACKEND}: request timed out on attempt {}", attempt + 1);
                    tokio::time::sleep(Duration::from_secs(2)).await;
                }
                Err(e) => return Err(e.into()),
            }
        }
        let result = result.ok_or(GenerationError::PollExhausted {
            backend: BACKEND,
            attempts: self.post_retries + 1,
        })?;

        match result.get("status").and_then(Value::as_str) {
            Some("success") => {
                let image_url = first_output_url(&result)?;
                self.download_image(&client, &image_url, character_name, output_path)
                    .await;
                Ok(image_url)
            }
            Some("processing") => {
                let fetch_url = result
                    .get("fetch_result")
                    .and_then(Value::as_str)
                    .ok_or(GenerationError::MalformedResponse {
                        backend: BACKEND,
                        field: "fetch_result",
                    })?;
                log::info!("{BACKEND}: processing, will fetch {fetch_url}");
                let image_url = self.fetch_until_ready(&client, fetch_url).await?;
                self.download_image(&client, &image_url, character_name, output_path)
                    .await;
                Ok(image_url)
            }
            _ => {
                let message = result
                    .get("message")
                    .or_else(|| result.get("messege"))
                    .and_then(Value::as_str)
                    .unwrap_or("unknown error");
                Err(GenerationError::Backend {
                    backend: BACKEND,
                    message: message.to_string(),
                })
            }
        }
    }

    /// Poll `fetch_url` until the image is ready.
    async fn fetch_until_ready(
        &self,
        client: &reqwest::Client,
        fetch_url: &str,
    ) -> Result<String, GenerationError> {
        for attempt in 1..=self.max_fetch_attempts {
            tokio::time::sleep(self.fetch_delay).await;

            let fetched: Value = match client.get(fetch_url).send().await {
                Ok(response) => match response.json().await {
                    Ok(value) => value,
                    Err(e) => {
                        log::warn!("{BACKEND}: fetch attempt {attempt} parse error: {e}");
                        continue;
                    }
                },
                Err(e) => {
                    log::warn!("{BACKEND}: fetch attempt {attempt} error: {e}");
                    continue;
                }
            };

            let status = fetched.get("status").and_then(Value::as_str).unwrap_or("");
            log::debug!(
                "{BACKEND}: fetch attempt {attempt}/{}, status={status}",
                self.max_fetch_attempts
            );
            match status {
                "success" => return first_output_url(&fetched),
                "processing" | "error" => continue,
                _ => break,
            }
        }

        Err(GenerationError::PollExhausted {
            backend: BACKEND,
            attempts: self.max_fetch_attempts,
        })
    }

    /// Save a local copy of the finished image. Best-effort: failures are
    /// logged and swallowed.
    async fn download_image(
        &self,
        client: &reqwest::Client,
        image_url: &str,
        character_name: &str,
        output_path: Option<PathBuf>,
    ) {
        let path = output_path.unwrap_or_else(|| {
            paths::images_dir().join(paths::media_filename(character_name, "jpg"))
        });

        match self.try_download(client, image_url, &path).await {
            Ok(()) => log::info!("{BACKEND}: image saved to {}", path.display()),
            Err(e) => log::warn!("{BACKEND}: local image download failed: {e}"),
        }
    }

    async fn try_download(
        &self,
        client: &reqwest::Client,
        image_url: &str,
        path: &std::path::Path,
    ) -> Result<(), GenerationError> {
        // The CDN escapes slashes in URLs embedded in JSON.
        let image_url = image_url.replace("\\/", "/");

        // The remote file can lag the success status; retry until the
        // response is actually an image.
        for attempt in 1..=10u32 {
            let response = client.get(&image_url).send().await?;
            let content_type = response
                .headers()
                .get(reqwest::header::CONTENT_TYPE)
                .and_then(|v| v.to_str().ok())
                .unwrap_or("");

            if content_type.contains("image") {
                let bytes = response.bytes().await?;
                tokio::fs::write(path, &bytes).await?;
                return Ok(());
            }

            log::debug!("{BACKEND}: image not ready yet (attempt {attempt}/10)");
            tokio::time::sleep(Duration::from_secs(3)).await;
        }

        Err(GenerationError::PollExhausted {
            backend: BACKEND,
            attempts: 10,
        })
    }
}

fn first_output_url(result: &Value) -> Result<String, GenerationError> {
    result
        .get("output")
        .and_then(|o| o.get(0))
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or(GenerationError::MalformedResponse {
            backend: BACKEND,
            field: "output[0]",
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(mode: DiffusionMode) -> StableDiffusion {
        let mut sd = StableDiffusion::new(mode);
        sd.api_key = Some("test-key".to_string());
        sd
    }

    #[test]
    fn text2img_payload_has_portrait_dimensions() {
        let payload = client(DiffusionMode::Text2Img)
            .build_payload("a portrait", None)
            .unwrap();
        assert_eq!(payload["width"], "576");
        assert_eq!(payload["height"], "768");
        assert!(payload.get("init_image").is_none());
    }

    #[test]
    fn img2img_payload_requires_an_init_image() {
        let sd = client(DiffusionMode::Img2Img);
        assert!(sd.build_payload("a portrait", None).is_err());

        let payload = sd
            .build_payload("a portrait", Some("https://example.com/init.png"))
            .unwrap();
        assert_eq!(payload["init_image"], "https://example.com/init.png");
        assert_eq!(payload["strength"], 0.7);
    }

    #[test]
    fn first_output_url_reads_the_first_entry() {
        let result = json!({"output": ["https://cdn.example/img.jpg"]});
        assert_eq!(first_output_url(&result).unwrap(), "https://cdn.example/img.jpg");
        assert!(first_output_url(&json!({})).is_err());
    }

    #[tokio::test]
    async fn missing_api_key_is_reported_before_any_request() {
        let mut sd = StableDiffusion::new(DiffusionMode::Text2Img);
        sd.api_key = None;
        let err = sd.generate("p", "airi", None, None).await.unwrap_err();
        assert!(matches!(err, GenerationError::MissingApiKey { var: "SD_API_KEY" }));
    }
}
