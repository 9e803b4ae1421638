//! Public image hosting.
//!
//! The diffusion img2img endpoint and the avatar uploader both want a
//! publicly reachable URL, not a local file. This helper publishes a local
//! image to imgbb and returns its URL.

use std::path::Path;

use base64::Engine;
use serde_json::Value;

use crate::utilities::config;
use crate::utilities::errors::GenerationError;

const BACKEND: &str = "imgbb";
const UPLOAD_URL: &str = "https://api.imgbb.com/1/upload";

/// Upload a local image and return its public URL.
///
/// The image is sent base64-encoded; the API key comes from
/// `UPLOAD_API_KEY`.
///
/// # Errors
/// Fails on missing credentials, an unreadable file, transport errors, or
/// an upload rejected by the host.
pub async fn upload_image(path: &Path) -> Result<String, GenerationError> {
    let api_key = config::require_env("UPLOAD_API_KEY")?;

    let bytes = tokio::fs::read(path).await?;
    let encoded = base64::engine::general_purpose::STANDARD.encode(bytes);

    log::debug!("{BACKEND}: uploading {}", path.display());

    let client = reqwest::Client::new();
    let response = client
        .post(UPLOAD_URL)
        .query(&[("key", api_key.as_str())])
        .form(&[("image", encoded.as_str())])
        .send()
        .await?;

    let result: Value = response.json().await?;
    if result.get("status").and_then(Value::as_i64) == Some(200) {
        result
            .get("data")
            .and_then(|d| d.get("url"))
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or(GenerationError::MalformedResponse {
                backend: BACKEND,
                field: "data.url",
            })
    } else {
        let message = result
            .get("error")
            .map(|e| e.to_string())
            .unwrap_or_else(|| "unknown error".to_string());
        Err(GenerationError::Backend {
            backend: BACKEND,
            message,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_api_key_is_reported_before_reading_the_file() {
        std::env::remove_var("UPLOAD_API_KEY");
        let err = upload_image(Path::new("/nonexistent.png")).await.unwrap_err();
        assert!(matches!(err, GenerationError::MissingApiKey { var: "UPLOAD_API_KEY" }));
    }
}
