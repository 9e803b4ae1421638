//! OpenAI-compatible chat completion client.
//!
//! One client covers every chat provider the generators talk to — OpenAI,
//! DeepSeek, and Moonshot all speak the same `/chat/completions` dialect
//! and differ only in base URL, credential variable, and default model.
//! Moonshot's partial (role-play prefill) mode is supported through the
//! optional `partial`/`name` message fields.

use futures::{Stream, StreamExt};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::utilities::config;
use crate::utilities::errors::GenerationError;

/// Default request timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: f64 = 120.0;

/// A single message in a chat conversation.
///
/// `name` and `partial` are only serialized when set; they carry
/// Moonshot's partial-mode prefill marker on the trailing assistant stub.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub partial: Option<bool>,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self::plain("system", content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::plain("user", content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::plain("assistant", content)
    }

    /// Empty assistant stub that asks the model to continue speaking as
    /// `name` (Moonshot partial mode).
    pub fn partial_assistant(name: Option<String>) -> Self {
        Self {
            role: "assistant".to_string(),
            content: String::new(),
            name,
            partial: Some(true),
        }
    }

    fn plain(role: &str, content: impl Into<String>) -> Self {
        Self {
            role: role.to_string(),
            content: content.into(),
            name: None,
            partial: None,
        }
    }
}

/// Chat completion client for one provider endpoint.
#[derive(Debug, Clone)]
pub struct ChatCompletion {
    /// Provider label used in logs and error messages.
    provider: &'static str,
    /// Environment variable the API key came from (for diagnostics).
    key_var: &'static str,
    api_key: Option<String>,
    base_url: String,
    /// Model name sent with every request.
    pub model: String,
    /// Default sampling temperature; per-call overrides win.
    pub temperature: Option<f64>,
    /// Maximum tokens per completion.
    pub max_tokens: Option<u32>,
    /// Request timeout in seconds.
    pub timeout: Option<f64>,
}

impl ChatCompletion {
    /// Create a client against an arbitrary OpenAI-compatible endpoint.
    pub fn new(
        provider: &'static str,
        key_var: &'static str,
        model: impl Into<String>,
        api_key: Option<String>,
        base_url: impl Into<String>,
    ) -> Self {
        Self {
            provider,
            key_var,
            api_key,
            base_url: base_url.into(),
            model: model.into(),
            temperature: None,
            max_tokens: None,
            timeout: None,
        }
    }

    /// OpenAI client. Key from `OPENAI_API_KEY`, model from `MODEL_NAME`.
    pub fn openai() -> Self {
        Self::new(
            "openai",
            "OPENAI_API_KEY",
            config::env_var("MODEL_NAME").unwrap_or_else(|| "gpt-4o-mini".to_string()),
            config::env_var("OPENAI_API_KEY"),
            config::env_var("OPENAI_BASE_URL")
                .unwrap_or_else(|| "https://api.openai.com/v1".to_string()),
        )
    }

    /// DeepSeek client. Key from `DS_API_KEY`, model from `DS_MODEL_NAME`.
    pub fn deepseek() -> Self {
        Self::new(
            "deepseek",
            "DS_API_KEY",
            config::env_var("DS_MODEL_NAME").unwrap_or_else(|| "deepseek-chat".to_string()),
            config::env_var("DS_API_KEY"),
            "https://api.deepseek.com",
        )
    }

    /// Moonshot (Kimi) client. Key from `KIMI_API_KEY`, model from
    /// `KIMI_MODEL_NAME`. Defaults match the role-play configuration:
    /// temperature 0.3, 4096 max tokens.
    pub fn moonshot() -> Self {
        let mut client = Self::new(
            "moonshot",
            "KIMI_API_KEY",
            config::env_var("KIMI_MODEL_NAME").unwrap_or_else(|| "moonshot-v1-8k".to_string()),
            config::env_var("KIMI_API_KEY"),
            "https://api.moonshot.cn/v1",
        );
        client.temperature = Some(0.3);
        client.max_tokens = Some(4096);
        client
    }

    /// Provider label ("openai", "deepseek", "moonshot", ...).
    pub fn provider(&self) -> &'static str {
        self.provider
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url.trim_end_matches('/'))
    }

    fn api_key(&self) -> Result<&str, GenerationError> {
        self.api_key
            .as_deref()
            .ok_or(GenerationError::MissingApiKey { var: self.key_var })
    }

    fn http_client(&self) -> Result<reqwest::Client, GenerationError> {
        let timeout = self.timeout.unwrap_or(DEFAULT_TIMEOUT_SECS);
        Ok(reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs_f64(timeout))
            .build()?)
    }

    /// Build the request body for `/chat/completions`.
    pub fn build_request_body(
        &self,
        messages: &[ChatMessage],
        temperature: Option<f64>,
        stream: bool,
    ) -> Value {
        let mut body = serde_json::json!({
            "model": self.model,
            "messages": messages,
        });
        if let Some(temp) = temperature.or(self.temperature) {
            body["temperature"] = serde_json::json!(temp);
        }
        if let Some(max_tokens) = self.max_tokens {
            body["max_tokens"] = serde_json::json!(max_tokens);
        }
        if stream {
            body["stream"] = serde_json::json!(true);
        }
        body
    }

    /// Send a chat completion request and return the reply text.
    ///
    /// # Errors
    /// Fails when the API key is missing, the request errors at the
    /// transport level, the provider reports a non-success status, or the
    /// reply carries no message content.
    pub async fn chat(
        &self,
        messages: &[ChatMessage],
        temperature: Option<f64>,
    ) -> Result<String, GenerationError> {
        log::debug!(
            "{}: chat request, model={}, messages={}",
            self.provider,
            self.model,
            messages.len()
        );

        let api_key = self.api_key()?;
        let body = self.build_request_body(messages, temperature, false);

        let response = self
            .http_client()?
            .post(self.endpoint())
            .bearer_auth(api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(GenerationError::Backend {
                backend: self.provider,
                message: format!("HTTP {status}: {message}"),
            });
        }

        let reply: Value = response.json().await?;

        if let Some(usage) = reply.get("usage") {
            log::debug!(
                "{} token usage: prompt={}, completion={}, total={}",
                self.provider,
                usage.get("prompt_tokens").and_then(Value::as_i64).unwrap_or(0),
                usage.get("completion_tokens").and_then(Value::as_i64).unwrap_or(0),
                usage.get("total_tokens").and_then(Value::as_i64).unwrap_or(0),
            );
        }

        let content = reply
            .get("choices")
            .and_then(|c| c.get(0))
            .and_then(|c| c.get("message"))
            .and_then(|m| m.get("content"))
            .and_then(Value::as_str)
            .ok_or(GenerationError::MalformedResponse {
                backend: self.provider,
                field: "choices[0].message.content",
            })?;

        Ok(content.to_string())
    }

    /// Send a streaming chat completion request, yielding reply tokens as
    /// the provider emits them.
    ///
    /// The stream ends on the provider's `[DONE]` marker; transport errors
    /// surface as stream items.
    pub fn chat_stream(
        &self,
        messages: &[ChatMessage],
        temperature: Option<f64>,
    ) -> impl Stream<Item = Result<String, GenerationError>> + '_ {
        let body = self.build_request_body(messages, temperature, true);

        async_stream::try_stream! {
            let api_key = self.api_key()?.to_string();
            let response = self
                .http_client()?
                .post(self.endpoint())
                .bearer_auth(api_key)
                .json(&body)
                .send()
                .await?;

            let status = response.status();
            if !status.is_success() {
                let message = response.text().await.unwrap_or_default();
                Err::<(), _>(GenerationError::Backend {
                    backend: self.provider,
                    message: format!("HTTP {status}: {message}"),
                })?;
                unreachable!();
            }

            let mut bytes = response.bytes_stream();
            let mut buffer = String::new();
            let mut done = false;

            while !done {
                let Some(chunk) = bytes.next().await else {
                    break;
                };
                buffer.push_str(&String::from_utf8_lossy(&chunk?));

                // Server-sent events arrive line-framed but chunks can
                // split mid-line; only consume complete lines.
                while let Some(newline) = buffer.find('\n') {
                    let line = buffer[..newline].trim().to_string();
                    buffer.drain(..=newline);

                    let Some(data) = line.strip_prefix("data:") else {
                        continue;
                    };
                    let data = data.trim();
                    if data == "[DONE]" {
                        done = true;
                        break;
                    }
                    if let Ok(event) = serde_json::from_str::<Value>(data) {
                        if let Some(token) = event
                            .get("choices")
                            .and_then(|c| c.get(0))
                            .and_then(|c| c.get("delta"))
                            .and_then(|d| d.get("content"))
                            .and_then(Value::as_str)
                        {
                            if !token.is_empty() {
                                yield token.to_string();
                            }
                        }
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_fields_are_omitted_from_plain_messages() {
        let serialized = serde_json::to_value(ChatMessage::user("hi")).unwrap();
        assert_eq!(
            serialized,
            serde_json::json!({"role": "user", "content": "hi"})
        );
    }

    #[test]
    fn partial_assistant_stub_carries_name_and_marker() {
        let stub = ChatMessage::partial_assistant(Some("Airi".to_string()));
        let serialized = serde_json::to_value(&stub).unwrap();
        assert_eq!(
            serialized,
            serde_json::json!({
                "role": "assistant",
                "content": "",
                "name": "Airi",
                "partial": true
            })
        );
    }

    #[test]
    fn request_body_includes_defaults_and_overrides() {
        let client = ChatCompletion::moonshot();
        let messages = vec![ChatMessage::user("hello")];

        let body = client.build_request_body(&messages, None, false);
        assert_eq!(body["temperature"], 0.3);
        assert_eq!(body["max_tokens"], 4096);
        assert!(body.get("stream").is_none());

        let body = client.build_request_body(&messages, Some(0.9), true);
        assert_eq!(body["temperature"], 0.9);
        assert_eq!(body["stream"], true);
    }

    #[tokio::test]
    async fn missing_api_key_is_reported_before_any_request() {
        let client = ChatCompletion::new("test", "TEST_CHAT_KEY", "m", None, "http://localhost:9");
        let err = client.chat(&[ChatMessage::user("hi")], None).await.unwrap_err();
        assert!(matches!(err, GenerationError::MissingApiKey { var: "TEST_CHAT_KEY" }));
    }
}
