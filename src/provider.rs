//! Vision-model providers: the trait seam and the OpenAI implementation.
//!
//! The pipeline only ever talks to [`VisionModel`], never to a concrete
//! API client. Production uses [`OpenAiVision`]; tests inject a mock via
//! [`crate::config::ExtractionConfig::provider`] and exercise the whole
//! pipeline without a key or a network.
//!
//! The request asks for `response_format: {"type": "json_object"}` so the
//! model is constrained to emit a single JSON object. That constrains
//! *syntax*, not *content* — field defaults and the self-party re-check in
//! [`crate::pipeline::extract`] still apply to whatever comes back.

use crate::config::ExtractionConfig;
use crate::error::{DocumentError, PipelineError};
use crate::pipeline::prepare::PreparedImage;
use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// A vision-capable chat model that can read one invoice image and return
/// the raw JSON text of its structured answer.
#[async_trait]
pub trait VisionModel: Send + Sync {
    /// Submit `prompt` plus one embedded image; return the model's raw
    /// response body text (expected, but not guaranteed, to be JSON).
    async fn extract_json(
        &self,
        prompt: &str,
        image: &PreparedImage,
    ) -> Result<String, DocumentError>;

    /// Human-readable provider name for logs.
    fn name(&self) -> &str;
}

/// OpenAI chat-completions vision provider.
///
/// Also works against any OpenAI-compatible endpoint (vLLM, LiteLLM,
/// Ollama's `/v1`) via `base_url`.
pub struct OpenAiVision {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
    temperature: f32,
    max_tokens: usize,
}

impl OpenAiVision {
    pub const DEFAULT_BASE_URL: &'static str = "https://api.openai.com/v1";

    pub fn new(
        api_key: impl Into<String>,
        base_url: impl Into<String>,
        config: &ExtractionConfig,
    ) -> Result<Self, PipelineError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.api_timeout_secs))
            .build()
            .map_err(|e| PipelineError::Internal(format!("HTTP client: {e}")))?;

        Ok(Self {
            client,
            api_key: api_key.into(),
            base_url: base_url.into(),
            model: config.model.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
        })
    }

    /// Construct from the environment: `OPENAI_API_KEY` (required) and
    /// `OPENAI_BASE_URL` (optional, for compatible endpoints).
    pub fn from_env(config: &ExtractionConfig) -> Result<Self, PipelineError> {
        let api_key = std::env::var("OPENAI_API_KEY")
            .ok()
            .filter(|k| !k.is_empty())
            .ok_or_else(|| PipelineError::ProviderNotConfigured {
                hint: "Set OPENAI_API_KEY, or inject a provider via \
                       ExtractionConfig::builder().provider(...)."
                    .to_string(),
            })?;
        let base_url = std::env::var("OPENAI_BASE_URL")
            .ok()
            .filter(|u| !u.is_empty())
            .unwrap_or_else(|| Self::DEFAULT_BASE_URL.to_string());
        Self::new(api_key, base_url, config)
    }
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Deserialize)]
struct ChatMessage {
    content: Option<String>,
}

#[async_trait]
impl VisionModel for OpenAiVision {
    async fn extract_json(
        &self,
        prompt: &str,
        image: &PreparedImage,
    ) -> Result<String, DocumentError> {
        let body = serde_json::json!({
            "model": self.model,
            "temperature": self.temperature,
            "max_tokens": self.max_tokens,
            "response_format": { "type": "json_object" },
            "messages": [{
                "role": "user",
                "content": [
                    { "type": "text", "text": prompt },
                    { "type": "image_url", "image_url": { "url": image.data_uri() } }
                ]
            }]
        });

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    DocumentError::Extraction {
                        detail: "request timed out".to_string(),
                    }
                } else {
                    DocumentError::Extraction {
                        detail: e.to_string(),
                    }
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            warn!("Vision API returned HTTP {}: {}", status, detail);
            return Err(DocumentError::Extraction {
                detail: format!("HTTP {status}: {detail}"),
            });
        }

        let parsed: ChatResponse =
            response
                .json()
                .await
                .map_err(|e| DocumentError::Extraction {
                    detail: format!("unreadable API response: {e}"),
                })?;

        let content = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| DocumentError::Extraction {
                detail: "API response contained no completion".to_string(),
            })?;

        debug!("Vision response: {} bytes", content.len());
        Ok(content)
    }

    fn name(&self) -> &str {
        "openai"
    }
}

/// Resolve the vision provider, from most-specific to least-specific:
///
/// 1. **Pre-built provider** (`config.provider`) — the caller constructed
///    it entirely; used as-is. This is how tests run without a key.
/// 2. **Environment** — `OPENAI_API_KEY` (+ optional `OPENAI_BASE_URL`).
///
/// No further auto-detection: this tool runs against exactly one endpoint.
pub fn resolve_provider(
    config: &ExtractionConfig,
) -> Result<Arc<dyn VisionModel>, PipelineError> {
    if let Some(ref provider) = config.provider {
        return Ok(Arc::clone(provider));
    }
    Ok(Arc::new(OpenAiVision::from_env(config)?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_env_fails_without_key() {
        // Serialize access to the process environment within this test.
        let config = ExtractionConfig::default();
        let prev = std::env::var("OPENAI_API_KEY").ok();
        std::env::remove_var("OPENAI_API_KEY");

        let result = OpenAiVision::from_env(&config);
        assert!(matches!(
            result,
            Err(PipelineError::ProviderNotConfigured { .. })
        ));

        if let Some(k) = prev {
            std::env::set_var("OPENAI_API_KEY", k);
        }
    }

    #[test]
    fn injected_provider_wins() {
        struct Stub;
        #[async_trait]
        impl VisionModel for Stub {
            async fn extract_json(
                &self,
                _prompt: &str,
                _image: &PreparedImage,
            ) -> Result<String, DocumentError> {
                Ok("{}".to_string())
            }
            fn name(&self) -> &str {
                "stub"
            }
        }

        let config = ExtractionConfig::builder()
            .provider(Arc::new(Stub))
            .build()
            .unwrap();
        let provider = resolve_provider(&config).expect("must resolve");
        assert_eq!(provider.name(), "stub");
    }
}
