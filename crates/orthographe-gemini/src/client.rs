use std::time::Duration;

use orthographe_core::config::GeminiConfig;
use orthographe_core::types::{CollectionKind, EvaluationResult};

use crate::error::GenerationError;
use crate::prompts;
use crate::service::{CatalogEntry, GeneratedText, GenerationService, TextRequest};
use crate::wire::{self, GenerateContentRequest, GenerateContentResponse};

/// [`GenerationService`] backed by the Gemini REST API.
#[derive(Debug, Clone)]
pub struct GeminiClient {
    http: reqwest::Client,
    api_base: String,
    api_key: String,
    text_model: String,
    speech_model: String,
    voice_name: String,
}

impl GeminiClient {
    pub fn new(api_key: impl Into<String>, config: &GeminiConfig) -> Result<Self, GenerationError> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(GenerationError::Config("API key is empty".to_string()));
        }
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs.max(1)))
            .build()
            .map_err(|e| GenerationError::Config(e.to_string()))?;
        Ok(Self {
            http,
            api_base: config.api_base.trim_end_matches('/').to_string(),
            api_key,
            text_model: config.text_model.clone(),
            speech_model: config.speech_model.clone(),
            voice_name: config.voice_name.clone(),
        })
    }

    /// Build a client with the key read from `config.api_key_env`.
    pub fn from_config(config: &GeminiConfig) -> Result<Self, GenerationError> {
        let key = config
            .api_key()
            .map_err(|e| GenerationError::Config(e.to_string()))?;
        Self::new(key, config)
    }

    fn endpoint(&self, model: &str) -> String {
        format!("{}/models/{}:generateContent", self.api_base, model)
    }

    async fn generate(
        &self,
        model: &str,
        request: &GenerateContentRequest,
    ) -> Result<GenerateContentResponse, GenerationError> {
        let started = std::time::Instant::now();
        let response = self
            .http
            .post(self.endpoint(model))
            .query(&[("key", self.api_key.as_str())])
            .json(request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::warn!(model, status = status.as_u16(), "generation request failed");
            return Err(GenerationError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let reply: GenerateContentResponse = response.json().await?;
        tracing::debug!(
            model,
            candidates = reply.candidates.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "generation reply received"
        );
        Ok(reply)
    }

    async fn generate_structured(
        &self,
        prompt: String,
        schema: serde_json::Value,
    ) -> Result<String, GenerationError> {
        let request = GenerateContentRequest::structured(prompt, schema);
        self.generate(&self.text_model, &request).await?.text()
    }
}

impl GenerationService for GeminiClient {
    async fn generate_catalog(
        &self,
        kind: CollectionKind,
        desired_count: usize,
    ) -> Result<Vec<CatalogEntry>, GenerationError> {
        let raw = self
            .generate_structured(
                prompts::catalog_prompt(kind, desired_count),
                wire::catalog_schema(),
            )
            .await?;
        let entries = wire::parse_catalog(&raw)?;
        tracing::info!(collection = %kind.key(), received = entries.len(), "catalog generated");
        Ok(entries)
    }

    async fn generate_text(&self, request: &TextRequest) -> Result<GeneratedText, GenerationError> {
        let raw = self
            .generate_structured(prompts::text_prompt(request), wire::text_schema())
            .await?;
        wire::parse_text(&raw)
    }

    async fn synthesize_speech(&self, content: &str, slow: bool) -> Result<String, GenerationError> {
        let request =
            GenerateContentRequest::speech(prompts::speech_prompt(content, slow), &self.voice_name);
        self.generate(&self.speech_model, &request).await?.audio()
    }

    async fn evaluate(
        &self,
        original: &str,
        submitted: &str,
    ) -> Result<EvaluationResult, GenerationError> {
        let raw = self
            .generate_structured(
                prompts::evaluation_prompt(original, submitted),
                wire::evaluation_schema(),
            )
            .await?;
        wire::parse_evaluation(&raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_rejects_empty_key() {
        let err = GeminiClient::new("  ", &GeminiConfig::default()).unwrap_err();
        assert!(matches!(err, GenerationError::Config(_)));
    }

    #[test]
    fn test_endpoint_uses_model_and_trims_base() {
        let config = GeminiConfig {
            api_base: "http://localhost:9000/v1beta/".to_string(),
            ..GeminiConfig::default()
        };
        let client = GeminiClient::new("k", &config).unwrap();
        assert_eq!(
            client.endpoint("gemini-3-flash-preview"),
            "http://localhost:9000/v1beta/models/gemini-3-flash-preview:generateContent"
        );
    }

    #[test]
    fn test_from_config_missing_env() {
        let config = GeminiConfig {
            api_key_env: "ORTHOGRAPHE_TEST_UNSET_KEY_VAR".to_string(),
            ..GeminiConfig::default()
        };
        assert!(matches!(
            GeminiClient::from_config(&config),
            Err(GenerationError::Config(_))
        ));
    }

    #[tokio::test]
    async fn test_unreachable_host_is_http_error() {
        let config = GeminiConfig {
            api_base: "http://127.0.0.1:9".to_string(),
            request_timeout_secs: 2,
            ..GeminiConfig::default()
        };
        let client = GeminiClient::new("k", &config).unwrap();
        let err = client.evaluate("a", "b").await.unwrap_err();
        assert!(matches!(err, GenerationError::Http(_)));
    }
}
