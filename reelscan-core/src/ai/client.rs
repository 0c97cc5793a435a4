//! Vision client for the Gemini `generateContent` API.

use async_trait::async_trait;
use thiserror::Error;

use super::cache::{AiCache, CacheKey};
use super::config::{AiConfig, ConfigError};
use super::prompts::IDENTIFY_PROMPT_NAME;
use super::types::{GenerateContentRequest, GenerateContentResponse};
use crate::error::IdentifyError;
use crate::extract::extract;
use crate::http::{BackoffRequester, ReqwestTransport, Sleeper, TokioSleeper, Transport};
use crate::types::IdentifyRequest;

/// Errors raised while building a client.
#[derive(Error, Debug)]
pub enum SetupError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Failed to build HTTP client: {0}")]
    Http(#[from] reqwest::Error),
}

/// Trait for vision clients.
#[async_trait]
pub trait VisionClient: Send + Sync {
    /// Send one identify request and return the parsed success response.
    async fn generate(
        &self,
        request: &IdentifyRequest,
    ) -> Result<GenerateContentResponse, IdentifyError>;
}

/// Gemini client with retrying requests and an optional response cache.
pub struct GeminiClient<T = ReqwestTransport, S = TokioSleeper> {
    requester: BackoffRequester<T, S>,
    endpoint: String,
    model: String,
    cache: Option<AiCache>,
    offline: bool,
}

impl GeminiClient {
    /// Create a new client from environment configuration.
    pub fn from_env() -> Result<Self, SetupError> {
        let config = AiConfig::from_env()?;
        Self::new(&config)
    }

    /// Create a new client with the given configuration.
    pub fn new(config: &AiConfig) -> Result<Self, SetupError> {
        let transport = ReqwestTransport::builder().timeout(config.timeout).build()?;
        let requester = BackoffRequester::new(transport, config.retry);
        Ok(Self::with_requester(config, requester))
    }
}

impl<T: Transport, S: Sleeper> GeminiClient<T, S> {
    /// Build on an existing requester (custom transport or sleeper).
    pub fn with_requester(config: &AiConfig, requester: BackoffRequester<T, S>) -> Self {
        Self {
            requester,
            endpoint: config.endpoint(),
            model: config.model.clone(),
            cache: config.cache_dir.clone().map(AiCache::new),
            offline: config.offline,
        }
    }

    pub fn cache(&self) -> Option<&AiCache> {
        self.cache.as_ref()
    }

    fn parse(body: &str) -> Result<GenerateContentResponse, IdentifyError> {
        serde_json::from_str(body).map_err(|e| IdentifyError::MalformedResponse(e.to_string()))
    }
}

#[async_trait]
impl<T: Transport, S: Sleeper> VisionClient for GeminiClient<T, S> {
    async fn generate(
        &self,
        request: &IdentifyRequest,
    ) -> Result<GenerateContentResponse, IdentifyError> {
        let payload = serde_json::to_value(GenerateContentRequest::from(request))
            .map_err(|e| IdentifyError::InvalidRequest(e.to_string()))?;

        let cache_key = CacheKey::new(IDENTIFY_PROMPT_NAME, &self.model, &payload);

        if let Some(cached) = self.cache.as_ref().and_then(|c| c.get(&cache_key)) {
            tracing::debug!(model = %self.model, hash = %cache_key.input_hash, "AI response found in cache");
            return Self::parse(&cached.body);
        }

        if self.offline {
            return Err(IdentifyError::OfflineNotCached);
        }

        tracing::debug!(
            model = %self.model,
            mime_type = %request.mime_type(),
            image_bytes = request.image().data().len(),
            "Calling AI API"
        );

        let raw = self.requester.send(&self.endpoint, &payload).await?;
        let response = Self::parse(&raw.body)?;

        // A no-match reply stays uncached so that resubmitting asks again
        if let Some(cache) = &self.cache {
            if names_a_movie(&response) {
                if let Err(e) = cache.put(&cache_key, &raw.body) {
                    tracing::warn!("Failed to cache AI response: {}", e);
                }
            } else {
                tracing::debug!(model = %self.model, "Not caching no-match response");
            }
        }

        Ok(response)
    }
}

fn names_a_movie(response: &GenerateContentResponse) -> bool {
    response.text().is_some_and(|text| extract(text).success)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::{MockTransport, RecordingSleeper, RetryPolicy};
    use crate::types::{ImageMime, SelectedImage};
    use serde_json::json;
    use std::time::Duration;
    use tempfile::TempDir;

    fn request() -> IdentifyRequest {
        let image = SelectedImage::new(b"frame".to_vec(), ImageMime::Png);
        IdentifyRequest::new(image, "Which movie?", "Answer with labels.")
    }

    fn client(
        config: &AiConfig,
        transport: &MockTransport,
    ) -> GeminiClient<MockTransport, RecordingSleeper> {
        let requester =
            BackoffRequester::with_sleeper(transport.clone(), RecordingSleeper::new(), config.retry);
        GeminiClient::with_requester(config, requester)
    }

    fn config(cache_dir: Option<&TempDir>) -> AiConfig {
        let mut config = AiConfig::new("test-key");
        config.base_url = "https://example.test/v1beta".to_string();
        config.model = "gemini-test".to_string();
        config.cache_dir = cache_dir.map(|d| d.path().to_path_buf());
        config.retry = RetryPolicy::new(2, Duration::from_millis(1));
        config
    }

    fn success_body() -> serde_json::Value {
        json!({"candidates": [{"content": {"parts": [{"text": "Title: Heat"}]}}]})
    }

    #[tokio::test]
    async fn test_posts_to_model_endpoint() {
        let transport = MockTransport::new().with_json(&success_body());
        let client = client(&config(None), &transport);

        let response = client.generate(&request()).await.unwrap();

        assert_eq!(response.text(), Some("Title: Heat"));
        let calls = transport.calls();
        assert_eq!(
            calls[0].endpoint,
            "https://example.test/v1beta/models/gemini-test:generateContent?key=test-key"
        );
        assert_eq!(calls[0].payload["contents"][0]["parts"][1]["inlineData"]["mimeType"], "image/png");
    }

    #[tokio::test]
    async fn test_request_error_propagates() {
        let transport = MockTransport::new()
            .with_response(500, "")
            .with_response(503, "");
        let client = client(&config(None), &transport);

        let err = client.generate(&request()).await.unwrap_err();

        assert!(matches!(
            err,
            IdentifyError::Request(crate::error::RequestError::ServiceUnavailable { status: 503, attempt: 1 })
        ));
        assert_eq!(transport.call_count(), 2);
    }

    #[tokio::test]
    async fn test_malformed_success_body() {
        let transport = MockTransport::new().with_response(200, "<html>oops</html>");
        let client = client(&config(None), &transport);

        let err = client.generate(&request()).await.unwrap_err();
        assert!(matches!(err, IdentifyError::MalformedResponse(_)));
    }

    #[tokio::test]
    async fn test_second_identical_request_served_from_cache() {
        let temp_dir = TempDir::new().unwrap();
        let transport = MockTransport::new().with_json(&success_body());
        let client = client(&config(Some(&temp_dir)), &transport);

        client.generate(&request()).await.unwrap();
        let cached = client.generate(&request()).await.unwrap();

        assert_eq!(cached.text(), Some("Title: Heat"));
        assert_eq!(transport.call_count(), 1);
        assert_eq!(client.cache().unwrap().stats().cached_responses, 1);
    }

    #[tokio::test]
    async fn test_failures_are_not_cached() {
        let temp_dir = TempDir::new().unwrap();
        let transport = MockTransport::new()
            .with_response(500, "")
            .with_response(500, "")
            .with_json(&success_body());
        let client = client(&config(Some(&temp_dir)), &transport);

        assert!(client.generate(&request()).await.is_err());
        assert_eq!(client.cache().unwrap().stats().cached_responses, 0);

        assert!(client.generate(&request()).await.is_ok());
        assert_eq!(transport.call_count(), 3);
    }

    #[tokio::test]
    async fn test_no_match_reply_is_asked_again() {
        let temp_dir = TempDir::new().unwrap();
        let transport = MockTransport::new()
            .with_json(&json!({"candidates": [{"content": {"parts": [{"text": "Identification Failed. Too dark."}]}}]}))
            .with_json(&json!({"candidates": [{"content": {"parts": [{"text": "Title: Heat\nYear: 1995"}]}}]}));
        let client = client(&config(Some(&temp_dir)), &transport);

        let first = client.generate(&request()).await.unwrap();
        assert_eq!(first.text(), Some("Identification Failed. Too dark."));
        assert_eq!(client.cache().unwrap().stats().cached_responses, 0);

        let second = client.generate(&request()).await.unwrap();
        assert_eq!(second.text(), Some("Title: Heat\nYear: 1995"));
        assert_eq!(transport.call_count(), 2);
        assert_eq!(client.cache().unwrap().stats().cached_responses, 1);
    }

    #[tokio::test]
    async fn test_offline_without_cache_entry() {
        let temp_dir = TempDir::new().unwrap();
        let mut config = config(Some(&temp_dir));
        config.offline = true;
        let transport = MockTransport::new().with_json(&success_body());
        let client = client(&config, &transport);

        let err = client.generate(&request()).await.unwrap_err();

        assert!(matches!(err, IdentifyError::OfflineNotCached));
        assert_eq!(transport.call_count(), 0);
    }
}
