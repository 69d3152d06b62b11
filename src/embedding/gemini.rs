//! Gemini embedding client.

use super::Embedder;
use crate::llm::{HttpClientConfig, build_http_client};
use crate::{Error, Result};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

/// Embeds text with a Gemini embedding model.
pub struct GeminiEmbedder {
    api_key: Option<SecretString>,
    endpoint: String,
    model: String,
    client: reqwest::blocking::Client,
}

impl GeminiEmbedder {
    /// Default API endpoint.
    pub const DEFAULT_ENDPOINT: &'static str = "https://generativelanguage.googleapis.com/v1beta";

    /// Default embedding model.
    pub const DEFAULT_MODEL: &'static str = "text-embedding-004";

    /// Output size of [`Self::DEFAULT_MODEL`].
    pub const DEFAULT_DIMENSIONS: usize = 768;

    /// Creates a new embedder.
    ///
    /// The API key is read from `GEMINI_API_KEY` if set.
    #[must_use]
    pub fn new() -> Self {
        let api_key = std::env::var("GEMINI_API_KEY")
            .ok()
            .filter(|key| !key.is_empty())
            .map(SecretString::from);
        Self {
            api_key,
            endpoint: Self::DEFAULT_ENDPOINT.to_string(),
            model: Self::DEFAULT_MODEL.to_string(),
            client: build_http_client(HttpClientConfig::default()),
        }
    }

    /// Sets the API key.
    #[must_use]
    pub fn with_api_key(mut self, key: SecretString) -> Self {
        self.api_key = Some(key);
        self
    }

    /// Sets the API endpoint.
    #[must_use]
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into().trim_end_matches('/').to_string();
        self
    }

    /// Sets the model name, with or without the `models/` prefix.
    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        let model = model.into();
        self.model = model
            .strip_prefix("models/")
            .map_or_else(|| model.clone(), str::to_string);
        self
    }

    /// Sets HTTP client timeouts.
    #[must_use]
    pub fn with_http_config(mut self, config: HttpClientConfig) -> Self {
        self.client = build_http_client(config);
        self
    }

    /// The configured model name.
    #[must_use]
    pub fn model(&self) -> &str {
        &self.model
    }

    fn api_key(&self) -> Result<&str> {
        self.api_key
            .as_ref()
            .map(|key| key.expose_secret())
            .filter(|key| !key.is_empty())
            .ok_or_else(|| Error::InvalidInput("Gemini API key not configured".to_string()))
    }
}

impl Default for GeminiEmbedder {
    fn default() -> Self {
        Self::new()
    }
}

impl Embedder for GeminiEmbedder {
    fn dimensions(&self) -> Option<usize> {
        (self.model == Self::DEFAULT_MODEL).then_some(Self::DEFAULT_DIMENSIONS)
    }

    fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let api_key = self.api_key()?;
        if text.trim().is_empty() {
            return Err(Error::InvalidInput("cannot embed empty text".to_string()));
        }

        let request = EmbedContentRequest {
            content: Content {
                parts: vec![Part { text }],
            },
        };

        let response = self
            .client
            .post(format!(
                "{}/models/{}:embedContent",
                self.endpoint, self.model
            ))
            .query(&[("key", api_key)])
            .json(&request)
            .send()
            .map_err(|e| Error::operation("gemini_embed", e))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().unwrap_or_default();
            record_request("error");
            tracing::warn!(model = %self.model, %status, "Gemini embedding request failed");
            return Err(Error::operation(
                "gemini_embed",
                format!("API returned status: {status} - {}", crate::llm::truncate_body(&body)),
            ));
        }

        let response: EmbedContentResponse = response
            .json()
            .map_err(|e| Error::operation("gemini_embed_response", e))?;
        record_request("success");
        Ok(response.embedding.values)
    }
}

fn record_request(status: &'static str) {
    metrics::counter!("service_requests_total", "service" => "gemini", "status" => status)
        .increment(1);
}

#[derive(Debug, Serialize)]
struct EmbedContentRequest<'a> {
    content: Content<'a>,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    parts: Vec<Part<'a>>,
}

#[derive(Debug, Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Debug, Deserialize)]
struct EmbedContentResponse {
    embedding: ContentEmbedding,
}

#[derive(Debug, Deserialize)]
struct ContentEmbedding {
    values: Vec<f32>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unconfigured() -> GeminiEmbedder {
        GeminiEmbedder {
            api_key: None,
            endpoint: GeminiEmbedder::DEFAULT_ENDPOINT.to_string(),
            model: GeminiEmbedder::DEFAULT_MODEL.to_string(),
            client: reqwest::blocking::Client::new(),
        }
    }

    #[test]
    fn test_model_prefix_stripped() {
        let embedder = unconfigured().with_model("models/embedding-001");
        assert_eq!(embedder.model(), "embedding-001");
        assert_eq!(embedder.dimensions(), None);
        assert_eq!(unconfigured().dimensions(), Some(768));
    }

    #[test]
    fn test_missing_key_is_invalid_input() {
        let err = unconfigured().embed("hello").expect_err("no key");
        assert!(matches!(err, Error::InvalidInput(_)));
    }

    #[test]
    fn test_empty_text_rejected() {
        let embedder = unconfigured().with_api_key(SecretString::from("k".to_string()));
        assert!(matches!(embedder.embed("  "), Err(Error::InvalidInput(_))));
    }

    #[test]
    fn test_unreachable_endpoint_is_operation_failed() {
        let embedder = unconfigured()
            .with_api_key(SecretString::from("k".to_string()))
            .with_endpoint("http://127.0.0.1:1");
        let err = embedder.embed("hello").expect_err("connection refused");
        assert!(matches!(err, Error::OperationFailed { .. }));
    }

    #[test]
    fn test_request_shape() {
        let request = EmbedContentRequest {
            content: Content {
                parts: vec![Part { text: "hi" }],
            },
        };
        let json = serde_json::to_value(&request).expect("serialize");
        assert_eq!(json, serde_json::json!({"content": {"parts": [{"text": "hi"}]}}));

        let response: EmbedContentResponse =
            serde_json::from_str(r#"{"embedding":{"values":[0.1,-0.2]}}"#).expect("parse");
        assert_eq!(response.embedding.values.len(), 2);
    }
}
