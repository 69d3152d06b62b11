//! `OpenRouter` client.

use super::{ChatMessage, HttpClientConfig, LlmProvider, build_http_client, truncate_body};
use crate::{Error, Result};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

/// `OpenRouter` LLM client.
pub struct OpenRouterClient {
    /// API key.
    api_key: Option<SecretString>,
    /// API endpoint.
    endpoint: String,
    /// Model to use.
    model: String,
    /// HTTP client.
    client: reqwest::blocking::Client,
}

impl OpenRouterClient {
    /// Default API endpoint.
    pub const DEFAULT_ENDPOINT: &'static str = "https://openrouter.ai/api/v1";

    /// Default model.
    pub const DEFAULT_MODEL: &'static str = "openai/gpt-4o-mini";

    /// Model used by [`LlmProvider::enhance_prompt`], whatever model the
    /// client is configured with.
    pub const ENHANCE_MODEL: &'static str = "google/gemini-2.0-flash-001";

    /// Application title sent with every request.
    const APP_TITLE: &'static str = "Mycelial";

    /// Creates a new `OpenRouter` client.
    ///
    /// The API key is read from `OPENROUTER_API_KEY` if set.
    #[must_use]
    pub fn new() -> Self {
        let api_key = std::env::var("OPENROUTER_API_KEY")
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

    /// Sets the model.
    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Sets HTTP client timeouts.
    #[must_use]
    pub fn with_http_config(mut self, config: HttpClientConfig) -> Self {
        self.client = build_http_client(config);
        self
    }

    /// The configured model.
    #[must_use]
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Returns the API key or an error if none is configured.
    fn api_key(&self) -> Result<&str> {
        self.api_key
            .as_ref()
            .map(|key| key.expose_secret())
            .filter(|key| !key.is_empty())
            .ok_or_else(|| Error::InvalidInput("OpenRouter API key not configured".to_string()))
    }

    /// Lists the models available to this key.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] without a key, or
    /// [`Error::OperationFailed`] if the request fails.
    pub fn list_models(&self) -> Result<Vec<ModelDescriptor>> {
        let api_key = self.api_key()?;

        let response = self
            .client
            .get(format!("{}/models", self.endpoint))
            .bearer_auth(api_key)
            .header("X-Title", Self::APP_TITLE)
            .send()
            .map_err(|e| Error::operation("openrouter_models", e))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().unwrap_or_default();
            record_request("error");
            return Err(Error::operation(
                "openrouter_models",
                format!("API returned status: {status} - {}", truncate_body(&body)),
            ));
        }

        let response: ModelListResponse = response
            .json()
            .map_err(|e| Error::operation("openrouter_models_response", e))?;
        record_request("success");
        tracing::debug!(count = response.data.len(), "Fetched OpenRouter models");
        Ok(response.data)
    }

    /// Sends a chat conversation to the configured model.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] without a key or with no messages, or
    /// [`Error::OperationFailed`] if the request fails.
    pub fn chat(&self, messages: &[ChatMessage]) -> Result<String> {
        self.chat_with_model(&self.model, messages)
    }

    /// Sends a chat conversation to a specific model.
    ///
    /// # Errors
    ///
    /// Same as [`OpenRouterClient::chat`].
    pub fn chat_with_model(&self, model: &str, messages: &[ChatMessage]) -> Result<String> {
        let api_key = self.api_key()?;
        if messages.is_empty() {
            return Err(Error::InvalidInput("no messages to send".to_string()));
        }

        let request = ChatCompletionRequest { model, messages };
        tracing::debug!(model, messages = messages.len(), "Sending OpenRouter chat request");

        let response = self
            .client
            .post(format!("{}/chat/completions", self.endpoint))
            .bearer_auth(api_key)
            .header("X-Title", Self::APP_TITLE)
            .json(&request)
            .send()
            .map_err(|e| Error::operation("openrouter_request", e))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().unwrap_or_default();
            record_request("error");
            return Err(Error::operation(
                "openrouter_request",
                format!("API returned status: {status} - {}", truncate_body(&body)),
            ));
        }

        let response: ChatCompletionResponse = response
            .json()
            .map_err(|e| Error::operation("openrouter_response", e))?;
        let content = response.into_content()?;
        record_request("success");
        Ok(content)
    }
}

fn record_request(status: &'static str) {
    metrics::counter!("service_requests_total", "service" => "openrouter", "status" => status)
        .increment(1);
}

impl Default for OpenRouterClient {
    fn default() -> Self {
        Self::new()
    }
}

impl LlmProvider for OpenRouterClient {
    fn name(&self) -> &'static str {
        "openrouter"
    }

    fn complete(&self, prompt: &str) -> Result<String> {
        self.chat(&[ChatMessage::user(prompt)])
    }

    fn complete_with_system(&self, system: &str, user: &str) -> Result<String> {
        self.chat(&[ChatMessage::system(system), ChatMessage::user(user)])
    }

    fn enhance_prompt(&self, prompt: &str) -> Result<String> {
        let messages = [
            ChatMessage::system(super::ENHANCE_SYSTEM_PROMPT),
            ChatMessage::user(format!("Improve this prompt:\n\n{prompt}")),
        ];
        self.chat_with_model(Self::ENHANCE_MODEL, &messages)
    }
}

/// A model offered by `OpenRouter`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelDescriptor {
    /// Model id, e.g. `openai/gpt-4o-mini`.
    pub id: String,
    /// Display name.
    #[serde(default)]
    pub name: String,
    /// Model description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Context window in tokens.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context_length: Option<u64>,
    /// Per-token pricing, as decimal strings.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pricing: Option<ModelPricing>,
}

/// Model pricing in USD per token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelPricing {
    /// Prompt token price.
    #[serde(default)]
    pub prompt: String,
    /// Completion token price.
    #[serde(default)]
    pub completion: String,
}

/// Response from the models endpoint.
#[derive(Debug, Deserialize)]
struct ModelListResponse {
    data: Vec<ModelDescriptor>,
}

/// Request to the Chat Completions API.
#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
}

/// Response from the Chat Completions API.
#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
    #[serde(default)]
    error: Option<ApiError>,
}

impl ChatCompletionResponse {
    fn into_content(self) -> Result<String> {
        if let Some(error) = self.error {
            return Err(Error::operation("openrouter_response", error.message));
        }
        self.choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .ok_or_else(|| Error::operation("openrouter_response", "No choices in response"))
    }
}

/// A choice in the response.
#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

/// Error object embedded in a 200 response.
#[derive(Debug, Deserialize)]
struct ApiError {
    #[serde(default)]
    message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unconfigured() -> OpenRouterClient {
        OpenRouterClient {
            api_key: None,
            endpoint: OpenRouterClient::DEFAULT_ENDPOINT.to_string(),
            model: OpenRouterClient::DEFAULT_MODEL.to_string(),
            client: reqwest::blocking::Client::new(),
        }
    }

    #[test]
    fn test_client_configuration() {
        let client = OpenRouterClient::new()
            .with_api_key(SecretString::from("sk-or-test".to_string()))
            .with_endpoint("http://localhost:8080/api/v1/")
            .with_model("anthropic/claude-3.5-haiku");

        assert_eq!(client.name(), "openrouter");
        assert_eq!(client.endpoint, "http://localhost:8080/api/v1");
        assert_eq!(client.model(), "anthropic/claude-3.5-haiku");
        assert_eq!(client.api_key().expect("key"), "sk-or-test");
    }

    #[test]
    fn test_missing_key_is_invalid_input() {
        let client = unconfigured();
        assert!(matches!(client.list_models(), Err(Error::InvalidInput(_))));
        assert!(matches!(client.complete("hi"), Err(Error::InvalidInput(_))));
    }

    #[test]
    fn test_empty_messages_rejected() {
        let client = unconfigured().with_api_key(SecretString::from("k".to_string()));
        assert!(matches!(client.chat(&[]), Err(Error::InvalidInput(_))));
    }

    #[test]
    fn test_unreachable_endpoint_is_operation_failed() {
        let client = unconfigured()
            .with_api_key(SecretString::from("k".to_string()))
            .with_endpoint("http://127.0.0.1:1");
        let err = client.complete("hi").expect_err("connection refused");
        assert!(matches!(err, Error::OperationFailed { .. }));
    }

    #[test]
    fn test_parse_model_list() {
        let body = r#"{"data":[
            {"id":"openai/gpt-4o-mini","name":"GPT-4o mini","context_length":128000,
             "pricing":{"prompt":"0.00000015","completion":"0.0000006"}},
            {"id":"meta/llama"}
        ]}"#;
        let parsed: ModelListResponse = serde_json::from_str(body).expect("parse");
        assert_eq!(parsed.data.len(), 2);
        assert_eq!(parsed.data[0].context_length, Some(128_000));
        assert_eq!(
            parsed.data[0].pricing.as_ref().map(|p| p.prompt.as_str()),
            Some("0.00000015")
        );
        assert!(parsed.data[1].name.is_empty());
    }

    #[test]
    fn test_chat_response_content_and_error() {
        let ok: ChatCompletionResponse = serde_json::from_str(
            r#"{"choices":[{"message":{"role":"assistant","content":"Hello!"}}]}"#,
        )
        .expect("parse");
        assert_eq!(ok.into_content().expect("content"), "Hello!");

        let err: ChatCompletionResponse =
            serde_json::from_str(r#"{"error":{"message":"rate limited","code":429}}"#)
                .expect("parse");
        assert!(matches!(
            err.into_content(),
            Err(Error::OperationFailed { .. })
        ));

        let empty: ChatCompletionResponse =
            serde_json::from_str(r#"{"choices":[]}"#).expect("parse");
        assert!(empty.into_content().is_err());
    }
}
