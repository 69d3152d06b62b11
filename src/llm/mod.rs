//! LLM client abstraction.
//!
//! Provides a unified interface for chat-completion providers and the shared
//! blocking HTTP client builder used by every outbound integration.

mod openrouter;

pub use openrouter::{ModelDescriptor, ModelPricing, OpenRouterClient};

use crate::Result;
use crate::config::HttpSettings;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// System prompt for rewriting a user's prompt.
pub const ENHANCE_SYSTEM_PROMPT: &str = "You are an expert prompt engineer. Rewrite the \
user's prompt so it is clear, specific and well structured. Keep the original intent and \
any {{variables}} exactly as written. Respond with the improved prompt only.";

/// A message in a chat conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// `system`, `user` or `assistant`.
    pub role: String,
    /// Message text.
    pub content: String,
}

impl ChatMessage {
    /// Creates a system message.
    #[must_use]
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    /// Creates a user message.
    #[must_use]
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }

    /// Creates an assistant message.
    #[must_use]
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: "assistant".to_string(),
            content: content.into(),
        }
    }
}

/// Trait for LLM providers.
pub trait LlmProvider: Send + Sync {
    /// The provider name.
    fn name(&self) -> &'static str;

    /// Generates a completion for the given prompt.
    ///
    /// # Errors
    ///
    /// Returns an error if the completion fails.
    fn complete(&self, prompt: &str) -> Result<String>;

    /// Generates a completion with a system prompt.
    ///
    /// # Errors
    ///
    /// Returns an error if the completion fails.
    ///
    /// Default implementation concatenates system and user prompts.
    /// Providers should override this to use native system prompt support.
    fn complete_with_system(&self, system: &str, user: &str) -> Result<String> {
        let combined = format!("{system}\n\n---\n\nUser message:\n{user}");
        self.complete(&combined)
    }

    /// Rewrites a prompt to be clearer and more specific.
    ///
    /// # Errors
    ///
    /// Returns an error if the completion fails.
    fn enhance_prompt(&self, prompt: &str) -> Result<String> {
        let user = format!("Improve this prompt:\n\n{prompt}");
        self.complete_with_system(ENHANCE_SYSTEM_PROMPT, &user)
    }
}

/// HTTP client configuration for outbound API calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HttpClientConfig {
    /// Request timeout in milliseconds (0 to disable).
    pub timeout_ms: u64,
    /// Connect timeout in milliseconds (0 to disable).
    pub connect_timeout_ms: u64,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 30_000,
            connect_timeout_ms: 3_000,
        }
    }
}

impl HttpClientConfig {
    /// Loads HTTP configuration from config file settings.
    #[must_use]
    pub fn from_settings(settings: &HttpSettings) -> Self {
        let mut config = Self::default();
        if let Some(timeout_ms) = settings.timeout_ms {
            config.timeout_ms = timeout_ms;
        }
        if let Some(connect_timeout_ms) = settings.connect_timeout_ms {
            config.connect_timeout_ms = connect_timeout_ms;
        }
        config
    }
}

/// Builds a blocking HTTP client with configured timeouts.
#[must_use]
pub fn build_http_client(config: HttpClientConfig) -> reqwest::blocking::Client {
    let mut builder = reqwest::blocking::Client::builder();
    if config.timeout_ms > 0 {
        builder = builder.timeout(Duration::from_millis(config.timeout_ms));
    }
    if config.connect_timeout_ms > 0 {
        builder = builder.connect_timeout(Duration::from_millis(config.connect_timeout_ms));
    }

    builder.build().unwrap_or_else(|err| {
        tracing::warn!("Failed to build HTTP client: {err}");
        reqwest::blocking::Client::new()
    })
}

/// Truncates a response body for inclusion in an error message.
pub(crate) fn truncate_body(body: &str) -> String {
    const MAX: usize = 512;
    if body.len() <= MAX {
        return body.to_string();
    }
    let mut end = MAX;
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &body[..end])
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Recorder;

    impl LlmProvider for Recorder {
        fn name(&self) -> &'static str {
            "recorder"
        }

        fn complete(&self, prompt: &str) -> Result<String> {
            Ok(prompt.to_string())
        }
    }

    #[test]
    fn test_default_enhance_prompt_includes_system_and_text() {
        let out = Recorder.enhance_prompt("summarize {{topic}}").expect("enhance");
        assert!(out.starts_with(ENHANCE_SYSTEM_PROMPT));
        assert!(out.ends_with("summarize {{topic}}"));
    }

    #[test]
    fn test_http_config_from_settings() {
        let config = HttpClientConfig::from_settings(&HttpSettings {
            timeout_ms: Some(5_000),
            connect_timeout_ms: None,
        });
        assert_eq!(config.timeout_ms, 5_000);
        assert_eq!(config.connect_timeout_ms, 3_000);
    }

    #[test]
    fn test_truncate_body() {
        assert_eq!(truncate_body("short"), "short");
        let long = "é".repeat(400);
        let truncated = truncate_body(&long);
        assert!(truncated.ends_with("..."));
        assert!(truncated.len() <= 515);
    }

    #[test]
    fn test_chat_message_roles() {
        assert_eq!(ChatMessage::system("s").role, "system");
        assert_eq!(ChatMessage::user("u").role, "user");
        assert_eq!(ChatMessage::assistant("a").role, "assistant");
    }
}
