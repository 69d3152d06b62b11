//! Google Custom Search client.

use super::{SearchOptions, SearchResultItem, WebSearchProvider};
use crate::llm::{HttpClientConfig, build_http_client, truncate_body};
use crate::{Error, Result};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

/// Google Custom Search JSON API client.
pub struct GoogleSearchClient {
    api_key: Option<SecretString>,
    cx: Option<String>,
    endpoint: String,
    client: reqwest::blocking::Client,
}

impl GoogleSearchClient {
    /// Default API endpoint.
    pub const DEFAULT_ENDPOINT: &'static str = "https://www.googleapis.com";

    /// Creates a client with no credentials.
    #[must_use]
    pub fn new() -> Self {
        Self {
            api_key: None,
            cx: None,
            endpoint: Self::DEFAULT_ENDPOINT.to_string(),
            client: build_http_client(HttpClientConfig::default()),
        }
    }

    /// Sets the API key.
    #[must_use]
    pub fn with_api_key(mut self, key: SecretString) -> Self {
        self.api_key = Some(key);
        self
    }

    /// Sets the search engine id.
    #[must_use]
    pub fn with_cx(mut self, cx: impl Into<String>) -> Self {
        self.cx = Some(cx.into());
        self
    }

    /// Sets the API endpoint.
    #[must_use]
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into().trim_end_matches('/').to_string();
        self
    }

    /// Sets HTTP client timeouts.
    #[must_use]
    pub fn with_http_config(mut self, config: HttpClientConfig) -> Self {
        self.client = build_http_client(config);
        self
    }

    /// Checks credentials and the query without touching the network.
    fn validate<'a>(&'a self, query: &str) -> Result<(&'a str, &'a str)> {
        let api_key = self
            .api_key
            .as_ref()
            .map(|key| key.expose_secret())
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| {
                Error::InvalidInput("Google Search API key not configured".to_string())
            })?;
        let cx = self
            .cx
            .as_deref()
            .filter(|cx| !cx.trim().is_empty())
            .ok_or_else(|| {
                Error::InvalidInput("Google Search engine id (cx) not configured".to_string())
            })?;
        if query.trim().is_empty() {
            return Err(Error::InvalidInput("search query is empty".to_string()));
        }
        Ok((api_key, cx))
    }
}

impl Default for GoogleSearchClient {
    fn default() -> Self {
        Self::new()
    }
}

impl WebSearchProvider for GoogleSearchClient {
    fn name(&self) -> &'static str {
        "google"
    }

    fn search(&self, query: &str, options: SearchOptions) -> Result<Vec<SearchResultItem>> {
        let (api_key, cx) = self.validate(query)?;
        options.validate()?;

        let num = options.num.to_string();
        let start = options.start.to_string();
        let response = self
            .client
            .get(format!("{}/customsearch/v1", self.endpoint))
            .query(&[
                ("key", api_key),
                ("cx", cx),
                ("q", query),
                ("num", num.as_str()),
                ("start", start.as_str()),
            ])
            .send()
            .map_err(|e| Error::operation("google_search", e))?;

        let status = response.status();
        let body = response
            .text()
            .map_err(|e| Error::operation("google_search_response", e))?;
        if !status.is_success() {
            record_request("error");
            return Err(Error::operation(
                "google_search",
                format!("API returned status: {status} - {}", truncate_body(&body)),
            ));
        }

        let results = parse_search_response(&body)?;
        record_request("success");
        tracing::debug!(query, count = results.len(), "Google search completed");
        Ok(results)
    }
}

fn record_request(status: &'static str) {
    metrics::counter!("service_requests_total", "service" => "google_search", "status" => status)
        .increment(1);
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    items: Option<Vec<SearchResultItem>>,
    #[serde(default)]
    error: Option<ApiError>,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    #[serde(default)]
    code: Option<u16>,
    #[serde(default)]
    message: String,
}

/// Parses a Custom Search response body.
///
/// An `error` object fails the call even on a 2xx status. A body without
/// `items` means no results.
fn parse_search_response(body: &str) -> Result<Vec<SearchResultItem>> {
    let response: SearchResponse =
        serde_json::from_str(body).map_err(|e| Error::operation("google_search_response", e))?;
    if let Some(error) = response.error {
        let code = error.code.map_or_else(String::new, |c| format!(" ({c})"));
        return Err(Error::operation(
            "google_search",
            format!("{}{code}", error.message),
        ));
    }
    Ok(response.items.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_api_key_rejected_before_request() {
        // Port 1 is never listening; reaching the network would be OperationFailed.
        let client = GoogleSearchClient::new()
            .with_api_key(SecretString::from(String::new()))
            .with_cx("cx123")
            .with_endpoint("http://127.0.0.1:1");
        let err = client
            .search("cats", SearchOptions::default())
            .expect_err("empty key");
        assert!(matches!(err, Error::InvalidInput(_)));
    }

    #[test]
    fn test_empty_cx_and_query_rejected() {
        let client = GoogleSearchClient::new()
            .with_api_key(SecretString::from("key".to_string()))
            .with_endpoint("http://127.0.0.1:1");
        assert!(matches!(
            client.search("cats", SearchOptions::default()),
            Err(Error::InvalidInput(_))
        ));

        let client = client.with_cx("cx123");
        assert!(matches!(
            client.search("   ", SearchOptions::default()),
            Err(Error::InvalidInput(_))
        ));
    }

    #[test]
    fn test_unreachable_endpoint_is_operation_failed() {
        let client = GoogleSearchClient::new()
            .with_api_key(SecretString::from("key".to_string()))
            .with_cx("cx123")
            .with_endpoint("http://127.0.0.1:1");
        let err = client
            .search("cats", SearchOptions::default())
            .expect_err("connection refused");
        assert!(matches!(err, Error::OperationFailed { .. }));
    }

    #[test]
    fn test_parse_items() {
        let body = r#"{"items":[
            {"title":"Cat","link":"https://example.com/cat","snippet":"A small feline"},
            {"title":"No snippet","link":"https://example.com/x"}
        ]}"#;
        let results = parse_search_response(body).expect("parse");
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].snippet, "A small feline");
        assert!(results[1].snippet.is_empty());
    }

    #[test]
    fn test_missing_items_is_empty() {
        let results = parse_search_response(r#"{"kind":"customsearch#search"}"#).expect("parse");
        assert!(results.is_empty());
    }

    #[test]
    fn test_error_field_fails() {
        let body = r#"{"error":{"code":403,"message":"API key not valid"}}"#;
        let err = parse_search_response(body).expect_err("error body");
        assert!(err.to_string().contains("API key not valid (403)"));
    }
}
