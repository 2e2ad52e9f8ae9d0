//! HTTP implementation of the completion client.
//!
//! Wire contract with the remote service:
//! - Request: `POST <endpoint>` with JSON body `{"content": "..."}`.
//! - Success: JSON body with a `text` field.
//! - Remote failure: JSON body with an `error` field (treated like any other
//!   failure by the session layer).

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::client::{CompletionClient, CompletionError, CompletionResult};

/// Request body sent to the completion endpoint.
#[derive(Debug, Serialize)]
struct CompletionRequest<'a> {
    content: &'a str,
}

/// Response body from the completion endpoint.
#[derive(Debug, Deserialize)]
struct CompletionResponse {
    text: Option<String>,
    error: Option<String>,
}

/// Completion client that POSTs to a configured HTTP endpoint.
pub struct HttpCompletionClient {
    http: reqwest::Client,
    endpoint: String,
}

impl HttpCompletionClient {
    /// Create a client for the given completion endpoint URL.
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            endpoint: endpoint.into(),
        }
    }
}

#[async_trait]
impl CompletionClient for HttpCompletionClient {
    async fn complete(&self, content: &str) -> CompletionResult {
        let resp = self
            .http
            .post(&self.endpoint)
            .json(&CompletionRequest { content })
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            return Err(CompletionError::Remote(format!("server returned {status}")));
        }

        let body = resp.bytes().await?;
        parse_response(&body)
    }
}

/// Interpret a completion response body.
///
/// An `error` field wins over a `text` field so the remote can never smuggle
/// a failure through as a reply.
fn parse_response(body: &[u8]) -> CompletionResult {
    let response: CompletionResponse = serde_json::from_slice(body)
        .map_err(|e| CompletionError::Malformed(e.to_string()))?;

    if let Some(error) = response.error {
        return Err(CompletionError::Remote(error));
    }

    response
        .text
        .ok_or_else(|| CompletionError::Malformed("missing text field".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_success_body() {
        let reply = parse_response(br#"{"text":"hello there"}"#).unwrap();
        assert_eq!(reply, "hello there");
    }

    #[test]
    fn test_parse_error_body() {
        let err = parse_response(br#"{"error":"rate limited"}"#).unwrap_err();
        assert!(matches!(err, CompletionError::Remote(msg) if msg == "rate limited"));
    }

    #[test]
    fn test_error_field_wins_over_text() {
        let err = parse_response(br#"{"text":"hi","error":"nope"}"#).unwrap_err();
        assert!(matches!(err, CompletionError::Remote(_)));
    }

    #[test]
    fn test_parse_missing_text_is_malformed() {
        let err = parse_response(br#"{}"#).unwrap_err();
        assert!(matches!(err, CompletionError::Malformed(_)));
    }

    #[test]
    fn test_parse_invalid_json_is_malformed() {
        let err = parse_response(b"<html>oops</html>").unwrap_err();
        assert!(matches!(err, CompletionError::Malformed(_)));
    }
}
