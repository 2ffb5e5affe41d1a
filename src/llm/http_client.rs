// src/llm/http_client.rs
// Shared HTTP client configuration for chat-completion backends

use crate::error::{LingshuError, Result};
use reqwest::Client;
use std::time::Duration;
use tracing::warn;

/// Default connect timeout for backend connections
const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;
/// Longest slice of an error body carried into error messages
const MAX_ERROR_BODY_CHARS: usize = 500;

/// HTTP client for one backend. Performs a single attempt per request.
pub struct LlmHttpClient {
    client: Client,
    pub request_timeout: Duration,
    pub connect_timeout: Duration,
}

impl LlmHttpClient {
    pub fn new(request_timeout: Duration, connect_timeout: Duration) -> Self {
        let client = Client::builder()
            .timeout(request_timeout)
            .connect_timeout(connect_timeout)
            .build()
            .unwrap_or_else(|_| Client::new());

        Self {
            client,
            request_timeout,
            connect_timeout,
        }
    }

    /// Client with the given request timeout and the default connect timeout
    pub fn with_request_timeout(request_timeout: Duration) -> Self {
        Self::new(
            request_timeout,
            Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS).min(request_timeout),
        )
    }

    /// POST a JSON body with Bearer auth.
    /// Returns the response body on 2xx; every other outcome is `BackendUnavailable`.
    pub async fn post_json(
        &self,
        request_id: &str,
        url: &str,
        api_key: &str,
        body: String,
    ) -> Result<String> {
        let response = self
            .client
            .post(url)
            .header("Authorization", format!("Bearer {}", api_key))
            .header("Content-Type", "application/json")
            .body(body)
            .send()
            .await
            .map_err(|e| self.classify_send_error(request_id, e))?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            warn!(
                request_id = %request_id,
                status = %status,
                error = %truncate(&error_body),
                "Backend returned non-success status"
            );
            return Err(LingshuError::BackendUnavailable(format!(
                "backend returned HTTP {}: {}",
                status,
                truncate(&error_body)
            )));
        }

        response.text().await.map_err(|e| {
            LingshuError::BackendUnavailable(format!("failed to read backend response: {}", e))
        })
    }

    fn classify_send_error(&self, request_id: &str, e: reqwest::Error) -> LingshuError {
        let detail = if e.is_timeout() {
            format!("request timed out after {}s", self.request_timeout.as_secs_f32())
        } else if e.is_connect() {
            format!("connection failed: {}", e)
        } else {
            format!("request failed: {}", e)
        };
        warn!(request_id = %request_id, error = %e, "{}", detail);
        LingshuError::BackendUnavailable(detail)
    }
}

fn truncate(body: &str) -> String {
    if body.chars().count() > MAX_ERROR_BODY_CHARS {
        let cut: String = body.chars().take(MAX_ERROR_BODY_CHARS).collect();
        format!("{}...", cut)
    } else {
        body.to_string()
    }
}
