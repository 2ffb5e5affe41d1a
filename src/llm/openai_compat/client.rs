// src/llm/openai_compat/client.rs
// Client for any OpenAI-compatible chat-completions endpoint (vLLM, SGLang, ...)

use crate::config::BackendConfig;
use crate::error::Result;
use crate::llm::http_client::LlmHttpClient;
use crate::llm::openai_compat::{ChatRequest, parse_chat_response};
use crate::llm::provider::LlmClient;
use crate::llm::{ChatMessage, ChatResult, GenerationParams, Tool};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Instant;
use tracing::{Span, debug, info, instrument};
use uuid::Uuid;

/// Chat client bound to one immutable backend configuration
pub struct OpenAiCompatClient {
    config: Arc<BackendConfig>,
    endpoint: String,
    http: LlmHttpClient,
}

impl OpenAiCompatClient {
    pub fn new(config: Arc<BackendConfig>) -> Self {
        let http = LlmHttpClient::with_request_timeout(config.timeout);
        let endpoint = config.completions_url();
        Self {
            config,
            endpoint,
            http,
        }
    }

    #[instrument(skip(self, messages, tools), fields(request_id, model = %self.config.model_name, message_count = messages.len()))]
    async fn send(
        &self,
        messages: Vec<ChatMessage>,
        tools: Option<Vec<Tool>>,
        params: GenerationParams,
    ) -> Result<ChatResult> {
        let request_id = Uuid::new_v4().to_string();
        let start_time = Instant::now();

        Span::current().record("request_id", &request_id);

        info!(
            request_id = %request_id,
            message_count = messages.len(),
            tool_count = tools.as_ref().map(|t| t.len()).unwrap_or(0),
            max_tokens = params.max_tokens,
            "Starting chat request"
        );

        let request = ChatRequest::new(&self.config.model_name, messages)
            .with_tools(tools)
            .with_params(params);

        let body = serde_json::to_string(&request)?;
        debug!(request_id = %request_id, body_len = body.len(), "Chat request serialized");

        let response_body = self
            .http
            .post_json(&request_id, &self.endpoint, &self.config.api_key, body)
            .await?;

        let duration_ms = start_time.elapsed().as_millis() as u64;
        let result = parse_chat_response(&response_body, &request_id, duration_ms)?;

        if let Some(ref u) = result.usage {
            crate::llm::logging::log_usage(&request_id, &self.config.model_name, u);
        }
        if let Some(ref tcs) = result.tool_calls {
            crate::llm::logging::log_tool_calls(&request_id, tcs);
        }
        crate::llm::logging::log_completion(
            &request_id,
            &self.config.model_name,
            duration_ms,
            result.content.as_ref().map(|c| c.len()).unwrap_or(0),
            result.tool_calls.as_ref().map(|t| t.len()).unwrap_or(0),
        );

        Ok(result)
    }
}

#[async_trait]
impl LlmClient for OpenAiCompatClient {
    async fn chat(
        &self,
        messages: Vec<ChatMessage>,
        tools: Option<Vec<Tool>>,
        params: GenerationParams,
    ) -> Result<ChatResult> {
        self.send(messages, tools, params).await
    }

    fn model_name(&self) -> String {
        self.config.model_name.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LingshuError;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer) -> OpenAiCompatClient {
        let config = BackendConfig::new(format!("{}/v1", server.uri()), "test-key", "Lingshu-7B");
        OpenAiCompatClient::new(Arc::new(config))
    }

    #[tokio::test]
    async fn test_chat_posts_model_and_params() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .and(body_partial_json(json!({
                "model": "Lingshu-7B",
                "max_tokens": 2048,
                "messages": [{"role": "user", "content": "hello"}]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [{"message": {"role": "assistant", "content": "hi there"}}]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server);
        let result = client
            .chat(vec![ChatMessage::user("hello")], None, GenerationParams::default())
            .await
            .unwrap();
        assert_eq!(result.content.as_deref(), Some("hi there"));
        assert_eq!(client.model_name(), "Lingshu-7B");
    }

    #[tokio::test]
    async fn test_complete_text_rejects_blank_content() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [{"message": {"content": ""}}]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server);
        let err = client
            .complete_text(vec![ChatMessage::user("hello")], GenerationParams::default())
            .await
            .unwrap_err();
        assert!(matches!(err, LingshuError::EmptyResponse(_)));
    }
}
