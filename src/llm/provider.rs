// src/llm/provider.rs
// Backend abstraction layer

use crate::error::{LingshuError, Result};
use async_trait::async_trait;

use super::{ChatMessage, ChatResult, GenerationParams, Tool};

/// Trait for chat-completion backends
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Send one chat completion request. No retries.
    async fn chat(
        &self,
        messages: Vec<ChatMessage>,
        tools: Option<Vec<Tool>>,
        params: GenerationParams,
    ) -> Result<ChatResult>;

    /// Model identifier requests are sent with
    fn model_name(&self) -> String;

    /// Send a request and require non-blank assistant text
    async fn complete_text(
        &self,
        messages: Vec<ChatMessage>,
        params: GenerationParams,
    ) -> Result<String> {
        let result = self.chat(messages, None, params).await?;
        match result.text() {
            Some(text) => Ok(text.to_string()),
            None => Err(LingshuError::EmptyResponse(format!(
                "backend returned no completion text (request {})",
                result.request_id
            ))),
        }
    }
}
