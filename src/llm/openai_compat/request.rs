// src/llm/openai_compat/request.rs
// OpenAI-compatible chat request builder

use crate::llm::{ChatMessage, GenerationParams, Tool};
use serde::Serialize;

/// Chat completion request (OpenAI-compatible format)
#[derive(Debug, Serialize)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tools: Option<Vec<Tool>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_choice: Option<String>, // "auto" | "required" | "none"
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
}

impl ChatRequest {
    /// Create a new chat request with required fields
    pub fn new(model: impl Into<String>, messages: Vec<ChatMessage>) -> Self {
        Self {
            model: model.into(),
            messages,
            tools: None,
            tool_choice: None,
            max_tokens: None,
            temperature: None,
        }
    }

    /// Set tools for function calling
    pub fn with_tools(mut self, tools: Option<Vec<Tool>>) -> Self {
        self.tools = tools.filter(|t| !t.is_empty());
        if self.tools.is_some() {
            self.tool_choice = Some("auto".into());
        }
        self
    }

    /// Apply sampling options
    pub fn with_params(mut self, params: GenerationParams) -> Self {
        self.max_tokens = Some(params.max_tokens);
        self.temperature = Some(params.temperature);
        self
    }
}
