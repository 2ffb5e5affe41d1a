// src/llm/mod.rs
// Chat-completion backend clients

pub mod http_client;
pub mod logging;
pub mod openai_compat;
mod provider;
mod types;

pub use openai_compat::OpenAiCompatClient;
pub use provider::LlmClient;
pub use types::{
    ChatMessage, ChatResult, ContentPart, FunctionCall, FunctionDef, GenerationParams, ImageUrl,
    MessageContent, Role, Tool, ToolCall, Usage,
};
