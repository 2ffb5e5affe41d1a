// src/llm/openai_compat/mod.rs
// Shared OpenAI-compatible request/response handling

mod client;
mod request;
mod response;

pub use client::OpenAiCompatClient;
pub use request::ChatRequest;
pub use response::{ChatResponse, ResponseChoice, parse_chat_response};
