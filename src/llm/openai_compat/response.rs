// src/llm/openai_compat/response.rs
// OpenAI-compatible chat response parsing

use crate::error::{LingshuError, Result};
use crate::llm::{ChatResult, FunctionCall, ToolCall, Usage};
use serde::Deserialize;

/// Non-streaming chat response (OpenAI-compatible format)
#[derive(Debug, Deserialize)]
pub struct ChatResponse {
    #[serde(default)]
    pub choices: Vec<ResponseChoice>,
    pub usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
pub struct ResponseChoice {
    pub message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
pub struct ResponseMessage {
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub tool_calls: Option<Vec<ResponseToolCall>>,
}

#[derive(Debug, Deserialize)]
pub struct ResponseToolCall {
    pub id: String,
    #[serde(rename = "type", default = "default_call_type")]
    pub call_type: String,
    pub function: ResponseFunction,
}

#[derive(Debug, Deserialize)]
pub struct ResponseFunction {
    pub name: String,
    #[serde(default)]
    pub arguments: String,
}

fn default_call_type() -> String {
    "function".into()
}

/// Parse an OpenAI-compatible chat response into a ChatResult.
/// A body that is not a chat response is reported as `EmptyResponse`.
pub fn parse_chat_response(
    response_body: &str,
    request_id: &str,
    duration_ms: u64,
) -> Result<ChatResult> {
    let data: ChatResponse = serde_json::from_str(response_body).map_err(|e| {
        LingshuError::EmptyResponse(format!("malformed chat completion: {}", e))
    })?;

    // Extract response from first choice
    let choice = data.choices.into_iter().next();
    let (content, tool_calls) = match choice {
        Some(c) => {
            let msg = c.message;
            let tc: Option<Vec<ToolCall>> = msg.tool_calls.map(|calls| {
                calls
                    .into_iter()
                    .map(|tc| ToolCall {
                        id: tc.id,
                        call_type: tc.call_type,
                        function: FunctionCall {
                            name: tc.function.name,
                            arguments: tc.function.arguments,
                        },
                    })
                    .collect()
            });
            (msg.content, tc)
        }
        None => (None, None),
    };

    Ok(ChatResult {
        request_id: request_id.to_owned(),
        content,
        tool_calls,
        usage: data.usage,
        duration_ms,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_simple_response() {
        let json = r#"{
            "choices": [{
                "message": {
                    "role": "assistant",
                    "content": "No acute fracture."
                }
            }],
            "usage": {
                "prompt_tokens": 10,
                "completion_tokens": 5,
                "total_tokens": 15
            }
        }"#;

        let result = parse_chat_response(json, "test-123", 100).unwrap();
        assert_eq!(result.request_id, "test-123");
        assert_eq!(result.content.as_deref(), Some("No acute fracture."));
        assert!(result.tool_calls.is_none());
        assert_eq!(result.duration_ms, 100);
        assert_eq!(result.usage.unwrap().total_tokens, 15);
    }

    #[test]
    fn test_parse_response_with_tool_calls() {
        let json = r#"{
            "choices": [{
                "message": {
                    "content": null,
                    "tool_calls": [{
                        "id": "call_123",
                        "type": "function",
                        "function": {
                            "name": "answer_question",
                            "arguments": "{\"question\": \"What is a nodule?\"}"
                        }
                    }]
                }
            }],
            "usage": null
        }"#;

        let result = parse_chat_response(json, "test-456", 200).unwrap();
        assert!(result.content.is_none());
        let calls = result.tool_calls.unwrap();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].id, "call_123");
        assert_eq!(calls[0].function.name, "answer_question");
    }

    #[test]
    fn test_parse_invalid_json_is_empty_response() {
        let result = parse_chat_response("<html>502</html>", "test", 0);
        assert!(matches!(result, Err(LingshuError::EmptyResponse(_))));
    }

    #[test]
    fn test_parse_empty_choices() {
        let json = r#"{"choices": [], "usage": null}"#;
        let result = parse_chat_response(json, "test", 0).unwrap();
        assert!(result.content.is_none());
        assert!(result.tool_calls.is_none());
    }

    #[test]
    fn test_parse_missing_choices_field() {
        let result = parse_chat_response("{}", "test", 0).unwrap();
        assert!(result.content.is_none());
    }
}
