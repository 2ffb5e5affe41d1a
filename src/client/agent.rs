// src/client/agent.rs
// Ask mode: let the chain model pick tools from the server and run them

use super::ToolInvoker;
use crate::error::{LingshuError, Result};
use crate::llm::{ChatMessage, GenerationParams, LlmClient, Tool, ToolCall};
use crate::tools::ToolResult;
use serde_json::{Map, Value};
use tracing::{info, warn};

pub const DEFAULT_QUERY: &str =
    "How to evaluate lung nodules in CT images? What imaging features should be noted?";

#[derive(Debug, Clone)]
pub struct AskOutcome {
    /// Model's reply when it asked for no tools
    pub direct_reply: Option<String>,
    /// Each requested tool call with the result it produced
    pub tool_runs: Vec<(ToolCall, ToolResult)>,
}

/// Convert MCP tool descriptors to OpenAI function definitions
pub fn mcp_tools_to_functions(tools: &[rmcp::model::Tool]) -> Vec<Tool> {
    tools
        .iter()
        .map(|tool| {
            let mut schema = tool.input_schema.as_ref().clone();
            schema
                .entry("type")
                .or_insert_with(|| Value::String("object".into()));
            Tool::function(
                tool.name.to_string(),
                tool.description.as_deref().unwrap_or_default(),
                Value::Object(schema),
            )
        })
        .collect()
}

/// Send `query` to the chain model with the tools offered, then run every tool
/// call it requests. Arguments are parsed as JSON, never evaluated.
pub async fn ask(
    invoker: &dyn ToolInvoker,
    llm: &dyn LlmClient,
    tools: Vec<Tool>,
    query: &str,
) -> Result<AskOutcome> {
    let offered = tools.len();
    let result = llm
        .chat(
            vec![ChatMessage::user(query)],
            Some(tools),
            GenerationParams::default(),
        )
        .await?;

    let calls = result.tool_calls.clone().unwrap_or_default();
    if calls.is_empty() {
        info!(offered, "Model answered without tools");
        let reply = result.text().map(str::to_string).ok_or_else(|| {
            LingshuError::EmptyResponse("model returned neither text nor tool calls".into())
        })?;
        return Ok(AskOutcome {
            direct_reply: Some(reply),
            tool_runs: Vec::new(),
        });
    }

    let mut tool_runs = Vec::with_capacity(calls.len());
    for call in calls {
        let name = call.function.name.clone();
        info!(tool = %name, "Executing requested tool call");
        let tool_result = match parse_arguments(&call.function.arguments) {
            Ok(arguments) => invoker.call_tool(&name, arguments).await,
            Err(e) => {
                warn!(tool = %name, error = %e, "Unparseable tool arguments");
                ToolResult::failure(&name, &e)
            }
        };
        tool_runs.push((call, tool_result));
    }

    Ok(AskOutcome {
        direct_reply: None,
        tool_runs,
    })
}

fn parse_arguments(raw: &str) -> Result<Map<String, Value>> {
    if raw.trim().is_empty() {
        return Ok(Map::new());
    }
    match serde_json::from_str::<Value>(raw) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(other) => Err(LingshuError::InvalidArgument(format!(
            "tool arguments must be a JSON object, got {}",
            other
        ))),
        Err(e) => Err(LingshuError::InvalidArgument(format!(
            "tool arguments are not valid JSON: {}",
            e
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::llm::{ChatResult, FunctionCall};
    use async_trait::async_trait;
    use std::sync::Mutex;

    struct FixedModel {
        content: Option<String>,
        tool_calls: Option<Vec<ToolCall>>,
        offered: Mutex<usize>,
    }

    #[async_trait]
    impl LlmClient for FixedModel {
        async fn chat(
            &self,
            _messages: Vec<ChatMessage>,
            tools: Option<Vec<Tool>>,
            _params: GenerationParams,
        ) -> Result<ChatResult> {
            *self.offered.lock().unwrap() = tools.map_or(0, |t| t.len());
            Ok(ChatResult {
                request_id: "r".into(),
                content: self.content.clone(),
                tool_calls: self.tool_calls.clone(),
                usage: None,
                duration_ms: 0,
            })
        }

        fn model_name(&self) -> String {
            "chain".into()
        }
    }

    struct EchoInvoker {
        seen: Mutex<Vec<(String, Map<String, Value>)>>,
    }

    #[async_trait]
    impl ToolInvoker for EchoInvoker {
        async fn call_tool(&self, name: &str, arguments: Map<String, Value>) -> ToolResult {
            self.seen.lock().unwrap().push((name.to_string(), arguments));
            ToolResult::success(name, "done")
        }
    }

    fn call(name: &str, arguments: &str) -> ToolCall {
        ToolCall {
            id: format!("call_{}", name),
            call_type: "function".into(),
            function: FunctionCall {
                name: name.into(),
                arguments: arguments.into(),
            },
        }
    }

    #[tokio::test]
    async fn test_direct_reply() {
        let model = FixedModel {
            content: Some("Look at size and margins.".into()),
            tool_calls: None,
            offered: Mutex::new(0),
        };
        let invoker = EchoInvoker { seen: Mutex::new(vec![]) };
        let tools = vec![Tool::function("answer_question", "qa", serde_json::json!({"type": "object"}))];

        let outcome = ask(&invoker, &model, tools, DEFAULT_QUERY).await.unwrap();
        assert_eq!(outcome.direct_reply.as_deref(), Some("Look at size and margins."));
        assert!(outcome.tool_runs.is_empty());
        assert_eq!(*model.offered.lock().unwrap(), 1);
    }

    #[tokio::test]
    async fn test_runs_requested_tools() {
        let model = FixedModel {
            content: None,
            tool_calls: Some(vec![
                call("answer_question", r#"{"question": "What is a ground-glass nodule?"}"#),
                call("answer_question", "__import__('os')"),
            ]),
            offered: Mutex::new(0),
        };
        let invoker = EchoInvoker { seen: Mutex::new(vec![]) };

        let outcome = ask(&invoker, &model, vec![], DEFAULT_QUERY).await.unwrap();
        assert_eq!(outcome.tool_runs.len(), 2);
        assert!(outcome.tool_runs[0].1.is_ok());
        assert_eq!(outcome.tool_runs[1].1.error_kind, Some(ErrorKind::InvalidArgument));

        let seen = invoker.seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].1["question"], "What is a ground-glass nodule?");
    }

    #[test]
    fn test_parse_arguments() {
        assert!(parse_arguments("").unwrap().is_empty());
        assert!(parse_arguments("[1, 2]").is_err());
    }
}
