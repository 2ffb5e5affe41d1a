//! Test utilities for Lingshu integration tests

#![allow(dead_code)]

use lingshu::config::BackendConfig;
use lingshu::llm::OpenAiCompatClient;
use lingshu::tools::ToolDispatcher;
use serde_json::{Map, Value, json};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const COMPLETIONS_PATH: &str = "/v1/chat/completions";

/// Smallest valid PNG (1x1 transparent pixel)
pub const PNG_BASE64: &str = "iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAYAAAAfFcSJAAAADUlEQVR42mNkYPhfDwAChwGA60e6kgAAAABJRU5ErkJggg==";

/// Chat-completion response body carrying `text`
pub fn completion(text: &str) -> Value {
    json!({
        "id": "chatcmpl-test",
        "object": "chat.completion",
        "choices": [{
            "index": 0,
            "message": {"role": "assistant", "content": text},
            "finish_reason": "stop"
        }],
        "usage": {"prompt_tokens": 12, "completion_tokens": 8, "total_tokens": 20}
    })
}

/// Mount a completion endpoint answering `text`, expected to be hit `calls` times
pub async fn mount_completion(server: &MockServer, text: &str, calls: u64) {
    Mock::given(method("POST"))
        .and(path(COMPLETIONS_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion(text)))
        .expect(calls)
        .mount(server)
        .await;
}

pub fn backend_config(server: &MockServer, model: &str) -> BackendConfig {
    BackendConfig::new(format!("{}/v1", server.uri()), "test-key", model)
}

pub fn dispatcher_for(server: &MockServer) -> ToolDispatcher {
    dispatcher_with_timeout(server, Duration::from_secs(10))
}

pub fn dispatcher_with_timeout(server: &MockServer, timeout: Duration) -> ToolDispatcher {
    let config = backend_config(server, "Lingshu-7B").with_timeout(timeout);
    ToolDispatcher::new(Arc::new(OpenAiCompatClient::new(Arc::new(config))))
}

pub fn args(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        other => panic!("arguments must be an object, got {}", other),
    }
}

/// Bodies of every request the mock received, as JSON
pub async fn request_bodies(server: &MockServer) -> Vec<Value> {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .iter()
        .map(|r| serde_json::from_slice(&r.body).expect("request body is JSON"))
        .collect()
}

/// Write a sample PNG into `dir` and return its path
pub fn write_sample_png(dir: &tempfile::TempDir) -> PathBuf {
    use base64::Engine as _;
    let bytes = base64::engine::general_purpose::STANDARD
        .decode(PNG_BASE64)
        .expect("valid PNG fixture");
    let path = dir.path().join("sample.png");
    std::fs::write(&path, bytes).expect("write sample image");
    path
}
