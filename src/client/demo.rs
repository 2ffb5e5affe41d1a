// src/client/demo.rs
// Demonstration run: call each tool once, optionally chain results through a second model

use super::ToolInvoker;
use crate::error::{LingshuError, Result};
use crate::image::ImageInput;
use crate::llm::{ChatMessage, ContentPart, GenerationParams, LlmClient};
use crate::tools::{ToolName, ToolResult};
use serde_json::{Map, Value, json};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

pub const DEFAULT_SAMPLE_IMAGE: &str = "./lung.jpeg";

pub const SAMPLE_PATIENT_CONTEXT: &str = "55-year-old male, 20-year smoking history, \
     lung abnormality found during a routine physical examination";

pub const SAMPLE_QUESTION: &str =
    "How should lung nodules be evaluated on CT? Which imaging features matter most?";

const CHAIN_SYSTEM_PROMPT: &str = "You receive output from a specialised medical imaging model. \
     Summarise it for a referring clinician in plain language and flag anything that looks \
     inconsistent or needs urgent attention.";

#[derive(Debug, Clone)]
pub struct DemoOptions {
    /// Sample image; image tools are skipped when it is missing
    pub image: Option<PathBuf>,
    pub question: String,
    pub patient_context: String,
}

impl Default for DemoOptions {
    fn default() -> Self {
        Self {
            image: Some(PathBuf::from(DEFAULT_SAMPLE_IMAGE)),
            question: SAMPLE_QUESTION.to_string(),
            patient_context: SAMPLE_PATIENT_CONTEXT.to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub enum StepOutcome {
    Completed(ToolResult),
    Skipped(String),
}

#[derive(Debug, Clone)]
pub struct DemoStep {
    pub operation: String,
    pub outcome: StepOutcome,
    /// Follow-up completion from the chain backend, when one ran and succeeded
    pub chained: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DemoFailure {
    pub operation: String,
    pub error_detail: String,
}

#[derive(Debug, Clone, Default)]
pub struct DemoReport {
    pub steps: Vec<DemoStep>,
    pub failures: Vec<DemoFailure>,
}

impl DemoReport {
    pub fn any_failed(&self) -> bool {
        !self.failures.is_empty()
    }

    fn fail(&mut self, operation: &str, error_detail: String) {
        warn!(operation, error = %error_detail, "Demo step failed");
        self.failures.push(DemoFailure {
            operation: operation.to_string(),
            error_detail,
        });
    }
}

/// Runs the demonstration calls in sequence. A failing call is recorded and
/// the run moves on.
pub struct DemoRunner<'a> {
    invoker: &'a dyn ToolInvoker,
    chain: Option<Arc<dyn LlmClient>>,
    options: DemoOptions,
}

impl<'a> DemoRunner<'a> {
    pub fn new(invoker: &'a dyn ToolInvoker, options: DemoOptions) -> Self {
        Self {
            invoker,
            chain: None,
            options,
        }
    }

    pub fn with_chain(mut self, chain: Arc<dyn LlmClient>) -> Self {
        self.chain = Some(chain);
        self
    }

    pub async fn run(&self) -> DemoReport {
        let mut report = DemoReport::default();

        match self.sample_image() {
            Ok(Some(image)) => {
                let analyze = args(json!({
                    "image": image,
                    "analysis_type": "radiology",
                    "patient_context": self.options.patient_context,
                    "language": "en",
                }));
                self.step(&mut report, ToolName::AnalyzeImage, analyze).await;

                let generate = args(json!({
                    "image": image,
                    "report_type": "diagnostic",
                    "template": "standard",
                    "language": "en",
                }));
                self.step(&mut report, ToolName::GenerateReport, generate).await;
            }
            Ok(None) => {
                for tool in [ToolName::AnalyzeImage, ToolName::GenerateReport] {
                    info!(tool = %tool, "Sample image not found, skipping");
                    report.steps.push(DemoStep {
                        operation: tool.to_string(),
                        outcome: StepOutcome::Skipped("sample image not found".into()),
                        chained: None,
                    });
                }
            }
            Err(e) => {
                for tool in [ToolName::AnalyzeImage, ToolName::GenerateReport] {
                    report.fail(tool.as_str(), e.to_string());
                    report.steps.push(DemoStep {
                        operation: tool.to_string(),
                        outcome: StepOutcome::Completed(ToolResult::failure(tool.as_str(), &e)),
                        chained: None,
                    });
                }
            }
        }

        let qa = args(json!({
            "question": self.options.question,
            "specialty": "radiology",
            "language": "en",
        }));
        self.step(&mut report, ToolName::AnswerQuestion, qa).await;

        report
    }

    async fn step(&self, report: &mut DemoReport, tool: ToolName, arguments: Map<String, Value>) {
        let operation = tool.to_string();
        info!(tool = %tool, "Calling tool");
        let result = self.invoker.call_tool(tool.as_str(), arguments).await;

        let mut chained = None;
        if result.is_ok() {
            if let (Some(chain), Some(payload)) = (&self.chain, result.payload.as_deref()) {
                match chain_completion(chain.as_ref(), payload).await {
                    Ok(text) => chained = Some(text),
                    Err(e) => report.fail(&format!("{} -> chain", operation), e.to_string()),
                }
            }
        } else {
            report.fail(&operation, result.describe_error());
        }

        report.steps.push(DemoStep {
            operation,
            outcome: StepOutcome::Completed(result),
            chained,
        });
    }

    /// Sample image as a data URI, so the server need not share our filesystem
    fn sample_image(&self) -> Result<Option<String>> {
        let Some(path) = &self.options.image else {
            return Ok(None);
        };
        if !path.exists() {
            return Ok(None);
        }
        match ImageInput::Path(path.clone()).to_content_part()? {
            ContentPart::ImageUrl { image_url } => Ok(Some(image_url.url)),
            ContentPart::Text { .. } => Err(LingshuError::InvalidImage(format!(
                "{} did not resolve to an image",
                path.display()
            ))),
        }
    }
}

/// Feed a tool's payload verbatim as user content to the chain backend
pub async fn chain_completion(chain: &dyn LlmClient, payload: &str) -> Result<String> {
    let messages = vec![
        ChatMessage::system(CHAIN_SYSTEM_PROMPT),
        ChatMessage::user(payload),
    ];
    chain
        .complete_text(messages, GenerationParams::default())
        .await
}

fn args(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}
