// src/tools/dispatcher.rs
// Routes validated tool requests to the backend and builds ToolResults

use super::prompts::{self, ReportPrompt};
use super::report::parse_sections;
use super::{
    AnalysisType, AnalyzeImageArgs, AnswerQuestionArgs, GenerateReportArgs, ReportTemplate,
    ToolRequest, ToolResult,
};
use crate::error::Result;
use crate::image::ImageInput;
use crate::llm::{ChatMessage, ContentPart, GenerationParams, LlmClient};
use chrono::Utc;
use serde_json::{Map, Value};
use std::sync::Arc;
use std::time::Instant;
use tracing::{Span, info, instrument, warn};

pub const ANALYZE_PARAMS: GenerationParams = GenerationParams {
    max_tokens: 2048,
    temperature: 0.1,
};
pub const REPORT_PARAMS: GenerationParams = GenerationParams {
    max_tokens: 3072,
    temperature: 0.1,
};
pub const QA_PARAMS: GenerationParams = GenerationParams {
    max_tokens: 2048,
    temperature: 0.2,
};

const DEFAULT_REPORT_TYPE: &str = "diagnostic";
const DEFAULT_SPECIALTY: &str = "general";

/// Executes tool requests against one chat-completion backend.
///
/// Holds no per-call state; clones share the backend.
#[derive(Clone)]
pub struct ToolDispatcher {
    backend: Arc<dyn LlmClient>,
}

impl ToolDispatcher {
    pub fn new(backend: Arc<dyn LlmClient>) -> Self {
        Self { backend }
    }

    pub fn model_name(&self) -> String {
        self.backend.model_name()
    }

    /// Validate a raw `{name, arguments}` call and run it
    pub async fn invoke(&self, name: &str, arguments: Option<Map<String, Value>>) -> ToolResult {
        match ToolRequest::from_call(name, arguments) {
            Ok(request) => self.dispatch(request).await,
            Err(e) => {
                warn!(tool = name, error = %e, "Rejected tool call");
                ToolResult::failure(name, &e)
            }
        }
    }

    /// Run a validated request. Makes exactly one backend call unless the
    /// image fails to resolve first.
    #[instrument(skip(self, request), fields(tool = %request.tool(), duration_ms))]
    pub async fn dispatch(&self, request: ToolRequest) -> ToolResult {
        let tool = request.tool();
        let start = Instant::now();

        let outcome = match request {
            ToolRequest::AnalyzeImage(args) => self.analyze_image(args).await,
            ToolRequest::GenerateReport(args) => self.generate_report(args).await,
            ToolRequest::AnswerQuestion(args) => self.answer_question(args).await,
        };

        let duration_ms = start.elapsed().as_millis() as u64;
        Span::current().record("duration_ms", duration_ms);

        match outcome {
            Ok(result) => {
                info!(
                    tool = %tool,
                    duration_ms,
                    payload_len = result.payload.as_deref().map_or(0, str::len),
                    "Tool call complete"
                );
                result.with_model(self.backend.model_name())
            }
            Err(e) => {
                warn!(tool = %tool, duration_ms, error = %e, "Tool call failed");
                ToolResult::failure(tool.as_str(), &e).with_model(self.backend.model_name())
            }
        }
    }

    async fn analyze_image(&self, args: AnalyzeImageArgs) -> Result<ToolResult> {
        let language = args.language.unwrap_or_default();
        let analysis_type = AnalysisType::parse(args.analysis_type.as_deref());
        let question = args
            .question
            .as_deref()
            .map(str::trim)
            .filter(|q| !q.is_empty())
            .unwrap_or_else(|| prompts::default_image_question(language));

        let image = ImageInput::from_argument(&args.image);
        let image_part = image.to_content_part()?;

        let messages = vec![
            ChatMessage::system(prompts::analyst_system(analysis_type, language)),
            ChatMessage::user_parts(vec![
                ContentPart::text(prompts::analyst_user(
                    question,
                    args.patient_context.as_deref(),
                    language,
                )),
                image_part,
            ]),
        ];

        let text = self.backend.complete_text(messages, ANALYZE_PARAMS).await?;

        Ok(ToolResult::success("analyze_image", text)
            .with_metadata("analysis_type", analysis_type.as_str())
            .with_metadata("language", language.as_str())
            .with_metadata("question", question)
            .with_metadata("image", image.describe()))
    }

    async fn generate_report(&self, args: GenerateReportArgs) -> Result<ToolResult> {
        let language = args.language.unwrap_or_default();
        let template = ReportTemplate::parse(args.template.as_deref());
        let report_type = args
            .report_type
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .unwrap_or(DEFAULT_REPORT_TYPE);
        let findings = args.findings.unwrap_or_default();

        let image = ImageInput::from_argument(&args.image);
        let image_part = image.to_content_part()?;

        let user_text = prompts::report_user(&ReportPrompt {
            report_type,
            template: &template,
            findings: &findings,
            patient_info: args.patient_info.as_ref(),
            language,
            date: Utc::now().date_naive(),
        });
        let messages = vec![
            ChatMessage::system(prompts::report_system(language)),
            ChatMessage::user_parts(vec![ContentPart::text(user_text), image_part]),
        ];

        let text = self.backend.complete_text(messages, REPORT_PARAMS).await?;

        let sections = parse_sections(&text);
        if !sections.is_complete() {
            warn!(
                missing = ?sections.missing,
                "Generated report is missing expected sections"
            );
        }

        let mut result = ToolResult::success("generate_report", text)
            .with_metadata("report_type", report_type)
            .with_metadata("template", template.label())
            .with_metadata("language", language.as_str())
            .with_metadata("findings_count", findings.len())
            .with_metadata("image", image.describe());
        if let Ok(structured) = serde_json::to_value(&sections) {
            result = result.with_structured(structured);
        }
        Ok(result)
    }

    async fn answer_question(&self, args: AnswerQuestionArgs) -> Result<ToolResult> {
        let language = args.language.unwrap_or_default();
        let specialty = args
            .specialty
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .unwrap_or(DEFAULT_SPECIALTY);

        let messages = vec![
            ChatMessage::system(prompts::qa_system(specialty, language)),
            ChatMessage::user(prompts::qa_user(
                &args.question,
                args.context.as_deref(),
                language,
            )),
        ];

        let text = self.backend.complete_text(messages, QA_PARAMS).await?;

        Ok(ToolResult::success("answer_question", text)
            .with_metadata("specialty", specialty)
            .with_metadata("language", language.as_str()))
    }
}
