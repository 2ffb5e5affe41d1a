// src/tools/mod.rs
// Tool contracts: argument schemas, validated requests, and results

pub mod dispatcher;
pub mod prompts;
pub mod report;

pub use dispatcher::ToolDispatcher;
pub use report::{ReportSections, Section, parse_sections};

use crate::error::{ErrorKind, LingshuError, Result};
use chrono::{DateTime, Utc};
use rmcp::schemars;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;

/// The closed set of tools the server registers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolName {
    AnalyzeImage,
    GenerateReport,
    AnswerQuestion,
}

impl ToolName {
    pub const ALL: [ToolName; 3] = [
        ToolName::AnalyzeImage,
        ToolName::GenerateReport,
        ToolName::AnswerQuestion,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AnalyzeImage => "analyze_image",
            Self::GenerateReport => "generate_report",
            Self::AnswerQuestion => "answer_question",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.as_str() == name)
    }
}

impl fmt::Display for ToolName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Response language for prompts and generated text
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    En,
    Zh,
}

impl Language {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::En => "en",
            Self::Zh => "zh",
        }
    }
}

/// Imaging discipline the analyst prompt is specialised for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnalysisType {
    Radiology,
    Pathology,
    Dermatology,
    Ophthalmology,
    General,
}

impl AnalysisType {
    /// Parse a caller value; unrecognised values fall back to `General`
    pub fn parse(value: Option<&str>) -> Self {
        match value.map(|v| v.trim().to_lowercase()).as_deref() {
            None | Some("") | Some("radiology") => Self::Radiology,
            Some("pathology") => Self::Pathology,
            Some("dermatology") => Self::Dermatology,
            Some("ophthalmology") => Self::Ophthalmology,
            Some(_) => Self::General,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Radiology => "radiology",
            Self::Pathology => "pathology",
            Self::Dermatology => "dermatology",
            Self::Ophthalmology => "ophthalmology",
            Self::General => "general",
        }
    }
}

/// Report template: a named detail level or a caller-written description
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReportTemplate {
    Standard,
    Detailed,
    Brief,
    Custom(String),
}

impl ReportTemplate {
    pub fn parse(value: Option<&str>) -> Self {
        let Some(raw) = value.map(str::trim).filter(|v| !v.is_empty()) else {
            return Self::Standard;
        };
        match raw.to_lowercase().as_str() {
            "standard" => Self::Standard,
            "detailed" => Self::Detailed,
            "brief" => Self::Brief,
            _ => Self::Custom(raw.to_string()),
        }
    }

    pub fn label(&self) -> &str {
        match self {
            Self::Standard => "standard",
            Self::Detailed => "detailed",
            Self::Brief => "brief",
            Self::Custom(_) => "custom",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct AnalyzeImageArgs {
    #[schemars(description = "Image to analyze: base64 data, data URI, http(s) URL, or local file path")]
    pub image: String,
    #[schemars(description = "Question about the image (default: general assessment)")]
    pub question: Option<String>,
    #[schemars(description = "Type: radiology/pathology/dermatology/ophthalmology/general (default radiology)")]
    pub analysis_type: Option<String>,
    #[schemars(description = "Patient clinical background")]
    pub patient_context: Option<String>,
    #[schemars(description = "Response language: en/zh (default en)")]
    pub language: Option<Language>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct GenerateReportArgs {
    #[schemars(description = "Image to report on: base64 data, data URI, http(s) URL, or local file path")]
    pub image: String,
    #[schemars(description = "Template: standard/detailed/brief, or a free-text template/schema description")]
    pub template: Option<String>,
    #[schemars(description = "Prior findings to include")]
    pub findings: Option<Vec<String>>,
    #[schemars(description = "Report type: diagnostic/screening/follow_up/consultation (default diagnostic)")]
    pub report_type: Option<String>,
    #[schemars(description = "Patient information as key/value pairs")]
    pub patient_info: Option<BTreeMap<String, Value>>,
    #[schemars(description = "Response language: en/zh (default en)")]
    pub language: Option<Language>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct AnswerQuestionArgs {
    #[schemars(description = "Medical question")]
    pub question: String,
    #[schemars(description = "Relevant background information")]
    pub context: Option<String>,
    #[schemars(description = "Specialty: general/radiology/pathology/surgery/... (default general)")]
    pub specialty: Option<String>,
    #[schemars(description = "Response language: en/zh (default en)")]
    pub language: Option<Language>,
}

/// A tool invocation whose arguments already passed schema validation
#[derive(Debug, Clone, PartialEq)]
pub enum ToolRequest {
    AnalyzeImage(AnalyzeImageArgs),
    GenerateReport(GenerateReportArgs),
    AnswerQuestion(AnswerQuestionArgs),
}

impl ToolRequest {
    /// Validate a `{tool_name, arguments}` pair against the tool's schema.
    ///
    /// Unknown tools, unknown arguments, missing required arguments and
    /// ill-typed values are all `InvalidArgument`.
    pub fn from_call(name: &str, arguments: Option<Map<String, Value>>) -> Result<Self> {
        let tool = ToolName::from_name(name).ok_or_else(|| {
            LingshuError::InvalidArgument(format!(
                "unknown tool '{}'; expected one of: {}",
                name,
                ToolName::ALL.map(|t| t.as_str()).join(", ")
            ))
        })?;
        let args = Value::Object(arguments.unwrap_or_default());

        let request = match tool {
            ToolName::AnalyzeImage => Self::AnalyzeImage(parse_args(tool, args)?),
            ToolName::GenerateReport => Self::GenerateReport(parse_args(tool, args)?),
            ToolName::AnswerQuestion => Self::AnswerQuestion(parse_args(tool, args)?),
        };
        request.validate()?;
        Ok(request)
    }

    pub fn tool(&self) -> ToolName {
        match self {
            Self::AnalyzeImage(_) => ToolName::AnalyzeImage,
            Self::GenerateReport(_) => ToolName::GenerateReport,
            Self::AnswerQuestion(_) => ToolName::AnswerQuestion,
        }
    }

    /// Shape checks serde cannot express. Image content is checked later, as `InvalidImage`.
    pub fn validate(&self) -> Result<()> {
        match self {
            Self::AnswerQuestion(args) if args.question.trim().is_empty() => Err(
                LingshuError::InvalidArgument("answer_question: `question` must not be blank".into()),
            ),
            Self::GenerateReport(args)
                if args
                    .findings
                    .as_ref()
                    .is_some_and(|f| f.iter().any(|item| item.trim().is_empty())) =>
            {
                Err(LingshuError::InvalidArgument(
                    "generate_report: `findings` must not contain blank entries".into(),
                ))
            }
            _ => Ok(()),
        }
    }
}

fn parse_args<T: serde::de::DeserializeOwned>(tool: ToolName, args: Value) -> Result<T> {
    serde_json::from_value(args)
        .map_err(|e| LingshuError::InvalidArgument(format!("{}: {}", tool, e)))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToolStatus {
    Ok,
    Error,
}

/// Response envelope for every tool invocation, successful or not
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolResult {
    pub status: ToolStatus,
    pub tool: String,
    /// Raw assistant text from the backend
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<String>,
    /// Parsed structure layered over `payload` (report sections)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub structured: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<ErrorKind>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_detail: Option<String>,
    /// Effective options the call ran with
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub metadata: Map<String, Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl ToolResult {
    pub fn success(tool: impl Into<String>, payload: impl Into<String>) -> Self {
        Self {
            status: ToolStatus::Ok,
            tool: tool.into(),
            payload: Some(payload.into()),
            structured: None,
            error_kind: None,
            error_detail: None,
            metadata: Map::new(),
            model: None,
            timestamp: Utc::now(),
        }
    }

    pub fn failure(tool: impl Into<String>, error: &LingshuError) -> Self {
        Self::error(tool, error.kind(), error.to_string())
    }

    pub fn error(tool: impl Into<String>, kind: Option<ErrorKind>, detail: impl Into<String>) -> Self {
        Self {
            status: ToolStatus::Error,
            tool: tool.into(),
            payload: None,
            structured: None,
            error_kind: kind,
            error_detail: Some(detail.into()),
            metadata: Map::new(),
            model: None,
            timestamp: Utc::now(),
        }
    }

    pub fn with_structured(mut self, structured: Value) -> Self {
        self.structured = Some(structured);
        self
    }

    pub fn with_metadata(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.to_string(), value.into());
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn is_ok(&self) -> bool {
        self.status == ToolStatus::Ok
    }

    /// `error_detail` prefixed with the error kind, for display
    pub fn describe_error(&self) -> String {
        match (&self.error_kind, &self.error_detail) {
            (Some(kind), Some(detail)) => format!("[{}] {}", kind, detail),
            (None, Some(detail)) => detail.clone(),
            (Some(kind), None) => kind.to_string(),
            (None, None) => "unknown error".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn args(value: Value) -> Option<Map<String, Value>> {
        match value {
            Value::Object(map) => Some(map),
            _ => None,
        }
    }

    #[test]
    fn test_tool_name_round_trip() {
        for tool in ToolName::ALL {
            assert_eq!(ToolName::from_name(tool.as_str()), Some(tool));
        }
        assert_eq!(ToolName::from_name("medical_qa"), None);
    }

    #[test]
    fn test_from_call_analyze_image() {
        let request = ToolRequest::from_call(
            "analyze_image",
            args(json!({"image": "https://example.org/a.png", "question": "Is there a fracture?"})),
        )
        .unwrap();
        assert_eq!(request.tool(), ToolName::AnalyzeImage);
        match request {
            ToolRequest::AnalyzeImage(a) => {
                assert_eq!(a.question.as_deref(), Some("Is there a fracture?"));
                assert!(a.language.is_none());
            }
            other => panic!("unexpected request: {:?}", other),
        }
    }

    #[test]
    fn test_from_call_missing_required_argument() {
        let err = ToolRequest::from_call("analyze_image", args(json!({"question": "?"}))).unwrap_err();
        assert_eq!(err.kind(), Some(ErrorKind::InvalidArgument));
        assert!(err.to_string().contains("image"));

        let err = ToolRequest::from_call("answer_question", None).unwrap_err();
        assert_eq!(err.kind(), Some(ErrorKind::InvalidArgument));
    }

    #[test]
    fn test_from_call_unknown_argument() {
        let err = ToolRequest::from_call(
            "answer_question",
            args(json!({"question": "q", "temperature": 2.0})),
        )
        .unwrap_err();
        assert_eq!(err.kind(), Some(ErrorKind::InvalidArgument));
        assert!(err.to_string().contains("temperature"));
    }

    #[test]
    fn test_from_call_unknown_tool() {
        let err = ToolRequest::from_call("delete_patient", None).unwrap_err();
        assert_eq!(err.kind(), Some(ErrorKind::InvalidArgument));
        assert!(err.to_string().contains("unknown tool"));
    }

    #[test]
    fn test_from_call_wrong_type() {
        let err = ToolRequest::from_call("generate_report", args(json!({"image": 42}))).unwrap_err();
        assert_eq!(err.kind(), Some(ErrorKind::InvalidArgument));

        let err = ToolRequest::from_call(
            "answer_question",
            args(json!({"question": "q", "language": "fr"})),
        )
        .unwrap_err();
        assert_eq!(err.kind(), Some(ErrorKind::InvalidArgument));
    }

    #[test]
    fn test_blank_question_rejected() {
        let err = ToolRequest::from_call("answer_question", args(json!({"question": "   "}))).unwrap_err();
        assert_eq!(err.kind(), Some(ErrorKind::InvalidArgument));
    }

    #[test]
    fn test_blank_finding_rejected() {
        let err = ToolRequest::from_call(
            "generate_report",
            args(json!({"image": "x.png", "findings": ["nodule", " "]})),
        )
        .unwrap_err();
        assert_eq!(err.kind(), Some(ErrorKind::InvalidArgument));
    }

    #[test]
    fn test_empty_image_passes_schema() {
        // Empty image content is an InvalidImage concern, not a schema one
        let request = ToolRequest::from_call("analyze_image", args(json!({"image": ""})));
        assert!(request.is_ok());
    }

    #[test]
    fn test_analysis_type_fallback() {
        assert_eq!(AnalysisType::parse(None), AnalysisType::Radiology);
        assert_eq!(AnalysisType::parse(Some("Pathology")), AnalysisType::Pathology);
        assert_eq!(AnalysisType::parse(Some("cardiology")), AnalysisType::General);
    }

    #[test]
    fn test_report_template_parse() {
        assert_eq!(ReportTemplate::parse(None), ReportTemplate::Standard);
        assert_eq!(ReportTemplate::parse(Some("BRIEF")), ReportTemplate::Brief);
        assert_eq!(
            ReportTemplate::parse(Some("Sections: Technique, Findings")),
            ReportTemplate::Custom("Sections: Technique, Findings".into())
        );
    }

    #[test]
    fn test_tool_result_serialization() {
        let ok = ToolResult::success("answer_question", "Nodules under 6 mm ...")
            .with_metadata("language", "en")
            .with_model("Lingshu-7B");
        let value = serde_json::to_value(&ok).unwrap();
        assert_eq!(value["status"], "ok");
        assert_eq!(value["payload"], "Nodules under 6 mm ...");
        assert_eq!(value["metadata"]["language"], "en");
        assert!(value.get("error_detail").is_none());

        let err = ToolResult::failure(
            "analyze_image",
            &LingshuError::InvalidImage("image data is empty".into()),
        );
        let value = serde_json::to_value(&err).unwrap();
        assert_eq!(value["status"], "error");
        assert_eq!(value["error_kind"], "invalid_image");
        assert!(value["error_detail"].as_str().unwrap().contains("image data is empty"));

        let back: ToolResult = serde_json::from_value(value).unwrap();
        assert_eq!(back, err);
    }

    #[test]
    fn test_describe_error() {
        let err = ToolResult::error("t", Some(ErrorKind::BackendUnavailable), "timed out");
        assert_eq!(err.describe_error(), "[BackendUnavailable] timed out");
    }
}
