// src/mcp/mod.rs
// MCP Server implementation

pub mod http;

use crate::tools::{
    AnalyzeImageArgs, AnswerQuestionArgs, GenerateReportArgs, ToolDispatcher, ToolRequest,
    ToolResult,
};
use rmcp::{
    ErrorData, ServerHandler,
    handler::server::{router::tool::ToolRouter, tool::ToolCallContext, wrapper::Parameters},
    model::{
        CallToolRequestParams, CallToolResult, Content, ListToolsResult, PaginatedRequestParams,
        ServerCapabilities, ServerInfo,
    },
    service::{RequestContext, RoleServer},
    tool, tool_router,
};
use std::time::Instant;
use tracing::{debug, info};

/// MCP Server state
#[derive(Clone)]
pub struct LingshuServer {
    dispatcher: ToolDispatcher,
    tool_router: ToolRouter<Self>,
}

impl LingshuServer {
    pub fn new(dispatcher: ToolDispatcher) -> Self {
        Self {
            dispatcher,
            tool_router: Self::tool_router(),
        }
    }

    async fn run(&self, request: ToolRequest) -> Result<CallToolResult, ErrorData> {
        Ok(to_call_result(&self.dispatcher.dispatch(request).await))
    }
}

#[tool_router]
impl LingshuServer {
    #[tool(description = "Analyze a medical image (radiology, pathology, dermatology, ophthalmology) and answer a question about it.")]
    async fn analyze_image(
        &self,
        Parameters(args): Parameters<AnalyzeImageArgs>,
    ) -> Result<CallToolResult, ErrorData> {
        self.run(ToolRequest::AnalyzeImage(args)).await
    }

    #[tool(description = "Generate a structured medical report (FINDINGS / IMPRESSION / RECOMMENDATIONS) for an image.")]
    async fn generate_report(
        &self,
        Parameters(args): Parameters<GenerateReportArgs>,
    ) -> Result<CallToolResult, ErrorData> {
        self.run(ToolRequest::GenerateReport(args)).await
    }

    #[tool(description = "Answer a medical question. Text only.")]
    async fn answer_question(
        &self,
        Parameters(args): Parameters<AnswerQuestionArgs>,
    ) -> Result<CallToolResult, ErrorData> {
        self.run(ToolRequest::AnswerQuestion(args)).await
    }
}

/// Wrap a ToolResult as the single text content of a CallToolResult.
/// `is_error` mirrors the result status.
pub fn to_call_result(result: &ToolResult) -> CallToolResult {
    let text = match serde_json::to_string(result) {
        Ok(json) => json,
        Err(e) => format!(
            "{{\"status\":\"error\",\"tool\":\"{}\",\"error_detail\":\"result serialization failed: {}\"}}",
            result.tool, e
        ),
    };
    if result.is_ok() {
        CallToolResult::success(vec![Content::text(text)])
    } else {
        CallToolResult::error(vec![Content::text(text)])
    }
}

impl ServerHandler for LingshuServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: Default::default(),
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: rmcp::model::Implementation {
                name: "lingshu".into(),
                title: Some("Lingshu - Medical Multimodal Tools".into()),
                version: env!("CARGO_PKG_VERSION").into(),
                icons: None,
                website_url: None,
            },
            instructions: Some(
                "Lingshu exposes a medical multimodal model: image analysis, structured report generation and medical question answering. Results are JSON ToolResult envelopes.".into(),
            ),
        }
    }

    fn list_tools(
        &self,
        _request: Option<PaginatedRequestParams>,
        _context: RequestContext<RoleServer>,
    ) -> impl std::future::Future<Output = Result<ListToolsResult, ErrorData>> + Send + '_ {
        std::future::ready(Ok(ListToolsResult {
            tools: self.tool_router.list_all(),
            next_cursor: None,
            meta: None,
        }))
    }

    #[allow(clippy::manual_async_fn)]
    fn call_tool(
        &self,
        request: CallToolRequestParams,
        context: RequestContext<RoleServer>,
    ) -> impl std::future::Future<Output = Result<CallToolResult, ErrorData>> + Send + '_ {
        async move {
            let tool_name = request.name.to_string();
            let start = Instant::now();

            // Schema failures become InvalidArgument envelopes instead of protocol errors
            if let Err(e) = ToolRequest::from_call(&tool_name, request.arguments.clone()) {
                debug!(tool = %tool_name, error = %e, "Rejected tool call before routing");
                return Ok(to_call_result(&ToolResult::failure(&tool_name, &e)));
            }

            let ctx = ToolCallContext::new(self, request, context);
            let result = self.tool_router.call(ctx).await;

            let duration_ms = start.elapsed().as_millis() as u64;
            let success = matches!(&result, Ok(r) if r.is_error != Some(true));
            info!(tool = %tool_name, duration_ms, success, "MCP tool call");

            result
        }
    }
}
