//! MCP stdio surface: the operation catalog as tools, for one owner.

use crate::tools::ToolHandler;
use rmcp::{
    ErrorData, RoleServer, ServerHandler,
    model::{
        CallToolRequestParams, CallToolResult, Content, InitializeResult, ListToolsResult,
        PaginatedRequestParams, ServerCapabilities,
    },
    service::RequestContext,
};
use serde_json::{Value, json};
use std::sync::Arc;
use tracing::{debug, warn};

const INSTRUCTIONS: &str = "\
Personal task list. Use get_tasks to read tasks, add_task to create one, \
update_task_by_title and delete_task_by_title to change or remove a task by its title.";

/// MCP server handler bound to a single owner.
#[derive(Clone)]
pub struct TaskFlowMcpServer {
    tools: Arc<ToolHandler>,
    owner: String,
}

impl TaskFlowMcpServer {
    pub fn new(tools: Arc<ToolHandler>, owner: impl Into<String>) -> Self {
        Self {
            tools,
            owner: owner.into(),
        }
    }

    /// Run one tool call and shape the MCP result.
    pub fn call(&self, name: &str, args: Value) -> CallToolResult {
        let start = std::time::Instant::now();
        match self.tools.call(&self.owner, name, args) {
            Ok(outcome) => {
                debug!(
                    tool = %name,
                    mutated = outcome.mutated,
                    duration_ms = start.elapsed().as_millis() as u64,
                    "Tool call finished"
                );
                CallToolResult {
                    content: vec![Content::text(outcome.text)],
                    is_error: outcome.is_error.then_some(true),
                    meta: None,
                    structured_content: None,
                }
            }
            Err(e) => {
                warn!(
                    tool = %name,
                    error_code = ?e.code,
                    error_message = %e.message,
                    duration_ms = start.elapsed().as_millis() as u64,
                    "Tool call failed"
                );
                let error_json = serde_json::to_string(&e)
                    .unwrap_or_else(|_| json!({ "error": e.to_string() }).to_string());
                CallToolResult {
                    content: vec![Content::text(error_json)],
                    is_error: Some(true),
                    meta: None,
                    structured_content: None,
                }
            }
        }
    }
}

impl ServerHandler for TaskFlowMcpServer {
    fn get_info(&self) -> InitializeResult {
        InitializeResult {
            protocol_version: Default::default(),
            server_info: rmcp::model::Implementation {
                name: "taskflow".into(),
                version: env!("CARGO_PKG_VERSION").into(),
                ..Default::default()
            },
            capabilities: ServerCapabilities {
                tools: Some(rmcp::model::ToolsCapability::default()),
                ..Default::default()
            },
            instructions: Some(INSTRUCTIONS.to_string()),
        }
    }

    async fn list_tools(
        &self,
        _request: Option<PaginatedRequestParams>,
        _context: RequestContext<RoleServer>,
    ) -> std::result::Result<ListToolsResult, ErrorData> {
        Ok(ListToolsResult {
            tools: self.tools.get_tools(),
            next_cursor: None,
            meta: None,
        })
    }

    async fn call_tool(
        &self,
        request: CallToolRequestParams,
        _context: RequestContext<RoleServer>,
    ) -> std::result::Result<CallToolResult, ErrorData> {
        let args = Value::Object(request.arguments.unwrap_or_default());
        Ok(self.call(&request.name, args))
    }
}
