//! MCP tool adapter.
//!
//! Exposes each gateway endpoint as a named MCP tool. The adapter keeps no
//! state beyond the gateway base URL and a transport: every tool call is one
//! outbound request whose outcome is handed back to the agent as text.

pub mod client;
mod requests;

pub use client::{
    GatewayClient, GatewayRequest, HttpTransport, Transport, TransportError, TransportFuture,
    TransportResponse, DEFAULT_SERVER_URL,
};
pub use requests::*;

use crate::error::ToolError;
use crate::tool_registry::{
    self, ToolCategory, ToolInfo, CHECK_CONNECTION, DECOMPILE_FUNCTION, GET_CROSS_REFERENCES,
    LIST_EXPORTS, LIST_FUNCTIONS, LIST_IMPORTS, LIST_STRINGS, LIST_TYPES, RENAME_FUNCTION,
    UPDATE_ANALYSIS,
};
use rmcp::{
    handler::server::{router::tool::ToolRouter, tool::ToolCallContext, wrapper::Parameters},
    model::{CallToolResult, Content, ServerCapabilities, ServerInfo, Tool},
    tool, tool_handler, tool_router, ErrorData as McpError, ServerHandler,
};
use serde::Serialize;
use serde_json::json;
use std::net::SocketAddr;
use tracing::{debug, info, instrument};

/// Page size used when a listing tool is called without `limit`.
pub const DEFAULT_LIMIT: usize = 100;
/// Largest page a listing tool will request.
pub const MAX_LIMIT: usize = 10_000;

/// How the adapter talks to its MCP client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum McpTransport {
    Stdio,
    /// Streamable HTTP served at `/mcp`.
    Http { bind: SocketAddr, stateless: bool },
}

/// Adapter settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BridgeConfig {
    pub server_url: String,
    pub transport: McpTransport,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            server_url: DEFAULT_SERVER_URL.to_string(),
            transport: McpTransport::Stdio,
        }
    }
}

/// MCP server forwarding tool calls to the gateway.
#[derive(Clone)]
pub struct BinjaBridge {
    client: GatewayClient,
    tool_mux: ToolMux<BinjaBridge>,
}

#[derive(Clone)]
struct ToolMux<S> {
    call_router: ToolRouter<S>,
}

impl<S> ToolMux<S>
where
    S: Send + Sync + 'static,
{
    fn new(call_router: ToolRouter<S>) -> Self {
        Self { call_router }
    }

    async fn call(
        &self,
        context: ToolCallContext<'_, S>,
    ) -> Result<CallToolResult, rmcp::ErrorData> {
        self.call_router.call(context).await
    }

    /// Routed tools in registry order.
    fn list_all(&self) -> Vec<Tool> {
        let mut tools = Vec::new();
        for info in tool_registry::all_tools() {
            if let Some(route) = self.call_router.map.get(info.name) {
                tools.push(route.attr.clone());
            }
        }
        tools
    }
}

impl BinjaBridge {
    pub fn new(client: GatewayClient) -> Self {
        info!(server = %client.base_url(), "Creating MCP bridge");
        let call_router = Self::tool_router();
        Self {
            client,
            tool_mux: ToolMux::new(call_router),
        }
    }

    fn instructions(&self) -> String {
        let mut text = format!(
            "Binary analysis tools backed by the gateway at {}. \
             \nNames are matched exactly; when several functions share a name, the first one wins. \
             \nListings are paginated with offset/limit (default limit {DEFAULT_LIMIT}). \
             \nAfter renaming, call update_analysis if cross-references look stale.\n",
            self.client.base_url()
        );
        for category in ToolCategory::all() {
            text.push_str(&format!(
                "\n{}: {}",
                category.as_str(),
                category.description()
            ));
            for tool in tool_registry::tools_by_category(*category) {
                text.push_str(&format!(
                    "\n- {}: {} e.g. {}",
                    tool.name, tool.short_desc, tool.example
                ));
            }
        }
        text
    }

    fn page(req: &ListRequest) -> Vec<(String, String)> {
        let offset = req.offset.unwrap_or(0);
        let limit = req.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);
        vec![
            ("offset".to_string(), offset.to_string()),
            ("limit".to_string(), limit.to_string()),
        ]
    }

    fn json_result<T: Serialize>(value: &T) -> CallToolResult {
        match serde_json::to_string(value) {
            Ok(text) => CallToolResult::success(vec![Content::text(text)]),
            Err(e) => ToolError::from(e).to_tool_result(),
        }
    }

    fn required(field: &str, value: &str) -> Result<(), ToolError> {
        if value.trim().is_empty() {
            return Err(ToolError::InvalidParams(format!("{field} must not be empty")));
        }
        Ok(())
    }

    async fn list(&self, tool: &ToolInfo, req: ListRequest) -> CallToolResult {
        let lines = self.client.get_lines(tool, Self::page(&req)).await;
        Self::json_result(&lines)
    }
}

#[tool_router]
impl BinjaBridge {
    #[tool(description = "List all function names in the binary, in analysis order (paginated).")]
    #[instrument(skip(self), fields(offset = req.offset, limit = req.limit))]
    async fn list_functions(
        &self,
        Parameters(req): Parameters<ListRequest>,
    ) -> Result<CallToolResult, McpError> {
        debug!("Tool call: list_functions");
        Ok(self.list(&LIST_FUNCTIONS, req).await)
    }

    #[tool(description = "List all type names defined in the binary (paginated).")]
    #[instrument(skip(self), fields(offset = req.offset, limit = req.limit))]
    async fn list_types(
        &self,
        Parameters(req): Parameters<ListRequest>,
    ) -> Result<CallToolResult, McpError> {
        debug!("Tool call: list_types");
        Ok(self.list(&LIST_TYPES, req).await)
    }

    #[tool(description = "List imported function symbols (paginated).")]
    #[instrument(skip(self), fields(offset = req.offset, limit = req.limit))]
    async fn list_imports(
        &self,
        Parameters(req): Parameters<ListRequest>,
    ) -> Result<CallToolResult, McpError> {
        debug!("Tool call: list_imports");
        Ok(self.list(&LIST_IMPORTS, req).await)
    }

    #[tool(description = "List exported symbols: global functions and data (paginated).")]
    #[instrument(skip(self), fields(offset = req.offset, limit = req.limit))]
    async fn list_exports(
        &self,
        Parameters(req): Parameters<ListRequest>,
    ) -> Result<CallToolResult, McpError> {
        debug!("Tool call: list_exports");
        Ok(self.list(&LIST_EXPORTS, req).await)
    }

    #[tool(description = "List strings found in the binary as '0x<addr>: <value>' (paginated).")]
    #[instrument(skip(self), fields(offset = req.offset, limit = req.limit))]
    async fn list_strings(
        &self,
        Parameters(req): Parameters<ListRequest>,
    ) -> Result<CallToolResult, McpError> {
        debug!("Tool call: list_strings");
        Ok(self.list(&LIST_STRINGS, req).await)
    }

    #[tool(description = "Decompile a function by exact name. Returns High Level IL, \
        or Medium Level IL with a note when HLIL is unavailable.")]
    #[instrument(skip(self), fields(name = %req.name))]
    async fn decompile_function(
        &self,
        Parameters(req): Parameters<DecompileFunctionRequest>,
    ) -> Result<CallToolResult, McpError> {
        debug!("Tool call: decompile_function");
        if let Err(e) = Self::required("name", &req.name) {
            return Ok(e.to_tool_result());
        }
        let text = self.client.post_text(&DECOMPILE_FUNCTION, req.name).await;
        Ok(CallToolResult::success(vec![Content::text(text)]))
    }

    #[tool(description = "Rename a function, or a data variable when no function has that name.")]
    #[instrument(skip(self), fields(old_name = %req.old_name, new_name = %req.new_name))]
    async fn rename_function(
        &self,
        Parameters(req): Parameters<RenameFunctionRequest>,
    ) -> Result<CallToolResult, McpError> {
        debug!("Tool call: rename_function");
        let body = json!({ "old_name": req.old_name, "new_name": req.new_name });
        let body = match serde_json::to_string(&body) {
            Ok(body) => body,
            Err(e) => return Ok(ToolError::from(e).to_tool_result()),
        };
        let text = self.client.post_text(&RENAME_FUNCTION, body).await;
        Ok(CallToolResult::success(vec![Content::text(text)]))
    }

    #[tool(description = "List code locations referencing a function or data variable, \
        each with its containing function when known.")]
    #[instrument(skip(self), fields(name = %req.name))]
    async fn get_cross_references(
        &self,
        Parameters(req): Parameters<CrossReferencesRequest>,
    ) -> Result<CallToolResult, McpError> {
        debug!("Tool call: get_cross_references");
        if let Err(e) = Self::required("name", &req.name) {
            return Ok(e.to_tool_result());
        }
        let lines = self
            .client
            .get_lines(&GET_CROSS_REFERENCES, vec![("name".to_string(), req.name)])
            .await;
        Ok(Self::json_result(&lines))
    }

    #[tool(description = "Re-run analysis and wait for it to finish. \
        Useful after renames so cross-references are up to date.")]
    #[instrument(skip(self))]
    async fn update_analysis(&self) -> Result<CallToolResult, McpError> {
        debug!("Tool call: update_analysis");
        let text = self.client.post_text(&UPDATE_ANALYSIS, String::new()).await;
        Ok(CallToolResult::success(vec![Content::text(text)]))
    }

    #[tool(description = "Check that the gateway is reachable and report the loaded binary.")]
    #[instrument(skip(self))]
    async fn check_connection(&self) -> Result<CallToolResult, McpError> {
        debug!("Tool call: {}", CHECK_CONNECTION.name);
        let status = self.client.health().await;
        Ok(Self::json_result(&status))
    }
}

#[tool_handler(router = self.tool_mux)]
impl ServerHandler for BinjaBridge {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            instructions: Some(self.instructions()),
            ..Default::default()
        }
    }
}
