//! MCP server handler implementation.
//!
//! This module defines the main server handler that
//! routes tool calls to the worker-backed implementations.
use std::sync::Arc;

use crate::tools::cache::{CacheListParams, CacheMatchParams, list_impl, match_impl};
use crate::tools::fetch::{OfflineFetchParams, fetch_impl};

use rmcp::{
    ErrorData as McpError, ServerHandler,
    handler::server::{
        tool::{ToolCallContext, ToolRouter},
        wrapper::Parameters,
    },
    model::{
        CallToolRequestParam, CallToolResult, Implementation, ListToolsResult, PaginatedRequestParam, ProtocolVersion,
        ServerCapabilities, ServerInfo,
    },
    service::{RequestContext, RoleServer},
    tool, tool_router,
};
use shellcache_client::Worker;

/// The main MCP server handler for shellcache.
#[derive(Clone)]
pub struct ShellCacheServer {
    worker: Arc<Worker>,
    tool_router: ToolRouter<Self>,
}

#[tool_router]
impl ShellCacheServer {
    /// Create a server handler around a started worker.
    pub fn new(worker: Arc<Worker>) -> Self {
        Self { worker, tool_router: Self::tool_router() }
    }

    /// Issue a request through the offline-first interception layer.
    #[tool(
        description = "Fetch a URL through the offline-first cache. Navigations and same-origin GETs are served by the caching strategies; other requests go straight to the network."
    )]
    async fn offline_fetch(&self, params: Parameters<OfflineFetchParams>) -> Result<CallToolResult, McpError> {
        fetch_impl(&self.worker, params.0).await
    }

    #[tool(description = "List every cache set with its entry count and whether it belongs to the running version.")]
    async fn cache_list(&self, params: Parameters<CacheListParams>) -> Result<CallToolResult, McpError> {
        list_impl(&self.worker, params.0).await
    }

    /// Look up a stored response without any network access.
    #[tool(description = "Look up a stored response for a URL across all cache sets. Never touches the network.")]
    async fn cache_match(&self, params: Parameters<CacheMatchParams>) -> Result<CallToolResult, McpError> {
        match_impl(&self.worker, params.0).await
    }
}

impl ServerHandler for ShellCacheServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            server_info: Implementation {
                name: "shellcache".into(),
                version: env!("CARGO_PKG_VERSION").into(),
                ..Default::default()
            },
            protocol_version: ProtocolVersion::LATEST,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            ..Default::default()
        }
    }

    async fn list_tools(
        &self, _request: Option<PaginatedRequestParam>, _context: RequestContext<RoleServer>,
    ) -> Result<ListToolsResult, rmcp::model::ErrorData> {
        Ok(ListToolsResult { meta: None, tools: self.tool_router.list_all(), next_cursor: None })
    }

    async fn call_tool(
        &self, request: CallToolRequestParam, context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, rmcp::model::ErrorData> {
        self.tool_router
            .call(ToolCallContext::new(self, request, context))
            .await
    }
}
