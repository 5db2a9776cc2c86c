//! Request dispatch
//!
//! Routes a request by method, then by tool name, and wraps the result in the
//! uniform envelope. The handler map must be keyed exactly like the registry;
//! [`Dispatcher::new`] refuses to build otherwise.

use crate::mcp::errors::{McpError, McpResult};
use crate::mcp::protocol::{
    CallToolParams, ListToolsResult, METHOD_TOOLS_CALL, METHOD_TOOLS_LIST, ToolRequest,
};
use crate::mcp::registry::ToolRegistry;
use crate::mcp::tools::{ToolHandler, builtin_handlers};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// Dispatches tool requests against an immutable registry
pub struct Dispatcher {
    registry: Arc<ToolRegistry>,
    handlers: HashMap<String, Arc<dyn ToolHandler>>,
}

impl std::fmt::Debug for Dispatcher {
    #[inline]
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("tools", &self.registry.names())
            .finish_non_exhaustive()
    }
}

impl Dispatcher {
    /// Build a dispatcher, checking that every descriptor has a handler and
    /// every handler has a descriptor
    #[inline]
    pub fn new(
        registry: Arc<ToolRegistry>,
        handlers: HashMap<String, Arc<dyn ToolHandler>>,
    ) -> McpResult<Self> {
        let missing_handlers: Vec<String> = registry
            .names()
            .into_iter()
            .filter(|name| !handlers.contains_key(name))
            .collect();

        let mut missing_descriptors: Vec<String> = handlers
            .keys()
            .filter(|name| !registry.contains(name))
            .cloned()
            .collect();
        missing_descriptors.sort();

        if !missing_handlers.is_empty() || !missing_descriptors.is_empty() {
            return Err(McpError::RegistryMismatch {
                missing_handlers,
                missing_descriptors,
            });
        }

        Ok(Self { registry, handlers })
    }

    /// Dispatcher over the built-in tools
    #[inline]
    pub fn with_builtin_tools() -> McpResult<Self> {
        let registry = Arc::new(ToolRegistry::create_default()?);
        Self::new(registry, builtin_handlers())
    }

    #[inline]
    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    /// The `tools/list` result
    #[inline]
    pub fn list_tools(&self) -> ListToolsResult {
        ListToolsResult {
            tools: self.registry.list_tools(),
        }
    }

    /// Handle a single request
    #[inline]
    pub async fn handle(&self, request: ToolRequest) -> McpResult<Value> {
        debug!("Dispatching method '{}'", request.method);

        match request.method.as_str() {
            METHOD_TOOLS_LIST => Ok(serde_json::to_value(self.list_tools())?),
            METHOD_TOOLS_CALL => self.handle_call_tool(request.params).await,
            _ => Err(McpError::UnknownMethod {
                method: request.method,
            }),
        }
    }

    async fn handle_call_tool(&self, params: Option<Value>) -> McpResult<Value> {
        let params: CallToolParams = match params {
            Some(p) => serde_json::from_value(p).map_err(|e| McpError::InvalidParameters {
                message: e.to_string(),
            })?,
            None => {
                return Err(McpError::InvalidParameters {
                    message: "Tool call request missing parameters".to_string(),
                });
            }
        };

        if !self.registry.contains(&params.name) {
            return Err(McpError::UnknownTool { name: params.name });
        }

        let handler = self
            .handlers
            .get(&params.name)
            .ok_or_else(|| McpError::Internal {
                message: format!("No handler bound for tool: {}", params.name),
            })?;

        debug!("Calling tool '{}'", params.name);
        let result = handler.handle(params).await?;
        Ok(serde_json::to_value(result)?)
    }
}
