//! MCP (Model Context Protocol) Tool Server Core
//!
//! The tool registry, the dispatcher that routes `tools/list` and `tools/call`
//! requests, and the built-in tool handlers. Transports live in [`crate::http`].


pub mod dispatcher;
pub mod errors;
pub mod protocol;
pub mod registry;
pub mod tools;

pub use dispatcher::Dispatcher;
pub use errors::{McpError, McpResult};
pub use protocol::{
    CallToolParams, CallToolResult, Implementation, JsonRpcNotification, ListToolsResult, Tool,
    ToolContent, ToolRequest,
};
pub use registry::ToolRegistry;
pub use tools::ToolHandler;
