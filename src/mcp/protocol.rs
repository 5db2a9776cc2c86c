//! MCP Protocol Types and Messages
//!
//! This module defines the subset of the Model Context Protocol message types
//! the server speaks: tool discovery, tool invocation, and the JSON-RPC 2.0
//! notifications pushed over the SSE channel.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// JSON-RPC 2.0 version identifier
pub const JSONRPC_VERSION: &str = "2.0";

/// Method name for tool discovery
pub const METHOD_TOOLS_LIST: &str = "tools/list";

/// Method name for tool invocation
pub const METHOD_TOOLS_CALL: &str = "tools/call";

/// Notification sent first on every SSE connection
pub const NOTIFICATION_INITIALIZED: &str = "initialized";

/// JSON-RPC 2.0 Notification message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcNotification {
    pub jsonrpc: String,
    pub method: String,
    pub params: Value,
}

impl JsonRpcNotification {
    /// Create a new JSON-RPC notification
    #[inline]
    pub fn new(method: &str, params: Value) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            method: method.to_string(),
            params,
        }
    }

    /// The `initialized` notification, with empty params
    #[inline]
    pub fn initialized() -> Self {
        Self::new(NOTIFICATION_INITIALIZED, Value::Object(Map::new()))
    }
}

/// Incoming request body for the request/response path.
///
/// `jsonrpc` and `id` are accepted for compatibility with JSON-RPC clients but
/// play no part in routing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolRequest {
    pub method: String,
    #[serde(default)]
    pub params: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jsonrpc: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Value>,
}

impl ToolRequest {
    #[inline]
    pub fn new(method: &str, params: Option<Value>) -> Self {
        Self {
            method: method.to_string(),
            params,
            jsonrpc: None,
            id: None,
        }
    }
}

/// Tool definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tool {
    pub name: String,
    pub description: String,
    #[serde(rename = "inputSchema")]
    pub input_schema: Value,
}

/// Tool call request parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallToolParams {
    pub name: String,
    #[serde(default)]
    pub arguments: Option<Map<String, Value>>,
}

impl CallToolParams {
    /// Arguments as a JSON object, treating an absent bag as empty
    #[inline]
    pub fn arguments_value(&self) -> Value {
        Value::Object(self.arguments.clone().unwrap_or_default())
    }
}

/// Tool call result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallToolResult {
    pub content: Vec<ToolContent>,
}

impl CallToolResult {
    /// A result carrying a single text item
    #[inline]
    pub fn text(text: String) -> Self {
        Self {
            content: vec![ToolContent::Text { text }],
        }
    }
}

/// Tool content types
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ToolContent {
    #[serde(rename = "text")]
    Text { text: String },
}

/// List tools response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListToolsResult {
    pub tools: Vec<Tool>,
}

/// Server identity shared by the HTTP surface
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Implementation {
    pub name: String,
    pub version: String,
}
