//! MCP Tools Implementation
//!
//! The four built-in tools. Each handler owns its descriptor and decodes its
//! arguments into a typed struct before doing any work.

use crate::mcp::errors::{McpError, McpResult};
use crate::mcp::protocol::{CallToolParams, CallToolResult, Tool};
use async_trait::async_trait;
use chrono::{SecondsFormat, Utc};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// Tool handler trait for implementing tool execution
#[async_trait]
pub trait ToolHandler: Send + Sync {
    async fn handle(&self, params: CallToolParams) -> McpResult<CallToolResult>;
}

/// Decode a tool's argument bag into its typed form
fn parse_arguments<T: DeserializeOwned>(params: &CallToolParams) -> McpResult<T> {
    serde_json::from_value(params.arguments_value()).map_err(|e| {
        McpError::InvalidToolParameters {
            tool: params.name.clone(),
            message: e.to_string(),
        }
    })
}

/// Arguments accepted by `hello`
#[derive(Debug, Deserialize)]
pub struct HelloArgs {
    pub name: String,
}

/// Arguments accepted by `echo`
#[derive(Debug, Deserialize)]
pub struct EchoArgs {
    pub message: String,
}

/// Arguments accepted by `add_numbers`
#[derive(Debug, Deserialize)]
pub struct AddNumbersArgs {
    pub a: f64,
    pub b: f64,
}

/// Greets the caller by name
pub struct HelloHandler;

/// Returns the message it was given
pub struct EchoHandler;

/// Reports the current UTC time
pub struct GetTimeHandler;

/// Adds two numbers
pub struct AddNumbersHandler;

impl HelloHandler {
    /// Create the hello tool definition
    #[inline]
    pub fn tool_definition() -> Tool {
        Tool {
            name: "hello".to_string(),
            description: "Say hello to someone".to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "name": {
                        "type": "string",
                        "description": "Name of the person to greet"
                    }
                },
                "required": ["name"]
            }),
        }
    }
}

#[async_trait]
impl ToolHandler for HelloHandler {
    #[inline]
    async fn handle(&self, params: CallToolParams) -> McpResult<CallToolResult> {
        let args: HelloArgs = parse_arguments(&params)?;
        debug!("Greeting '{}'", args.name);

        Ok(CallToolResult::text(format!(
            "Hello, {}! Welcome to the simple MCP server.",
            args.name
        )))
    }
}

impl EchoHandler {
    /// Create the echo tool definition
    #[inline]
    pub fn tool_definition() -> Tool {
        Tool {
            name: "echo".to_string(),
            description: "Echo back a message".to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "message": {
                        "type": "string",
                        "description": "Message to echo back"
                    }
                },
                "required": ["message"]
            }),
        }
    }
}

#[async_trait]
impl ToolHandler for EchoHandler {
    #[inline]
    async fn handle(&self, params: CallToolParams) -> McpResult<CallToolResult> {
        let args: EchoArgs = parse_arguments(&params)?;
        Ok(CallToolResult::text(format!("Echo: {}", args.message)))
    }
}

impl GetTimeHandler {
    /// Create the get_time tool definition
    #[inline]
    pub fn tool_definition() -> Tool {
        Tool {
            name: "get_time".to_string(),
            description: "Get the current time".to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {},
                "required": []
            }),
        }
    }
}

#[async_trait]
impl ToolHandler for GetTimeHandler {
    #[inline]
    async fn handle(&self, _params: CallToolParams) -> McpResult<CallToolResult> {
        let now = Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true);
        Ok(CallToolResult::text(format!("Current time: {}", now)))
    }
}

impl AddNumbersHandler {
    /// Create the add_numbers tool definition
    #[inline]
    pub fn tool_definition() -> Tool {
        Tool {
            name: "add_numbers".to_string(),
            description: "Add two numbers together".to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "a": {
                        "type": "number",
                        "description": "First number"
                    },
                    "b": {
                        "type": "number",
                        "description": "Second number"
                    }
                },
                "required": ["a", "b"]
            }),
        }
    }
}

#[async_trait]
impl ToolHandler for AddNumbersHandler {
    #[inline]
    async fn handle(&self, params: CallToolParams) -> McpResult<CallToolResult> {
        let args: AddNumbersArgs = parse_arguments(&params)?;
        let sum = args.a + args.b;
        if !sum.is_finite() {
            return Err(McpError::ToolExecutionFailed {
                tool: params.name,
                message: format!("{} + {} overflows", args.a, args.b),
            });
        }

        // f64's Display drops the fractional part of integral values: 5.0 -> "5"
        Ok(CallToolResult::text(format!("{} + {} = {}", args.a, args.b, sum)))
    }
}

/// Descriptors of the built-in tools, in the order they are advertised
#[inline]
pub fn builtin_tools() -> Vec<Tool> {
    vec![
        HelloHandler::tool_definition(),
        EchoHandler::tool_definition(),
        GetTimeHandler::tool_definition(),
        AddNumbersHandler::tool_definition(),
    ]
}

/// Handlers of the built-in tools, keyed by tool name
#[inline]
pub fn builtin_handlers() -> HashMap<String, Arc<dyn ToolHandler>> {
    let mut handlers: HashMap<String, Arc<dyn ToolHandler>> = HashMap::new();
    handlers.insert("hello".to_string(), Arc::new(HelloHandler));
    handlers.insert("echo".to_string(), Arc::new(EchoHandler));
    handlers.insert("get_time".to_string(), Arc::new(GetTimeHandler));
    handlers.insert("add_numbers".to_string(), Arc::new(AddNumbersHandler));
    handlers
}
