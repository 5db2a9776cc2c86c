//! MCP Error Handling
//!
//! Error classification for the dispatcher and the tool registry, plus the
//! uniform `{ "error": message }` body the HTTP layer puts on the wire.

use serde_json::{Value, json};
use thiserror::Error;
use tracing::{error, warn};

/// Errors that can occur while building the registry or dispatching a request
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum McpError {
    #[error("Unknown method: {method}")]
    UnknownMethod { method: String },

    #[error("Unknown tool: {name}")]
    UnknownTool { name: String },

    #[error("Invalid parameters: {message}")]
    InvalidParameters { message: String },

    #[error("Invalid arguments for tool '{tool}': {message}")]
    InvalidToolParameters { tool: String, message: String },

    #[error("Tool '{tool}' execution failed: {message}")]
    ToolExecutionFailed { tool: String, message: String },

    #[error("Tool registered twice: {name}")]
    DuplicateTool { name: String },

    #[error(
        "Tool registry and handlers disagree (no handler for {missing_handlers:?}, no descriptor for {missing_descriptors:?})"
    )]
    RegistryMismatch {
        missing_handlers: Vec<String>,
        missing_descriptors: Vec<String>,
    },

    #[error("Internal server error: {message}")]
    Internal { message: String },
}

impl McpError {
    /// Wire body returned by the request/response path for any failure
    #[inline]
    pub fn to_error_body(&self) -> Value {
        json!({ "error": self.to_string() })
    }

    /// Whether the failure was caused by the caller rather than the server
    #[inline]
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::UnknownMethod { .. }
                | Self::UnknownTool { .. }
                | Self::InvalidParameters { .. }
                | Self::InvalidToolParameters { .. }
        )
    }

    /// Log the error with appropriate level
    #[inline]
    pub fn log(&self) {
        if self.is_client_error() {
            warn!("Client error: {}", self);
        } else {
            error!("Server error: {}", self);
        }
    }
}

/// Result type for MCP operations
pub type McpResult<T> = Result<T, McpError>;

impl From<anyhow::Error> for McpError {
    #[inline]
    fn from(error: anyhow::Error) -> Self {
        Self::Internal {
            message: error.to_string(),
        }
    }
}

impl From<serde_json::Error> for McpError {
    #[inline]
    fn from(error: serde_json::Error) -> Self {
        Self::Internal {
            message: error.to_string(),
        }
    }
}
