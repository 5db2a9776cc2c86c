//! Tool registry
//!
//! Holds the authoritative, ordered list of tool descriptors. Discovery
//! responses reproduce insertion order.

use crate::mcp::errors::{McpError, McpResult};
use crate::mcp::protocol::Tool;
use crate::mcp::tools::builtin_tools;
use std::collections::HashMap;

/// Tool registry for managing tool registration
#[derive(Debug, Clone, Default)]
pub struct ToolRegistry {
    tools: Vec<Tool>,
    index: HashMap<String, usize>,
}

impl ToolRegistry {
    /// Create an empty tool registry
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool, rejecting a name that is already taken
    #[inline]
    pub fn register(&mut self, tool: Tool) -> McpResult<()> {
        if self.index.contains_key(&tool.name) {
            return Err(McpError::DuplicateTool { name: tool.name });
        }

        self.index.insert(tool.name.clone(), self.tools.len());
        self.tools.push(tool);
        Ok(())
    }

    /// Get all registered tools, in registration order
    #[inline]
    pub fn list_tools(&self) -> Vec<Tool> {
        self.tools.clone()
    }

    /// Get a specific tool by name
    #[inline]
    pub fn get_tool(&self, name: &str) -> Option<&Tool> {
        self.index.get(name).map(|&i| &self.tools[i])
    }

    #[inline]
    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Tool names, in registration order
    #[inline]
    pub fn names(&self) -> Vec<String> {
        self.tools.iter().map(|tool| tool.name.clone()).collect()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Create the registry holding the built-in tools
    #[inline]
    pub fn create_default() -> McpResult<Self> {
        let mut registry = Self::new();
        for tool in builtin_tools() {
            registry.register(tool)?;
        }
        Ok(registry)
    }
}
