use serde_json::Value;
use std::fmt::Debug;

use crate::errors::{ToolError, ToolResult};
use crate::providers::types::tool::Tool;

/// Source of the functions a model may call.
pub trait ToolRegistry: Send + Sync {
    /// Descriptors sent to the backend with every request
    fn describe(&self) -> Vec<Tool>;

    /// Run the named function; the returned string becomes the tool message content
    fn invoke(&self, name: &str, arguments: &Value) -> ToolResult<String>;
}

type ToolFunction = Box<dyn Fn(&Value) -> anyhow::Result<Value> + Send + Sync>;

/// A tool descriptor paired with the closure that powers it.
pub struct FunctionTool {
    pub tool: Tool,
    function: ToolFunction,
}

impl Debug for FunctionTool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FunctionTool")
            .field("tool", &self.tool)
            .field("function", &"<function>")
            .finish()
    }
}

/// In-process [`ToolRegistry`] backed by closures.
#[derive(Debug, Default)]
pub struct ToolBox {
    tools: Vec<FunctionTool>,
}

impl ToolBox {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a function. A later registration with the same name replaces the earlier one.
    pub fn with_function<F>(mut self, tool: Tool, function: F) -> Self
    where
        F: Fn(&Value) -> anyhow::Result<Value> + Send + Sync + 'static,
    {
        self.tools.retain(|existing| existing.tool.name != tool.name);
        self.tools.push(FunctionTool {
            tool,
            function: Box::new(function),
        });
        self
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

impl ToolRegistry for ToolBox {
    fn describe(&self) -> Vec<Tool> {
        self.tools.iter().map(|t| t.tool.clone()).collect()
    }

    fn invoke(&self, name: &str, arguments: &Value) -> ToolResult<String> {
        let entry = self
            .tools
            .iter()
            .find(|t| t.tool.name == name)
            .ok_or_else(|| ToolError::NotFound(name.to_string()))?;

        let output = (entry.function)(arguments)
            .map_err(|e| ToolError::ExecutionError(e.to_string()))?;

        Ok(match output {
            Value::String(text) => text,
            other => other.to_string(),
        })
    }
}
