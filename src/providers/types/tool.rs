use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::errors::{ToolError, ToolResult};

/// A tool that can be offered to a model.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Tool {
    /// The name of the tool
    pub name: String,
    /// A description of what the tool does
    pub description: String,
    /// A json schema of the function signature
    pub parameters: Value,
}

impl Tool {
    pub fn new<N, D>(name: N, description: D, parameters: Value) -> Self
    where
        N: Into<String>,
        D: Into<String>,
    {
        Tool {
            name: name.into(),
            description: description.into(),
            parameters,
        }
    }
}

/// A function invocation requested by the model.
///
/// `arguments` is kept exactly as the backend sent it: the openai-shaped
/// backends send a JSON-encoded string, ollama sends an object.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolCall {
    pub id: String,
    pub name: String,
    pub arguments: Value,
}

impl ToolCall {
    pub fn new<I, N>(id: I, name: N, arguments: Value) -> Self
    where
        I: Into<String>,
        N: Into<String>,
    {
        Self {
            id: id.into(),
            name: name.into(),
            arguments,
        }
    }

    /// Decode the argument payload into a JSON object.
    pub fn parse_arguments(&self) -> ToolResult<Value> {
        match &self.arguments {
            Value::Object(_) => Ok(self.arguments.clone()),
            Value::Null => Ok(Value::Object(Default::default())),
            Value::String(raw) if raw.trim().is_empty() => Ok(Value::Object(Default::default())),
            Value::String(raw) => match serde_json::from_str::<Value>(raw) {
                Ok(value @ Value::Object(_)) => Ok(value),
                Ok(other) => Err(ToolError::InvalidArguments(format!(
                    "expected a JSON object for {}, got {}",
                    self.name, other
                ))),
                Err(e) => Err(ToolError::InvalidArguments(format!(
                    "could not interpret arguments for {}: {} ({})",
                    self.name, raw, e
                ))),
            },
            other => Err(ToolError::InvalidArguments(format!(
                "expected a JSON object for {}, got {}",
                self.name, other
            ))),
        }
    }

    /// Arguments re-encoded as the JSON string chat-completions backends expect.
    pub fn arguments_string(&self) -> String {
        match &self.arguments {
            Value::String(raw) => raw.clone(),
            other => other.to_string(),
        }
    }

    /// Arguments as the JSON object ollama expects, falling back to the raw value.
    pub fn arguments_object(&self) -> Value {
        self.parse_arguments()
            .unwrap_or_else(|_| self.arguments.clone())
    }
}

pub fn create_call_id() -> String {
    format!("call_{}", Uuid::new_v4().simple())
}
