use regex::Regex;
use reqwest::blocking::Client;
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::HashSet;
use tracing::{debug, warn};

use super::configs::SystemRole;
use super::types::{
    message::{ImageData, Message, Role},
    tool::{create_call_id, Tool, ToolCall},
};
use crate::errors::ProviderError;

/// Convert internal Message format to the chat-completions message specification
pub fn messages_to_openai_spec(messages: &[Message], system_role: SystemRole) -> Vec<Value> {
    messages
        .iter()
        .map(|message| match &message.role {
            Role::System => json!({
                "role": system_role.as_str(),
                "content": message.content,
            }),
            Role::User if !message.images.is_empty() => {
                let mut blocks = vec![json!({"type": "text", "text": message.content})];
                blocks.extend(message.images.iter().map(|image| {
                    json!({
                        "type": "image_url",
                        "image_url": {"url": image_data_url(image)}
                    })
                }));
                json!({"role": "user", "content": blocks})
            }
            Role::Assistant if message.has_tool_calls() => {
                let tool_calls: Vec<Value> = message
                    .tool_calls
                    .iter()
                    .map(|call| {
                        json!({
                            "id": call.id,
                            "type": "function",
                            "function": {
                                "name": sanitize_function_name(&call.name),
                                "arguments": call.arguments_string(),
                            }
                        })
                    })
                    .collect();
                json!({
                    "role": "assistant",
                    "content": message.content,
                    "tool_calls": tool_calls,
                })
            }
            Role::Tool => json!({
                "role": "tool",
                "content": message.content,
                "tool_call_id": message.tool_call_id,
                "name": message.tool_name.as_deref().map(sanitize_function_name),
            }),
            role => json!({
                "role": role.as_str(),
                "content": message.content,
            }),
        })
        .collect()
}

/// Convert internal Message format to ollama's `/api/chat` message specification
///
/// Images ride inline on the message as bare base64 strings.
pub fn messages_to_ollama_spec(messages: &[Message]) -> Vec<Value> {
    messages
        .iter()
        .map(|message| {
            let mut converted = json!({
                "role": message.role.as_str(),
                "content": message.content,
            });

            if !message.images.is_empty() {
                let images: Vec<&str> = message.images.iter().map(|i| i.data.as_str()).collect();
                converted["images"] = json!(images);
            }
            if let Some(thinking) = &message.thinking {
                converted["thinking"] = json!(thinking);
            }
            if message.has_tool_calls() {
                let tool_calls: Vec<Value> = message
                    .tool_calls
                    .iter()
                    .map(|call| {
                        json!({
                            "function": {
                                "name": sanitize_function_name(&call.name),
                                "arguments": call.arguments_object(),
                            }
                        })
                    })
                    .collect();
                converted["tool_calls"] = json!(tool_calls);
            }
            if let Some(name) = &message.tool_name {
                if message.role == Role::Tool {
                    converted["tool_name"] = json!(sanitize_function_name(name));
                }
            }
            converted
        })
        .collect()
}

/// Convert internal Tool format to the function-calling tool specification
/// shared by ollama and chat-completions backends
///
/// Names go out sanitized, the same way tool calls and tool messages are
/// replayed, so two names that sanitize alike are rejected as duplicates.
pub fn tools_to_spec(tools: &[Tool]) -> Result<Vec<Value>, ProviderError> {
    let mut tool_names = HashSet::new();
    let mut result = Vec::new();

    for tool in tools {
        let name = sanitize_function_name(&tool.name);
        if !tool_names.insert(name.clone()) {
            return Err(ProviderError::InvalidRequest(format!(
                "Duplicate tool name: {}",
                tool.name
            )));
        }

        result.push(json!({
            "type": "function",
            "function": {
                "name": name,
                "description": tool.description,
                "parameters": tool.parameters,
            }
        }));
    }

    Ok(result)
}

pub fn image_data_url(image: &ImageData) -> String {
    format!("data:{};base64,{}", image.mime_type, image.data)
}

pub fn sanitize_function_name(name: &str) -> String {
    let re = Regex::new(r"[^a-zA-Z0-9_-]").unwrap();
    re.replace_all(name, "_").to_string()
}

/// Map sanitized function names in a decoded response back to the names
/// the tools were registered under.
pub fn restore_tool_names(message: &mut Message, tools: &[Tool]) {
    for call in &mut message.tool_calls {
        if let Some(tool) = tools
            .iter()
            .find(|tool| tool.name != call.name && sanitize_function_name(&tool.name) == call.name)
        {
            call.name = tool.name.clone();
        }
    }
}

/// POST a JSON payload and return the raw body of a 200 response.
///
/// Connect errors, timeouts and body read failures become
/// [`ProviderError::Transport`]; any other status becomes
/// [`ProviderError::Backend`].
pub fn post_json(
    client: &Client,
    url: &str,
    api_key: Option<&str>,
    payload: &Value,
) -> Result<String, ProviderError> {
    let mut request = client.post(url).json(payload);
    if let Some(key) = api_key {
        request = request.bearer_auth(key);
    }

    let response = request.send().map_err(|e| {
        warn!(url, error = %e, "Request could not be completed");
        ProviderError::Transport(e.to_string())
    })?;

    let status = response.status();
    let body = response.text()?;

    if status != StatusCode::OK {
        warn!(url, status = status.as_u16(), "Request failed");
        debug!(body = %body, "Error response body");
        return Err(ProviderError::Backend {
            status: status.as_u16(),
            body,
        });
    }
    Ok(body)
}

/// Copy `value` into `object[key]` when it is set.
pub fn insert_if_some<T: Into<Value>>(object: &mut Value, key: &str, value: Option<T>) {
    if let (Some(map), Some(value)) = (object.as_object_mut(), value) {
        map.insert(key.to_string(), value.into());
    }
}

/// Assistant message as it appears in both ollama and chat-completions responses
#[derive(Debug, Default, Deserialize)]
pub(crate) struct ResponseMessage {
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub thinking: Option<String>,
    #[serde(default)]
    pub tool_calls: Option<Vec<ResponseToolCall>>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ResponseToolCall {
    #[serde(default)]
    pub id: Option<String>,
    pub function: ResponseFunction,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ResponseFunction {
    pub name: String,
    #[serde(default)]
    pub arguments: Value,
}

impl ResponseMessage {
    pub fn into_message(self) -> Message {
        let role = match self.role.as_deref() {
            None | Some("") => Role::Assistant,
            Some(role) => Role::from(role),
        };

        let tool_calls = self
            .tool_calls
            .unwrap_or_default()
            .into_iter()
            .map(|call| {
                let id = call
                    .id
                    .filter(|id| !id.is_empty())
                    .unwrap_or_else(create_call_id);
                ToolCall::new(id, call.function.name, call.function.arguments)
            })
            .collect();

        Message {
            thinking: self.thinking.filter(|t| !t.is_empty()),
            tool_calls,
            ..Message::new(role, self.content.unwrap_or_default())
        }
    }
}
