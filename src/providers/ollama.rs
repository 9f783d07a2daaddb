use reqwest::blocking::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, trace};

use super::base::Provider;
use super::types::message::Message;
use super::types::request::GenerationRequest;
use super::utils::{
    insert_if_some, messages_to_ollama_spec, post_json, restore_tool_names, tools_to_spec,
    ResponseMessage,
};
use crate::errors::ProviderError;
use crate::providers::configs::ClientConfig;

/// Native ollama chat backend (`POST /api/chat`)
pub struct OllamaProvider {
    client: Client,
    host: String,
    api_key: Option<String>,
}

/// One `/api/chat` response object, or one fragment of a streamed response
#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    message: Option<ResponseMessage>,
    #[serde(default)]
    done: bool,
    #[serde(default)]
    error: Option<String>,
}

impl OllamaProvider {
    pub fn new(config: &ClientConfig) -> Result<Self, ProviderError> {
        let client = Client::builder().timeout(config.timeout()).build()?;

        Ok(Self {
            client,
            host: config.base_url.clone(),
            api_key: config.api_key.clone(),
        })
    }

    fn build_payload(request: &GenerationRequest<'_>) -> Result<Value, ProviderError> {
        let mut options = json!({ "num_ctx": request.num_ctx });
        insert_if_some(&mut options, "temperature", request.sampling.temperature());
        insert_if_some(&mut options, "top_k", request.sampling.top_k());
        insert_if_some(&mut options, "top_p", request.sampling.top_p());
        insert_if_some(&mut options, "min_p", request.sampling.min_p());

        let mut payload = json!({
            "model": request.model,
            "messages": messages_to_ollama_spec(request.messages),
            "stream": request.stream,
            "options": options,
        });

        let tools_spec = tools_to_spec(request.tools)?;
        if !tools_spec.is_empty() {
            payload["tools"] = json!(tools_spec);
        }
        Ok(payload)
    }
}

impl Provider for OllamaProvider {
    fn name(&self) -> &str {
        "ollama"
    }

    fn complete(&self, request: &GenerationRequest<'_>) -> Result<Message, ProviderError> {
        let payload = Self::build_payload(request)?;
        let url = format!("{}/api/chat", self.host.trim_end_matches('/'));
        debug!(url, options = %payload["options"], stream = request.stream, "Sending chat request");

        let body = post_json(&self.client, &url, self.api_key.as_deref(), &payload)?;
        trace!(body = %body, "Chat response");

        let mut message = if request.stream {
            decode_stream(&body)?
        } else {
            decode_batch(&body)?
        };
        restore_tool_names(&mut message, request.tools);
        Ok(message)
    }
}

fn decode_batch(body: &str) -> Result<Message, ProviderError> {
    let response: ChatResponse = serde_json::from_str(body)?;
    if let Some(error) = response.error {
        return Err(ProviderError::Decode(format!("backend reported error: {}", error)));
    }
    let message = response
        .message
        .ok_or_else(|| ProviderError::Decode("response has no message".to_string()))?;
    Ok(message.into_message())
}

/// Coalesce newline-delimited streaming fragments into one message.
///
/// Content and thinking text are concatenated and tool calls unioned, in
/// fragment order, up to and including the fragment marked `done`.
pub fn decode_stream(body: &str) -> Result<Message, ProviderError> {
    let mut role = None;
    let mut content = String::new();
    let mut thinking = String::new();
    let mut tool_calls = Vec::new();
    let mut fragments = 0usize;

    for line in body.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let chunk: ChatResponse = serde_json::from_str(line)?;
        if let Some(error) = chunk.error {
            return Err(ProviderError::Decode(format!("backend reported error: {}", error)));
        }
        fragments += 1;

        if let Some(message) = chunk.message {
            if message.role.as_deref().is_some_and(|r| !r.is_empty()) {
                role = message.role;
            }
            if let Some(text) = message.content {
                content.push_str(&text);
            }
            if let Some(text) = message.thinking {
                thinking.push_str(&text);
            }
            if let Some(calls) = message.tool_calls {
                tool_calls.extend(calls);
            }
        }

        if chunk.done {
            break;
        }
    }

    if fragments == 0 {
        return Err(ProviderError::Decode("empty streaming response".to_string()));
    }
    debug!(fragments, "Coalesced streaming response");

    let coalesced = ResponseMessage {
        role,
        content: Some(content),
        thinking: Some(thinking),
        tool_calls: Some(tool_calls),
    };
    Ok(coalesced.into_message())
}
