use reqwest::blocking::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, trace};

use super::base::Provider;
use super::configs::{ClientConfig, SystemRole};
use super::types::message::Message;
use super::types::request::GenerationRequest;
use super::utils::{
    insert_if_some, messages_to_openai_spec, post_json, restore_tool_names, tools_to_spec,
    ResponseMessage,
};
use crate::errors::ProviderError;

pub const LMSTUDIO_API_KEY: &str = "lm-studio";

/// Chat-completions shaped backend (`POST /v1/chat/completions`), used for
/// LM Studio and OpenAI
pub struct OpenAiProvider {
    name: &'static str,
    client: Client,
    host: String,
    api_key: Option<String>,
    system_role: SystemRole,
}

#[derive(Debug, Deserialize)]
struct ChatCompletion {
    #[serde(default)]
    choices: Vec<Choice>,
    #[serde(default)]
    error: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    #[serde(default)]
    message: Option<ResponseMessage>,
}

impl OpenAiProvider {
    pub fn new(config: &ClientConfig) -> Result<Self, ProviderError> {
        Self::with_name("openai", config)
    }

    /// LM Studio ignores the token but expects one to be present.
    pub fn lmstudio(config: &ClientConfig) -> Result<Self, ProviderError> {
        let mut provider = Self::with_name("lmstudio", config)?;
        if provider.api_key.is_none() {
            provider.api_key = Some(LMSTUDIO_API_KEY.to_string());
        }
        Ok(provider)
    }

    fn with_name(name: &'static str, config: &ClientConfig) -> Result<Self, ProviderError> {
        let client = Client::builder().timeout(config.timeout()).build()?;

        Ok(Self {
            name,
            client,
            host: config.base_url.clone(),
            api_key: config.api_key.clone(),
            system_role: config.system_role,
        })
    }

    fn build_payload(&self, request: &GenerationRequest<'_>) -> Result<Value, ProviderError> {
        let mut payload = json!({
            "model": request.model,
            "messages": messages_to_openai_spec(request.messages, self.system_role),
            "num_ctx": request.num_ctx,
        });

        insert_if_some(&mut payload, "temperature", request.sampling.temperature());
        insert_if_some(&mut payload, "top_k", request.sampling.top_k());
        insert_if_some(&mut payload, "top_p", request.sampling.top_p());
        insert_if_some(&mut payload, "min_p", request.sampling.min_p());

        let tools_spec = tools_to_spec(request.tools)?;
        if !tools_spec.is_empty() {
            payload["tools"] = json!(tools_spec);
        }
        Ok(payload)
    }
}

impl Provider for OpenAiProvider {
    fn name(&self) -> &str {
        self.name
    }

    fn complete(&self, request: &GenerationRequest<'_>) -> Result<Message, ProviderError> {
        let payload = self.build_payload(request)?;
        let url = format!("{}/v1/chat/completions", self.host.trim_end_matches('/'));
        debug!(url, model = request.model, "Sending chat completion request");

        let body = post_json(&self.client, &url, self.api_key.as_deref(), &payload)?;
        trace!(body = %body, "Chat completion response");

        let mut message = openai_response_to_message(&body)?;
        restore_tool_names(&mut message, request.tools);
        Ok(message)
    }
}

/// Decode `choices[0].message` from a chat-completions response body
pub fn openai_response_to_message(body: &str) -> Result<Message, ProviderError> {
    let response: ChatCompletion = serde_json::from_str(body)?;

    if let Some(error) = response.error {
        return Err(ProviderError::Decode(format!("backend reported error: {}", error)));
    }

    let message = response
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message)
        .ok_or_else(|| ProviderError::Decode("response has no choices[0].message".to_string()))?;

    Ok(message.into_message())
}
