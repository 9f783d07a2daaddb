use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use anyhow::Result;
use tracing::{debug, info, warn};

use crate::errors::ProviderError;
use crate::parser::ReasoningFilter;
use crate::providers::base::Provider;
use crate::providers::configs::ClientConfig;
use crate::providers::factory::get_provider;
use crate::providers::types::completion::Completion;
use crate::providers::types::message::{ImageData, Message, Role};
use crate::providers::types::request::GenerationRequest;
use crate::providers::types::tool::ToolCall;
use crate::tool::ToolRegistry;

/// Agent drives a conversation with one backend until the model produces
/// an answer that requests no further tool calls.
///
/// An agent holds no conversation state of its own. Every [`Agent::generate`]
/// call owns a fresh history, so one agent can serve concurrent callers.
pub struct Agent {
    provider: Option<Arc<dyn Provider>>,
    tools: Option<Arc<dyn ToolRegistry>>,
    config: ClientConfig,
    filter: ReasoningFilter,
    cancel: Option<Arc<AtomicBool>>,
}

impl Agent {
    /// Create an agent for the backend named by `config.provider`.
    ///
    /// An unrecognized provider is not an error here: every call to
    /// [`Agent::generate`] then fails with status 400 without touching the network.
    pub fn new(config: ClientConfig) -> Result<Self> {
        config.validate()?;

        let provider: Option<Arc<dyn Provider>> = match get_provider(&config) {
            Ok(provider) => Some(Arc::from(provider)),
            Err(ProviderError::UnknownProvider(id)) => {
                warn!(provider = %id, "Unknown provider, generation requests will be rejected");
                None
            }
            Err(e) => return Err(e.into()),
        };

        Ok(Self {
            provider,
            tools: None,
            config,
            filter: ReasoningFilter::default(),
            cancel: None,
        })
    }

    /// Create an agent over an already constructed backend
    pub fn with_provider(config: ClientConfig, provider: Arc<dyn Provider>) -> Self {
        Self {
            provider: Some(provider),
            tools: None,
            config,
            filter: ReasoningFilter::default(),
            cancel: None,
        }
    }

    /// Offer the registry's functions to the model on every round trip
    pub fn with_tools(mut self, tools: Arc<dyn ToolRegistry>) -> Self {
        self.tools = Some(tools);
        self
    }

    /// Stop at the next round trip boundary once `flag` is set
    pub fn with_cancellation(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancel = Some(flag);
        self
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Generate an answer for `text`, optionally preceded by a system prompt
    /// and accompanied by an image.
    pub fn generate(&self, text: &str, system: Option<&str>, image: Option<&[u8]>) -> Completion {
        let mut history = Self::seed_history(text, system, image);
        self.converse(&mut history)
    }

    /// Initial history: optional system message followed by one user message
    pub fn seed_history(text: &str, system: Option<&str>, image: Option<&[u8]>) -> Vec<Message> {
        let mut history = Vec::with_capacity(2);
        if let Some(system) = system {
            history.push(Message::system(system));
        }
        let mut user = Message::user(text);
        if let Some(bytes) = image {
            user = user.with_image(ImageData::from_bytes(bytes));
        }
        history.push(user);
        history
    }

    /// Run the request/response/tool loop over `history`, appending every
    /// assistant and tool message produced along the way.
    pub fn converse(&self, history: &mut Vec<Message>) -> Completion {
        info!(
            provider = %self.config.provider,
            model = %self.config.model,
            "Starting generation"
        );

        match self.run(history) {
            Ok(text) => Completion::success(text),
            Err(e) => {
                warn!(status = e.status_code(), error = %e, "Generation failed");
                Completion::from(e)
            }
        }
    }

    fn run(&self, history: &mut Vec<Message>) -> Result<String, ProviderError> {
        let provider = self
            .provider
            .as_deref()
            .ok_or_else(|| ProviderError::UnknownProvider(self.config.provider.clone()))?;

        let tools = self
            .tools
            .as_ref()
            .map(|registry| registry.describe())
            .unwrap_or_default();
        let started = Instant::now();

        for round in 1..=self.config.max_rounds {
            self.checkpoint(started)?;

            if self.config.debug_echo {
                for message in history.iter() {
                    debug!(round, message = %message.summary(), "Sending message");
                }
            }

            let request = GenerationRequest {
                model: &self.config.model,
                messages: history.as_slice(),
                sampling: &self.config.sampling,
                num_ctx: self.config.num_ctx,
                tools: &tools,
                stream: self.config.stream,
            };
            let response = provider.complete(&request)?;

            if self.config.debug_echo {
                debug!(round, message = %response.summary(), "Received message");
            }

            match response.role {
                Role::Assistant if response.has_tool_calls() => {
                    debug!(round, calls = response.tool_calls.len(), "Dispatching tool calls");
                    let calls = response.tool_calls.clone();
                    history.push(response);
                    for call in &calls {
                        let output = self.dispatch_tool_call(call);
                        history.push(Message::tool_result(call, output));
                    }
                }
                Role::Assistant => {
                    let answer = if self.config.remove_think {
                        self.filter.strip(&response.content).into_owned()
                    } else {
                        response.content.clone()
                    };
                    history.push(response);
                    info!(rounds = round, elapsed = ?started.elapsed(), "Generation finished");
                    return Ok(answer);
                }
                role => {
                    warn!(%role, "Unexpected role in response, stopping");
                    return Ok(response.content);
                }
            }
        }

        Err(ProviderError::TooManyRounds(self.config.max_rounds))
    }

    fn checkpoint(&self, started: Instant) -> Result<(), ProviderError> {
        if let Some(flag) = &self.cancel {
            if flag.load(Ordering::SeqCst) {
                return Err(ProviderError::Cancelled);
            }
        }
        if let Some(budget) = self.config.max_duration() {
            if started.elapsed() >= budget {
                return Err(ProviderError::DeadlineExceeded);
            }
        }
        Ok(())
    }

    /// Dispatch a single tool call. Failures become the tool message content
    /// so the model can see what went wrong.
    fn dispatch_tool_call(&self, call: &ToolCall) -> String {
        let Some(tools) = &self.tools else {
            return String::new();
        };

        let result = call
            .parse_arguments()
            .and_then(|arguments| tools.invoke(&call.name, &arguments));

        match result {
            Ok(output) => output,
            Err(e) => {
                warn!(tool = %call.name, id = %call.id, error = %e, "Tool call failed");
                format!("The tool call returned the following error:\n{}", e)
            }
        }
    }
}
