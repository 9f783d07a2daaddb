use super::types::message::Message;
use super::types::request::GenerationRequest;
use crate::errors::ProviderError;

/// Base trait for chat backends (ollama, LM Studio, OpenAI, ...)
///
/// One call is one HTTP round trip. Implementations never let a transport
/// failure escape as a panic; it is returned as [`ProviderError::Transport`].
pub trait Provider: Send + Sync {
    /// Short identifier used in logs
    fn name(&self) -> &str;

    /// Send the conversation so far and decode the backend's next message
    fn complete(&self, request: &GenerationRequest<'_>) -> Result<Message, ProviderError>;
}
