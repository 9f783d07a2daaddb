use std::sync::Mutex;

use crate::errors::ProviderError;
use crate::providers::base::Provider;
use crate::providers::types::message::Message;
use crate::providers::types::request::GenerationRequest;

/// A mock provider that returns pre-configured responses and records the
/// history it was sent on every call
pub struct MockProvider {
    responses: Mutex<Vec<Result<Message, ProviderError>>>,
    requests: Mutex<Vec<Vec<Message>>>,
}

impl MockProvider {
    pub fn new(responses: Vec<Result<Message, ProviderError>>) -> Self {
        Self {
            responses: Mutex::new(responses),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn with_messages(messages: Vec<Message>) -> Self {
        Self::new(messages.into_iter().map(Ok).collect())
    }

    /// Histories received so far, one per round trip
    pub fn requests(&self) -> Vec<Vec<Message>> {
        self.requests.lock().unwrap().clone()
    }
}

impl Provider for MockProvider {
    fn name(&self) -> &str {
        "mock"
    }

    fn complete(&self, request: &GenerationRequest<'_>) -> Result<Message, ProviderError> {
        self.requests.lock().unwrap().push(request.messages.to_vec());

        let mut responses = self.responses.lock().unwrap();
        if responses.is_empty() {
            // Return empty response if no more pre-configured responses
            Ok(Message::assistant(""))
        } else {
            responses.remove(0)
        }
    }
}
