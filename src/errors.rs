use thiserror::Error;

/// Failures surfaced by a backend round trip or by the conversation loop.
///
/// Every variant maps onto the status code returned to callers through
/// [`ProviderError::status_code`].
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProviderError {
    #[error("Transport failure: {0}")]
    Transport(String),

    #[error("Request failed: {status}")]
    Backend { status: u16, body: String },

    #[error("Could not decode backend response: {0}")]
    Decode(String),

    #[error("Unknown provider: {0}")]
    UnknownProvider(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Generation cancelled")]
    Cancelled,

    #[error("Generation exceeded its time budget")]
    DeadlineExceeded,

    #[error("Tool loop did not converge after {0} round trips")]
    TooManyRounds(usize),
}

impl ProviderError {
    pub fn status_code(&self) -> u16 {
        match self {
            ProviderError::Transport(_) => 408,
            ProviderError::Backend { status, .. } => *status,
            ProviderError::Decode(_) => 502,
            ProviderError::UnknownProvider(_) => 400,
            ProviderError::InvalidRequest(_) => 400,
            ProviderError::Cancelled => 499,
            ProviderError::DeadlineExceeded => 408,
            ProviderError::TooManyRounds(_) => 508,
        }
    }
}

impl From<reqwest::Error> for ProviderError {
    fn from(err: reqwest::Error) -> Self {
        ProviderError::Transport(err.to_string())
    }
}

impl From<serde_json::Error> for ProviderError {
    fn from(err: serde_json::Error) -> Self {
        ProviderError::Decode(err.to_string())
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ToolError {
    #[error("Tool not found: {0}")]
    NotFound(String),

    #[error("Invalid parameters: {0}")]
    InvalidArguments(String),

    #[error("Tool execution failed: {0}")]
    ExecutionError(String),
}

pub type ToolResult<T> = Result<T, ToolError>;
