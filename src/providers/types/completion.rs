use serde::{Deserialize, Serialize};

use crate::errors::ProviderError;

pub const STATUS_OK: u16 = 200;

/// Final outcome of one `generate` call. `text` is empty on every failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Completion {
    pub text: String,
    pub status: u16,
}

impl Completion {
    pub fn success<S: Into<String>>(text: S) -> Self {
        Self {
            text: text.into(),
            status: STATUS_OK,
        }
    }

    pub fn failed(status: u16) -> Self {
        Self {
            text: String::new(),
            status,
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == STATUS_OK
    }

    pub fn into_parts(self) -> (String, u16) {
        (self.text, self.status)
    }
}

impl From<ProviderError> for Completion {
    fn from(err: ProviderError) -> Self {
        Completion::failed(err.status_code())
    }
}
