pub mod base;

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use super::factory::ProviderType;
use base::ProviderConfig;

pub const DEFAULT_PROVIDER: &str = "ollama";
pub const DEFAULT_HOST: &str = "http://localhost:11434";
pub const DEFAULT_MODEL: &str = "qwen3:8b";
pub const DEFAULT_NUM_CTX: u32 = 8192;
pub const DEFAULT_TIMEOUT_SECS: u64 = 600;
pub const DEFAULT_MAX_ROUNDS: usize = 16;

/// Sampling parameters. Each field has an "unset" sentinel; unset values
/// are left out of the request so the backend applies its own default.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SamplingParams {
    /// Unset when negative
    pub temperature: f64,
    /// Unset when zero
    pub top_k: i64,
    /// Unset when zero
    pub top_p: f64,
    /// Unset when negative
    pub min_p: f64,
}

impl Default for SamplingParams {
    fn default() -> Self {
        Self {
            temperature: -1.0,
            top_k: 0,
            top_p: 0.0,
            min_p: -1.0,
        }
    }
}

impl SamplingParams {
    pub fn temperature(&self) -> Option<f64> {
        (self.temperature >= 0.0).then_some(self.temperature)
    }

    pub fn top_k(&self) -> Option<i64> {
        (self.top_k > 0).then_some(self.top_k)
    }

    pub fn top_p(&self) -> Option<f64> {
        (self.top_p > 0.0).then_some(self.top_p)
    }

    pub fn min_p(&self) -> Option<f64> {
        (self.min_p >= 0.0).then_some(self.min_p)
    }
}

/// Role name used for the system prompt on chat-completions backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SystemRole {
    #[default]
    System,
    Developer,
}

impl SystemRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            SystemRole::System => "system",
            SystemRole::Developer => "developer",
        }
    }
}

/// Complete configuration for an [`Agent`](crate::agent::Agent).
///
/// Every field has a default, so a partial JSON document deserializes into
/// a usable configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Backend family: anything starting with `ollama`, `lmstudio` or `openai`
    pub provider: String,
    pub base_url: String,
    /// Sent as a bearer token when present
    pub api_key: Option<String>,
    pub model: String,
    pub system_role: SystemRole,
    /// Per-request HTTP timeout
    pub timeout_secs: u64,
    pub num_ctx: u32,
    pub sampling: SamplingParams,
    /// Strip `<think>` blocks from the final answer
    pub remove_think: bool,
    /// Ask ollama for newline-delimited streaming fragments
    pub stream: bool,
    /// Upper bound on backend round trips within one `generate` call
    pub max_rounds: usize,
    /// Optional wall-clock budget for a whole `generate` call
    pub max_duration_secs: Option<u64>,
    /// Log every request and response message at debug level
    pub debug_echo: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            provider: DEFAULT_PROVIDER.to_string(),
            base_url: DEFAULT_HOST.to_string(),
            api_key: None,
            model: DEFAULT_MODEL.to_string(),
            system_role: SystemRole::default(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            num_ctx: DEFAULT_NUM_CTX,
            sampling: SamplingParams::default(),
            remove_think: true,
            stream: false,
            max_rounds: DEFAULT_MAX_ROUNDS,
            max_duration_secs: None,
            debug_echo: false,
        }
    }
}

impl ClientConfig {
    pub fn new<P, U, M>(provider: P, base_url: U, model: M) -> Self
    where
        P: Into<String>,
        U: Into<String>,
        M: Into<String>,
    {
        Self {
            provider: provider.into(),
            base_url: base_url.into(),
            model: model.into(),
            ..Default::default()
        }
    }

    /// Load a JSON configuration file; missing fields take their defaults.
    ///
    /// The result is not validated, so callers can apply overrides first and
    /// then call [`ClientConfig::validate`].
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config: Self = serde_json::from_str(&raw)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        Ok(config)
    }

    /// Environment variable holding the API token for a provider family
    pub fn api_key_var(provider: &str) -> &'static str {
        match ProviderType::from_id(provider) {
            Some(ProviderType::LmStudio | ProviderType::OpenAi) => "OPENAI_API_KEY",
            Some(ProviderType::Ollama) | None => "OLLAMA_API_KEY",
        }
    }

    /// Read the API token for `provider` from its family's environment variable
    pub fn api_key_from_env(provider: &str) -> Result<Option<String>> {
        Self::get_env(Self::api_key_var(provider), false, None)
    }

    pub fn validate(&self) -> Result<()> {
        if self.model.trim().is_empty() {
            return Err(anyhow!("model must not be empty"));
        }
        reqwest::Url::parse(&self.base_url)
            .with_context(|| format!("Invalid base_url '{}'", self.base_url))?;
        if self.num_ctx == 0 {
            return Err(anyhow!("num_ctx must be greater than zero"));
        }
        if self.max_rounds == 0 {
            return Err(anyhow!("max_rounds must be greater than zero"));
        }
        if self.timeout_secs == 0 {
            return Err(anyhow!("timeout_secs must be greater than zero"));
        }
        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn max_duration(&self) -> Option<Duration> {
        self.max_duration_secs.map(Duration::from_secs)
    }
}

impl ProviderConfig for ClientConfig {
    fn from_env() -> Result<Self> {
        let base_url = Self::get_env("OLLAMA_HOST", false, Some(DEFAULT_HOST.to_string()))?
            .unwrap_or_else(|| DEFAULT_HOST.to_string());

        let provider = DEFAULT_PROVIDER.to_string();
        let api_key = Self::api_key_from_env(&provider)?;

        Ok(Self {
            provider,
            base_url,
            api_key,
            ..Default::default()
        })
    }
}
