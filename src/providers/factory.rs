use super::{base::Provider, configs::ClientConfig, ollama::OllamaProvider, openai::OpenAiProvider};
use crate::errors::ProviderError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderType {
    Ollama,
    LmStudio,
    OpenAi,
}

impl ProviderType {
    /// Resolve a provider identifier. Any identifier starting with `ollama`
    /// (`ollama`, `ollama2`, ...) selects the native ollama backend.
    pub fn from_id(id: &str) -> Option<Self> {
        if id.starts_with("ollama") {
            Some(ProviderType::Ollama)
        } else if id == "lmstudio" {
            Some(ProviderType::LmStudio)
        } else if id == "openai" {
            Some(ProviderType::OpenAi)
        } else {
            None
        }
    }
}

pub fn get_provider(config: &ClientConfig) -> Result<Box<dyn Provider>, ProviderError> {
    let provider_type = ProviderType::from_id(&config.provider)
        .ok_or_else(|| ProviderError::UnknownProvider(config.provider.clone()))?;

    match provider_type {
        ProviderType::Ollama => Ok(Box::new(OllamaProvider::new(config)?)),
        ProviderType::LmStudio => Ok(Box::new(OpenAiProvider::lmstudio(config)?)),
        ProviderType::OpenAi => Ok(Box::new(OpenAiProvider::new(config)?)),
    }
}
