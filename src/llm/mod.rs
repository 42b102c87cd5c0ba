pub mod openai;

use crate::config::{AppConfig, ProviderKind};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct PromptMessage {
    pub role: String,
    pub content: String,
}

impl PromptMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".into(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".into(),
            content: content.into(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ChatRequest {
    pub messages: Vec<PromptMessage>,
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ChatResponse {
    pub content: String,
    pub model: String,
}

/// Anything that can turn a chat request into a single text completion.
#[async_trait]
pub trait CompletionModel: Send + Sync {
    async fn complete(&self, request: &ChatRequest) -> Result<ChatResponse, LlmError>;
}

/// Unified LLM provider enum. Both variants speak the OpenAI-compatible wire format.
#[derive(Debug, Clone)]
pub enum Provider {
    OpenAi(openai::OpenAiConfig),
    Ollama(openai::OpenAiConfig),
}

impl Provider {
    /// Resolve the provider described by `config`. OpenAI needs a key, Ollama does not.
    pub fn from_config(config: &AppConfig, api_key: Option<&str>) -> Result<Self, LlmError> {
        let base_url = config.resolved_base_url();
        match config.provider {
            ProviderKind::OpenAi => {
                let api_key = api_key
                    .map(str::trim)
                    .filter(|k| !k.is_empty())
                    .ok_or(LlmError::MissingApiKey)?;
                Ok(Provider::OpenAi(openai::OpenAiConfig {
                    api_key: api_key.to_string(),
                    base_url,
                }))
            }
            ProviderKind::Ollama => Ok(Provider::Ollama(openai::OpenAiConfig {
                api_key: api_key.unwrap_or_default().trim().to_string(),
                base_url,
            })),
        }
    }

    pub fn config(&self) -> &openai::OpenAiConfig {
        match self {
            Provider::OpenAi(config) | Provider::Ollama(config) => config,
        }
    }

    pub async fn chat(&self, request: &ChatRequest) -> Result<ChatResponse, LlmError> {
        openai::chat(self.config(), request).await
    }
}

#[async_trait]
impl CompletionModel for Provider {
    async fn complete(&self, request: &ChatRequest) -> Result<ChatResponse, LlmError> {
        self.chat(request).await
    }
}

#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },
    #[error("Parse error: {0}")]
    Parse(String),
    #[error("API key not configured")]
    MissingApiKey,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn openai_provider_requires_a_key() {
        let config = AppConfig::default();
        assert!(matches!(
            Provider::from_config(&config, None),
            Err(LlmError::MissingApiKey)
        ));
        assert!(matches!(
            Provider::from_config(&config, Some("   ")),
            Err(LlmError::MissingApiKey)
        ));

        let provider = Provider::from_config(&config, Some(" sk-test ")).unwrap();
        assert_eq!(provider.config().api_key, "sk-test");
        assert_eq!(provider.config().base_url, "https://api.openai.com/v1");
    }

    #[test]
    fn ollama_provider_works_without_key() {
        let config = AppConfig {
            provider: ProviderKind::Ollama,
            ..AppConfig::default()
        };
        let provider = Provider::from_config(&config, None).unwrap();
        assert!(matches!(provider, Provider::Ollama(_)));
        assert_eq!(provider.config().base_url, "http://localhost:11434/v1");
        assert!(provider.config().api_key.is_empty());
    }
}
