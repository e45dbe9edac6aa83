//! Factory for creating LLM providers.

use std::sync::Arc;

use tome_core::config::{LlmProvider, LlmProviderConfig};
use tome_core::error::TomeResult;
use tome_core::traits::{Llm, LlmConfig};

use crate::anthropic::AnthropicLlm;
use crate::ollama::OllamaLlm;
use crate::openai::OpenAIProvider;

/// Factory for creating LLM providers.
pub struct LlmFactory;

impl LlmFactory {
    /// Create an LLM provider from the given configuration.
    pub fn create(provider: LlmProvider, config: LlmConfig) -> TomeResult<Arc<dyn Llm>> {
        let llm: Arc<dyn Llm> = match provider {
            LlmProvider::OpenAI => Arc::new(OpenAIProvider::new(config)?),
            LlmProvider::Anthropic => Arc::new(AnthropicLlm::new(config)?),
            LlmProvider::Ollama => Arc::new(OllamaLlm::new(config)?),
        };
        tracing::info!(provider = ?provider, model = llm.model_name(), "Created LLM provider");
        Ok(llm)
    }

    /// Create the provider described by a loaded configuration section.
    pub fn from_config(config: &LlmProviderConfig) -> TomeResult<Arc<dyn Llm>> {
        Self::create(config.provider, config.config.clone())
    }
}
